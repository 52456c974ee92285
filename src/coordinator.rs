//! Single-flight coordinator for a lazily-initialized shared resource.
//!
//! This module provides [`Coordinator`], a cloneable handle to one shared
//! resource slot. The slot moves through three phases:
//!
//! ```text
//! Empty --acquire()--> Pending --success--> Completed
//!                         |
//!                         +------failure--> Empty
//! ```
//!
//! The first caller to find the slot `Empty` starts an attempt. Every caller
//! that arrives while the attempt is in flight attaches to the same attempt and
//! observes the same outcome. A completed resource is read through a
//! [`ReadyCell`] without taking a lock. A failed attempt is discarded so that
//! the next call starts fresh instead of replaying the stale failure.

use core::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use tokio::runtime::Handle;
use tokio::sync::{oneshot, watch};
use tracing::Instrument;

use crate::error::AcquireError;
use crate::initializer::Initializer;
use crate::ready::ReadyCell;

type Outcome<I> =
   Result<Arc<<I as Initializer>::Resource>, AcquireError<<I as Initializer>::Error>>;

/// An in-flight attempt, shareable between any number of waiters.
type Attempt<I> = Shared<BoxFuture<'static, Outcome<I>>>;

/// Observable phase of a [`Coordinator`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
   /// No resource and no attempt in flight.
   Empty,
   /// An attempt is in flight.
   Pending,
   /// The resource is available. Terminal.
   Completed,
}

/// Advisory snapshot for presentation layers (loading spinners, error banners).
///
/// Not authoritative for correctness: by the time a consumer looks at it the
/// coordinator may already have moved on.
#[derive(Debug)]
pub struct Status<E>
where
   E: std::error::Error + 'static,
{
   /// An attempt is in flight.
   pub pending: bool,
   /// The most recent failure. Cleared when the next attempt starts.
   pub last_error: Option<AcquireError<E>>,
}

impl<E> Clone for Status<E>
where
   E: std::error::Error + 'static,
{
   fn clone(&self) -> Self {
      Self {
         pending: self.pending,
         last_error: self.last_error.clone(),
      }
   }
}

impl<E> Default for Status<E>
where
   E: std::error::Error + 'static,
{
   fn default() -> Self {
      Self {
         pending: false,
         last_error: None,
      }
   }
}

/// What `acquire` found after taking the slot lock.
enum Entry<I: Initializer> {
   Ready(Arc<I::Resource>),
   Wait(Attempt<I>),
}

/// The in-flight attempt and its number.
struct PendingAttempt<I: Initializer> {
   number: u64,
   attempt: Attempt<I>,
}

struct Inner<I: Initializer> {
   initializer: I,
   config: I::Config,
   ready: ReadyCell<Arc<I::Resource>>,
   /// Every phase transition happens under this lock.
   pending: Mutex<Option<PendingAttempt<I>>>,
   attempts: AtomicU64,
   status: watch::Sender<Status<I::Error>>,
}

/// A cloneable handle to one lazily-initialized shared resource.
///
/// All clones share the same state. Construct one coordinator per resource at
/// startup and hand clones to every consumer.
///
/// ```rust
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
///
/// use shared_once::{from_fn, Coordinator};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let runs = Arc::new(AtomicUsize::new(0));
/// let counter = Arc::clone(&runs);
/// let coordinator = Coordinator::new(
///    from_fn(move |greeting: &&'static str| {
///       counter.fetch_add(1, Ordering::SeqCst);
///       let greeting = *greeting;
///       async move { Ok::<_, std::io::Error>(greeting.to_uppercase()) }
///    }),
///    "hello",
/// );
///
/// let (a, b) = tokio::join!(coordinator.acquire(), coordinator.acquire());
/// assert!(Arc::ptr_eq(&a.unwrap(), &b.unwrap()));
/// assert_eq!(runs.load(Ordering::SeqCst), 1);
/// # }
/// ```
pub struct Coordinator<I: Initializer> {
   inner: Arc<Inner<I>>,
}

impl<I: Initializer> Coordinator<I> {
   /// Creates an empty coordinator. Nothing runs until the first [`acquire`](Self::acquire).
   pub fn new(initializer: I, config: I::Config) -> Self {
      let (status, _) = watch::channel(Status::default());
      Self {
         inner: Arc::new(Inner {
            initializer,
            config,
            ready: ReadyCell::new(),
            pending: Mutex::new(None),
            attempts: AtomicU64::new(0),
            status,
         }),
      }
   }

   /// Returns the shared resource, initializing it if needed.
   ///
   /// - If the resource is available, returns it without locking or suspending.
   /// - If an attempt is in flight, waits for that attempt.
   /// - Otherwise starts a new attempt and waits for it.
   ///
   /// Every waiter of an attempt receives the same outcome: the same `Arc` on
   /// success, the same [`AcquireError`] on failure. After a failure the next
   /// call starts a new attempt.
   ///
   /// The attempt runs as a spawned task, so it keeps running even if every
   /// waiter is dropped. If the task dies instead (the initializer panics, or
   /// the runtime shuts down), the slot reverts to `Empty` and the waiters get
   /// [`AcquireError::Aborted`].
   ///
   /// # Panics
   ///
   /// Panics if called outside a tokio runtime while an attempt has to be started.
   pub async fn acquire(&self) -> Outcome<I> {
      if let Some(resource) = self.inner.ready.get() {
         return Ok(Arc::clone(resource));
      }
      match self.enter() {
         Entry::Ready(resource) => Ok(resource),
         Entry::Wait(attempt) => attempt.await,
      }
   }

   /// Returns the resource if it is already available. Never starts an attempt.
   #[inline]
   pub fn get(&self) -> Option<Arc<I::Resource>> {
      self.inner.ready.get().cloned()
   }

   /// Returns the current phase.
   pub fn phase(&self) -> Phase {
      if self.inner.ready.is_ready() {
         return Phase::Completed;
      }
      let pending = self.inner.pending.lock();
      // Completion publishes under the same lock, so re-check.
      if self.inner.ready.is_ready() {
         Phase::Completed
      } else if pending.is_some() {
         Phase::Pending
      } else {
         Phase::Empty
      }
   }

   /// Number of attempts started so far.
   #[inline]
   pub fn attempts(&self) -> u64 {
      self.inner.attempts.load(Ordering::Acquire)
   }

   /// The configuration handed to every attempt.
   #[inline]
   pub fn config(&self) -> &I::Config {
      &self.inner.config
   }

   /// Returns a snapshot of the advisory status.
   pub fn status(&self) -> Status<I::Error> {
      self.inner.status.borrow().clone()
   }

   /// Subscribes to status changes.
   pub fn subscribe(&self) -> watch::Receiver<Status<I::Error>> {
      self.inner.status.subscribe()
   }

   /// Joins the in-flight attempt or starts one. The decision and its record
   /// happen under the slot lock, before any suspension point. The attempt
   /// task is spawned after the lock is released.
   fn enter(&self) -> Entry<I> {
      let (runtime, guard, attempt) = {
         let mut pending = self.inner.pending.lock();
         if let Some(resource) = self.inner.ready.get() {
            return Entry::Ready(Arc::clone(resource));
         }
         if let Some(current) = pending.as_ref() {
            tracing::debug!(attempt = current.number, "joining in-flight initialization");
            return Entry::Wait(current.attempt.clone());
         }
         Inner::begin(&self.inner, &mut pending)
      };

      let span = tracing::info_span!("shared_once.attempt", attempt = guard.number);
      // A runtime that is shutting down drops the task inside `spawn`, and the
      // guard's drop takes the slot lock.
      drop(runtime.spawn(guard.run().instrument(span)));
      Entry::Wait(attempt)
   }
}

impl<I: Initializer> Inner<I> {
   /// Records a new attempt in `slot` and returns the guard that will settle it.
   fn begin(
      this: &Arc<Self>,
      slot: &mut Option<PendingAttempt<I>>,
   ) -> (Handle, AttemptGuard<I>, Attempt<I>) {
      // Checked before any state is written.
      let runtime = match Handle::try_current() {
         Ok(runtime) => runtime,
         Err(err) => panic!("starting an initialization attempt requires a tokio runtime: {err}"),
      };

      let number = this.attempts.fetch_add(1, Ordering::AcqRel) + 1;
      let (tx, rx) = oneshot::channel::<Outcome<I>>();
      let attempt = async move {
         rx.await.unwrap_or_else(|_| {
            Err(AcquireError::Aborted {
               attempt: number,
               reason: "attempt dropped without an outcome".to_string(),
            })
         })
      }
      .boxed()
      .shared();

      *slot = Some(PendingAttempt {
         number,
         attempt: attempt.clone(),
      });
      this.status.send_modify(|status| {
         status.pending = true;
         status.last_error = None;
      });
      tracing::info!(attempt = number, "starting initialization");

      let guard = AttemptGuard {
         inner: Arc::clone(this),
         number,
         started: Instant::now(),
         outcome: Some(tx),
      };
      (runtime, guard, attempt)
   }
}

/// Owns one attempt from the moment it is recorded until it settles.
///
/// If dropped unsettled (the initializer panicked, or the task was cancelled
/// before or while running), reverts the slot to `Empty` and rejects every
/// waiter with [`AcquireError::Aborted`].
struct AttemptGuard<I: Initializer> {
   inner: Arc<Inner<I>>,
   number: u64,
   started: Instant,
   outcome: Option<oneshot::Sender<Outcome<I>>>,
}

impl<I: Initializer> AttemptGuard<I> {
   async fn run(self) {
      let inner = Arc::clone(&self.inner);
      match inner.initializer.initialize(&inner.config).await {
         Ok(resource) => self.complete(resource),
         Err(err) => self.fail(err),
      }
   }

   fn complete(mut self, resource: I::Resource) {
      let resource = Arc::new(resource);
      {
         let mut pending = self.inner.pending.lock();
         let published = self.inner.ready.publish(Arc::clone(&resource));
         debug_assert!(published.is_ok(), "only the pending attempt publishes");
         self.clear_slot(&mut pending);
         self.inner.status.send_modify(|status| {
            status.pending = false;
            status.last_error = None;
         });
      }

      tracing::info!(
         attempt = self.number,
         elapsed_ms = self.elapsed_ms(),
         "initialization complete"
      );
      self.settle(Ok(resource));
   }

   fn fail(mut self, err: I::Error) {
      let error = AcquireError::Initialization {
         attempt: self.number,
         source: Arc::new(err),
      };
      self.revert(error.clone());
      self.settle(Err(error));
   }

   fn revert(&self, error: AcquireError<I::Error>) {
      tracing::warn!(
         attempt = self.number,
         elapsed_ms = self.elapsed_ms(),
         error = %error,
         "initialization failed"
      );
      let mut pending = self.inner.pending.lock();
      self.clear_slot(&mut pending);
      self.inner.status.send_modify(|status| {
         status.pending = false;
         status.last_error = Some(error);
      });
   }

   fn clear_slot(&self, slot: &mut Option<PendingAttempt<I>>) {
      if slot.as_ref().is_some_and(|current| current.number == self.number) {
         *slot = None;
      }
   }

   /// Hands the outcome to the waiters. The slot must already be settled.
   fn settle(&mut self, outcome: Outcome<I>) {
      if let Some(tx) = self.outcome.take() {
         // No receiver left means every waiter gave up; nothing to deliver.
         let _ = tx.send(outcome);
      }
   }

   fn elapsed_ms(&self) -> u64 {
      u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX)
   }
}

impl<I: Initializer> Drop for AttemptGuard<I> {
   fn drop(&mut self) {
      if self.outcome.is_none() {
         return;
      }
      let error = AcquireError::Aborted {
         attempt: self.number,
         reason: "initializer panicked or its task was cancelled".to_string(),
      };
      self.revert(error.clone());
      self.settle(Err(error));
   }
}

impl<I: Initializer> Clone for Coordinator<I> {
   #[inline]
   fn clone(&self) -> Self {
      Self {
         inner: Arc::clone(&self.inner),
      }
   }
}

impl<I: Initializer> fmt::Debug for Coordinator<I> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("Coordinator")
         .field("phase", &self.phase())
         .field("attempts", &self.attempts())
         .finish_non_exhaustive()
   }
}
