//! The construction side of a shared resource.

use core::fmt;
use core::future::Future;
use core::marker::PhantomData;

use async_trait::async_trait;

/// Builds a shared resource from a fixed configuration.
///
/// Implementations perform the slow, fallible work (loading a module, opening
/// a connection pool, warming a cache). Calling [`initialize`](Self::initialize)
/// directly does no deduplication: two concurrent calls run the work twice.
/// Wrap the initializer in a [`Coordinator`](crate::Coordinator) to get
/// single-flight behavior.
#[async_trait]
pub trait Initializer: Send + Sync + 'static {
   /// Fixed input handed to every attempt.
   type Config: Send + Sync + 'static;
   /// The value produced by a successful attempt.
   type Resource: Send + Sync + 'static;
   /// Failure of an attempt. Passed to waiters unchanged.
   type Error: std::error::Error + Send + Sync + 'static;

   /// Runs one initialization attempt.
   async fn initialize(&self, config: &Self::Config) -> Result<Self::Resource, Self::Error>;
}

/// An [`Initializer`] backed by a closure. Created by [`from_fn`].
pub struct FnInitializer<C, F> {
   f: F,
   _config: PhantomData<fn(&C)>,
}

/// Adapts a closure returning a future into an [`Initializer`].
///
/// ```rust
/// use shared_once::{from_fn, Coordinator};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let coordinator = Coordinator::new(
///    from_fn(|base: &u32| {
///       let base = *base;
///       async move { Ok::<_, std::io::Error>(base * 2) }
///    }),
///    21,
/// );
/// assert_eq!(*coordinator.acquire().await.unwrap(), 42);
/// # }
/// ```
pub fn from_fn<C, F, Fut, R, E>(f: F) -> FnInitializer<C, F>
where
   F: Fn(&C) -> Fut + Send + Sync + 'static,
   Fut: Future<Output = Result<R, E>> + Send + 'static,
{
   FnInitializer {
      f,
      _config: PhantomData,
   }
}

#[async_trait]
impl<C, F, Fut, R, E> Initializer for FnInitializer<C, F>
where
   C: Send + Sync + 'static,
   F: Fn(&C) -> Fut + Send + Sync + 'static,
   Fut: Future<Output = Result<R, E>> + Send + 'static,
   R: Send + Sync + 'static,
   E: std::error::Error + Send + Sync + 'static,
{
   type Config = C;
   type Resource = R;
   type Error = E;

   async fn initialize(&self, config: &C) -> Result<R, E> {
      (self.f)(config).await
   }
}

impl<C, F> fmt::Debug for FnInitializer<C, F> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      f.debug_struct("FnInitializer").finish_non_exhaustive()
   }
}
