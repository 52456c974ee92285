//! Publish-once storage for a completed value.
//!
//! [`ReadyCell`] is written at most once and read any number of times. Readers
//! check a single atomic flag byte and never take a lock, so the steady state
//! after publication costs one `Acquire` load per read.
//!
//! The flag byte has the following layout:
//! - Bit 0: READY - A value has been published
//! - Bit 1: WRITING - A writer holds the exclusive right to publish
//!
//! A writer claims the cell with a compare-and-swap on WRITING. The returned
//! [`PublishGuard`] either commits (READY is set, WRITING stays set forever) or
//! is dropped, which releases WRITING so that another writer may try.

use core::cell::UnsafeCell;
use core::sync::atomic::{AtomicU8, Ordering};
use core::{fmt, mem};

/// Atomic flag byte guarding a [`ReadyCell`].
#[repr(transparent)]
struct ReadyFlags(AtomicU8);

impl ReadyFlags {
   /// Bit flag: value is published.
   const READY: u8 = 1;
   /// Bit flag: a writer holds the cell.
   const WRITING: u8 = 2;

   #[inline]
   const fn new() -> Self {
      Self(AtomicU8::new(0))
   }

   #[inline]
   fn is_ready(&self, ordering: Ordering) -> bool {
      self.0.load(ordering) & Self::READY != 0
   }

   /// Claims the right to publish.
   ///
   /// Returns `None` if the cell is already published or another writer holds it.
   #[inline]
   fn try_claim(&self) -> Option<PublishGuard<'_>> {
      loop {
         let current = self.0.load(Ordering::Relaxed);
         if current & (Self::READY | Self::WRITING) != 0 {
            return None;
         }
         match self.0.compare_exchange_weak(
            current,
            current | Self::WRITING,
            Ordering::Acquire,
            Ordering::Relaxed,
         ) {
            Ok(_) => return Some(PublishGuard { flags: self }),
            Err(_) => std::hint::spin_loop(),
         }
      }
   }
}

/// Exclusive right to publish into a [`ReadyCell`].
///
/// Dropping the guard without calling [`commit`](Self::commit) releases the claim.
struct PublishGuard<'a> {
   flags: &'a ReadyFlags,
}

impl PublishGuard<'_> {
   /// Marks the value as published. The write to the slot must happen before this.
   #[inline]
   fn commit(self) {
      // Release pairs with the Acquire load in `ReadyCell::get`.
      self.flags.0.fetch_or(ReadyFlags::READY, Ordering::Release);
      mem::forget(self);
   }
}

impl Drop for PublishGuard<'_> {
   #[inline]
   fn drop(&mut self) {
      self.flags.0.fetch_and(!ReadyFlags::WRITING, Ordering::Release);
   }
}

/// A cell that is published at most once and read without locking.
///
/// Once [`publish`](Self::publish) succeeds the value is never replaced or
/// removed for the lifetime of the cell.
pub struct ReadyCell<T> {
   value: UnsafeCell<mem::MaybeUninit<T>>,
   flags: ReadyFlags,
}

impl<T> ReadyCell<T> {
   /// Creates an empty cell.
   #[inline]
   #[must_use]
   pub const fn new() -> Self {
      Self {
         value: UnsafeCell::new(mem::MaybeUninit::uninit()),
         flags: ReadyFlags::new(),
      }
   }

   /// Returns `true` once a value has been published.
   ///
   /// This method never blocks.
   #[inline]
   pub fn is_ready(&self) -> bool {
      self.flags.is_ready(Ordering::Acquire)
   }

   /// Returns the published value, or `None` if nothing was published yet.
   ///
   /// This method never blocks.
   #[inline]
   pub fn get(&self) -> Option<&T> {
      if self.is_ready() {
         // SAFETY: READY is only set after the value was written, and the
         // Acquire load above synchronizes with the Release in `commit`.
         Some(unsafe { (*self.value.get()).assume_init_ref() })
      } else {
         None
      }
   }

   /// Publishes `value` if the cell is empty and no other writer holds it.
   ///
   /// - On success returns `Ok(&value)`.
   /// - If the cell is already published, or another thread is publishing
   ///   right now, returns `Err(value)`.
   pub fn publish(&self, value: T) -> Result<&T, T> {
      let Some(guard) = self.flags.try_claim() else {
         return Err(value);
      };
      // SAFETY: the guard grants exclusive write access and the slot is uninitialized.
      let published = unsafe { (*self.value.get()).write(value) };
      guard.commit();
      Ok(published)
   }
}

// SAFETY: the value is written once by the claiming thread and only shared
// afterwards, so sharing the cell requires `T: Sync`, and since the writer and
// the dropping thread may differ, also `T: Send`.
unsafe impl<T: Send + Sync> Sync for ReadyCell<T> {}
// SAFETY: moving the cell moves the (possibly present) `T`.
unsafe impl<T: Send> Send for ReadyCell<T> {}

impl<T> Default for ReadyCell<T> {
   #[inline]
   fn default() -> Self {
      Self::new()
   }
}

impl<T: fmt::Debug> fmt::Debug for ReadyCell<T> {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut d = f.debug_tuple("ReadyCell");
      match self.get() {
         Some(v) => d.field(v),
         None => d.field(&format_args!("<empty>")),
      };
      d.finish()
   }
}

impl<T> Drop for ReadyCell<T> {
   #[inline]
   fn drop(&mut self) {
      if self.flags.is_ready(Ordering::Relaxed) {
         // SAFETY: exclusive access, and READY means the slot was initialized.
         unsafe { self.value.get_mut().assume_init_drop() };
      }
   }
}
