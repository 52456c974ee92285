//! Errors surfaced by [`Coordinator::acquire`](crate::Coordinator::acquire).

use std::sync::Arc;

use thiserror::Error;

/// Failure of one initialization attempt, shared by every waiter of that attempt.
///
/// The initializer's own error is held behind an [`Arc`], so all waiters of a
/// failed attempt receive the very same error value and the type stays `Clone`.
#[derive(Debug, Error)]
pub enum AcquireError<E>
where
   E: std::error::Error + 'static,
{
   /// The initializer returned an error.
   #[error("initialization attempt {attempt} failed: {source}")]
   Initialization { attempt: u64, source: Arc<E> },

   /// The attempt never produced an outcome (the initializer panicked or the
   /// runtime shut down underneath it).
   #[error("initialization attempt {attempt} aborted: {reason}")]
   Aborted { attempt: u64, reason: String },
}

impl<E> AcquireError<E>
where
   E: std::error::Error + 'static,
{
   /// Number of the attempt that produced this error.
   pub fn attempt(&self) -> u64 {
      match self {
         Self::Initialization { attempt, .. } | Self::Aborted { attempt, .. } => *attempt,
      }
   }

   /// The initializer's error, if the attempt failed through it.
   pub fn initialization_error(&self) -> Option<&Arc<E>> {
      match self {
         Self::Initialization { source, .. } => Some(source),
         Self::Aborted { .. } => None,
      }
   }
}

impl<E> Clone for AcquireError<E>
where
   E: std::error::Error + 'static,
{
   fn clone(&self) -> Self {
      match self {
         Self::Initialization { attempt, source } => Self::Initialization {
            attempt: *attempt,
            source: Arc::clone(source),
         },
         Self::Aborted { attempt, reason } => Self::Aborted {
            attempt: *attempt,
            reason: reason.clone(),
         },
      }
   }
}
