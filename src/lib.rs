//! A lazily-initialized, shared asynchronous resource with single-flight initialization.
//!
//! This crate provides one coordination primitive and the pieces around it:
//!
//! - [`Coordinator<I>`]: A cloneable handle that initializes a resource on first
//!   use, shares the in-flight attempt with every concurrent caller, caches the
//!   result, and starts over cleanly after a failure.
//! - [`Initializer`]: The slow, fallible construction routine a coordinator runs.
//!   [`from_fn`] adapts a closure.
//! - [`ReadyCell<T>`]: The publish-once cell holding the completed resource,
//!   readable without locking.
//!
//! # Guarantees
//!
//! - **At most one attempt in flight**: concurrent callers attach to the same
//!   attempt instead of starting their own.
//! - **Shared outcome**: all waiters of an attempt receive the same `Arc` on
//!   success or the same [`AcquireError`] on failure.
//! - **Clean retry**: a failed attempt is discarded, and the next
//!   [`acquire`](Coordinator::acquire) starts a new one.
//! - **Lock-free steady state**: once completed, `acquire` is an atomic load and
//!   an `Arc` clone.
//!
//! # Examples
//!
//! ```rust
//! use shared_once::{Coordinator, LoaderConfig, ToolkitLoader};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let toolkit = Coordinator::new(ToolkitLoader, LoaderConfig::new("./worker.js"));
//!
//! let handle = toolkit.acquire().await?;
//! assert_eq!(handle.greet("Developer"), "Hello, Developer!");
//! assert_eq!(handle.fibonacci(10, None)?, "55");
//! assert_eq!(toolkit.attempts(), 1);
//! # Ok(())
//! # }
//! ```

/// Single-flight coordinator.
mod coordinator;

/// Errors surfaced to waiters.
mod error;

/// Initializer trait and closure adapter.
mod initializer;

/// Publish-once storage.
mod ready;

/// Loader configuration.
pub mod config;

/// Reference resource.
pub mod toolkit;

pub use config::{ConfigError, LoaderConfig};
pub use coordinator::{Coordinator, Phase, Status};
pub use error::AcquireError;
pub use initializer::{from_fn, FnInitializer, Initializer};
pub use ready::ReadyCell;
pub use toolkit::{LoadError, OperationError, Toolkit, ToolkitLoader};
