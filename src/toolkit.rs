//! Reference resource: a module handle exposing two slow operations.
//!
//! [`ToolkitLoader`] stands in for loading a compiled module from a location
//! and [`Toolkit`] is the handle it produces. The operations are deliberately
//! self-contained; the coordinator treats them as opaque.

use core::{fmt, mem};

use async_trait::async_trait;
use thiserror::Error;

use crate::config::LoaderConfig;
use crate::initializer::Initializer;

/// Failure to load the toolkit module.
#[derive(Debug, Error)]
pub enum LoadError {
   #[error("module location is empty")]
   EmptyLocation,

   #[error("unsupported module `{location}`: expected a .js or .wasm file")]
   UnsupportedModule { location: String },
}

/// Failure of an operation on a loaded [`Toolkit`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OperationError {
   #[error("fibonacci index must be non-negative, got {0}")]
   NegativeIndex(i64),
}

/// Loads a [`Toolkit`] from [`LoaderConfig::location`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolkitLoader;

#[async_trait]
impl Initializer for ToolkitLoader {
   type Config = LoaderConfig;
   type Resource = Toolkit;
   type Error = LoadError;

   async fn initialize(&self, config: &LoaderConfig) -> Result<Toolkit, LoadError> {
      tracing::debug!(location = %config.location, latency_ms = config.latency_ms, "loading toolkit module");
      if !config.latency().is_zero() {
         tokio::time::sleep(config.latency()).await;
      }

      let location = config.location.trim();
      if location.is_empty() {
         return Err(LoadError::EmptyLocation);
      }
      if !(location.ends_with(".js") || location.ends_with(".wasm")) {
         return Err(LoadError::UnsupportedModule {
            location: location.to_owned(),
         });
      }
      Ok(Toolkit {
         location: location.to_owned(),
      })
   }
}

/// A loaded module handle. Immutable; every operation takes `&self`.
#[derive(Debug)]
pub struct Toolkit {
   location: String,
}

impl Toolkit {
   /// Where this module was loaded from.
   pub fn location(&self) -> &str {
      &self.location
   }

   /// Returns a greeting for `name`, or for the world when `name` is empty.
   pub fn greet(&self, name: &str) -> String {
      if name.is_empty() {
         "Hello, World!".to_owned()
      } else {
         format!("Hello, {name}!")
      }
   }

   /// Computes the `n`th Fibonacci number with arbitrary precision and returns
   /// it in decimal.
   ///
   /// `progress`, when given, receives a non-decreasing percentage and a short
   /// message. The last report is always `100`.
   pub fn fibonacci(
      &self,
      n: i64,
      progress: Option<&mut dyn FnMut(u8, &str)>,
   ) -> Result<String, OperationError> {
      let n = u64::try_from(n).map_err(|_| OperationError::NegativeIndex(n))?;
      let mut progress = Progress {
         sink: progress,
         last: None,
      };

      let mut prev = Decimal::from_small(0);
      let mut curr = Decimal::from_small(1);
      if n == 0 {
         progress.finish();
         return Ok(prev.to_string());
      }
      for i in 2..=n {
         let next = prev.add(&curr);
         prev = mem::replace(&mut curr, next);
         progress.advance((i * 100 / n).min(99) as u8);
      }
      progress.finish();
      Ok(curr.to_string())
   }
}

struct Progress<'a> {
   sink: Option<&'a mut dyn FnMut(u8, &str)>,
   last: Option<u8>,
}

impl Progress<'_> {
   fn advance(&mut self, percent: u8) {
      if self.last.is_some_and(|last| last >= percent) {
         return;
      }
      self.last = Some(percent);
      if let Some(sink) = self.sink.as_mut() {
         sink(percent, "computing");
      }
   }

   fn finish(&mut self) {
      self.last = Some(100);
      if let Some(sink) = self.sink.as_mut() {
         sink(100, "done");
      }
   }
}

/// Unsigned integer stored as little-endian base 10^9 limbs.
struct Decimal(Vec<u32>);

impl Decimal {
   const BASE: u64 = 1_000_000_000;

   fn from_small(value: u32) -> Self {
      debug_assert!(u64::from(value) < Self::BASE);
      Self(vec![value])
   }

   fn add(&self, other: &Self) -> Self {
      let (long, short) = if self.0.len() >= other.0.len() {
         (&self.0, &other.0)
      } else {
         (&other.0, &self.0)
      };
      let mut limbs = Vec::with_capacity(long.len() + 1);
      let mut carry = 0u64;
      for (i, &limb) in long.iter().enumerate() {
         let sum = u64::from(limb) + u64::from(short.get(i).copied().unwrap_or(0)) + carry;
         limbs.push((sum % Self::BASE) as u32);
         carry = sum / Self::BASE;
      }
      if carry != 0 {
         limbs.push(carry as u32);
      }
      Self(limbs)
   }
}

impl fmt::Display for Decimal {
   fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
      let mut limbs = self.0.iter().rev();
      match limbs.next() {
         Some(top) => write!(f, "{top}")?,
         None => return f.write_str("0"),
      }
      for limb in limbs {
         write!(f, "{limb:09}")?;
      }
      Ok(())
   }
}
