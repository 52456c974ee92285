use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use shared_once::{from_fn, Coordinator, Phase};
use tracing_subscriber::EnvFilter;

#[derive(Debug, thiserror::Error)]
#[error("Initialization failed!")]
struct InitFailed;

#[tokio::main(flavor = "current_thread")]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .init();

   let fail = Arc::new(AtomicBool::new(true));
   let should_fail = Arc::clone(&fail);
   let data = Coordinator::new(
      from_fn(move |_: &()| {
         let fail = should_fail.load(Ordering::SeqCst);
         async move {
            println!("Attempting initialization (fail={fail})...");
            if fail {
               Err(InitFailed)
            } else {
               Ok("Successfully initialized".to_string())
            }
         }
      }),
      (),
   );

   // First attempt fails
   match data.acquire().await {
      Ok(_) => panic!("Should have failed"),
      Err(e) => println!("Caught error: {e}"),
   }
   assert_eq!(data.phase(), Phase::Empty); // Still uninitialized
   println!("Status: {:?}", data.status());

   // Second attempt succeeds
   fail.store(false, Ordering::SeqCst);
   match data.acquire().await {
      Ok(value) => println!("Got data: {value}"),
      Err(_) => panic!("Should have succeeded"),
   }
   assert_eq!(data.phase(), Phase::Completed);
   assert!(data.status().last_error.is_none());

   // Later calls return the cached value, even if the initializer would now fail
   fail.store(true, Ordering::SeqCst);
   match data.acquire().await {
      Ok(value) => println!("Got data again: {value}"),
      Err(_) => panic!("Should have returned existing data"),
   }
   assert_eq!(data.attempts(), 2);
}
