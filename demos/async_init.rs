use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use shared_once::{from_fn, Coordinator};
use tokio::time::{sleep, Duration};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")))
      .init();

   let counter = Arc::new(AtomicUsize::new(0));
   let runs = Arc::clone(&counter);
   let data = Coordinator::new(
      from_fn(move |label: &&'static str| {
         // This runs only once per attempt
         runs.fetch_add(1, Ordering::Relaxed);
         let label = *label;
         async move {
            sleep(Duration::from_millis(50)).await;
            Ok::<_, std::io::Error>(format!("{label} expensive data"))
         }
      }),
      "Async",
   );

   let tasks: Vec<_> = (0..5)
      .map(|i| {
         let data = data.clone();
         tokio::spawn(async move {
            let value = data.acquire().await.unwrap();
            println!("Task {i} access: {value}");
         })
      })
      .collect();

   for t in tasks {
      t.await.unwrap();
   }

   assert_eq!(counter.load(Ordering::Relaxed), 1); // Initializer ran only once
   println!("Final async data: {}", data.acquire().await.unwrap());
}
