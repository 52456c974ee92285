use shared_once::{AcquireError, Coordinator, LoadError, LoaderConfig, Status, ToolkitLoader};
use tracing_subscriber::EnvFilter;

const CONFIG: &str = r#"
location = "./worker.js"
latency_ms = 300
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
   tracing_subscriber::fmt()
      .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
      .init();

   let toolkit = Coordinator::new(ToolkitLoader, LoaderConfig::from_toml_str(CONFIG)?);

   let mut status = toolkit.subscribe();
   let spinner = tokio::spawn(async move {
      while status.changed().await.is_ok() {
         let snapshot = Status::<LoadError>::clone(&status.borrow_and_update());
         println!("[ui] loading={} error={:?}", snapshot.pending, snapshot.last_error);
         if !snapshot.pending {
            break;
         }
      }
   });

   // Both buttons pressed before the module finished loading
   let greet = {
      let toolkit = toolkit.clone();
      tokio::spawn(async move {
         let handle = toolkit.acquire().await?;
         Ok::<_, AcquireError<LoadError>>(handle.greet("Developer"))
      })
   };
   let fib = {
      let toolkit = toolkit.clone();
      tokio::spawn(async move {
         let handle = toolkit.acquire().await?;
         let mut report = |percent: u8, message: &str| {
            if percent % 25 == 0 {
               println!("[fib] {percent}% {message}");
            }
         };
         let value = handle.fibonacci(1000, Some(&mut report)).map_err(|e| e.to_string());
         Ok::<_, AcquireError<LoadError>>(value)
      })
   };

   println!("{}", greet.await??);
   println!("F(1000) = {}", fib.await??.map_err(std::io::Error::other)?);
   println!("attempts = {}", toolkit.attempts());
   spinner.await?;
   Ok(())
}
