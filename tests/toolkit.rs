use std::time::Duration;

use shared_once::{
   AcquireError, Coordinator, Initializer, LoadError, LoaderConfig, OperationError, Phase,
   ToolkitLoader,
};

async fn load() -> std::sync::Arc<shared_once::Toolkit> {
   Coordinator::new(ToolkitLoader, LoaderConfig::default())
      .acquire()
      .await
      .unwrap()
}

#[tokio::test]
async fn test_greet() {
   let toolkit = load().await;
   let cases = [
      ("Alice", "Hello, Alice!"),
      ("", "Hello, World!"),
      ("O'Brien", "Hello, O'Brien!"),
   ];
   for (name, expected) in cases {
      assert_eq!(toolkit.greet(name), expected, "greet({name:?})");
   }
}

#[tokio::test]
async fn test_fibonacci() {
   let toolkit = load().await;
   let cases = [(0, "0"), (1, "1"), (2, "1"), (10, "55"), (20, "6765")];
   for (n, expected) in cases {
      assert_eq!(toolkit.fibonacci(n, None).as_deref(), Ok(expected), "F({n})");
   }
   assert_eq!(toolkit.fibonacci(-1, None), Err(OperationError::NegativeIndex(-1)));
}

#[tokio::test]
async fn test_fibonacci_progress() {
   let toolkit = load().await;
   let mut calls = 0;
   let mut last_percent = 0u8;
   let mut monotone = true;
   let mut sink = |percent: u8, _message: &str| {
      calls += 1;
      monotone &= percent >= last_percent;
      last_percent = percent;
   };

   let result = toolkit.fibonacci(100, Some(&mut sink)).unwrap();
   assert_eq!(result, "354224848179261915075");
   assert!(calls > 0, "callback was never called");
   assert!(monotone, "progress went backwards");
   assert_eq!(last_percent, 100);
}

#[tokio::test]
async fn test_fibonacci_beyond_u128() {
   let toolkit = load().await;
   let f1000 = toolkit.fibonacci(1000, None).unwrap();
   assert_eq!(f1000.len(), 209);
   assert!(f1000.starts_with("4346655768693745643"));
   assert!(f1000.ends_with("76137795166849228875"));
}

#[tokio::test]
async fn test_loader_rejects_bad_locations() {
   let err = ToolkitLoader
      .initialize(&LoaderConfig::new("   "))
      .await
      .unwrap_err();
   assert!(matches!(err, LoadError::EmptyLocation));

   let err = ToolkitLoader
      .initialize(&LoaderConfig::new("./worker.txt"))
      .await
      .unwrap_err();
   assert_eq!(
      err.to_string(),
      "unsupported module `./worker.txt`: expected a .js or .wasm file"
   );
}

#[tokio::test(start_paused = true)]
async fn test_loader_latency_is_observable_as_pending() {
   let config = LoaderConfig::new("./worker.js").with_latency(Duration::from_secs(2));
   let coordinator = Coordinator::new(ToolkitLoader, config);

   let waiter = tokio::spawn({
      let coordinator = coordinator.clone();
      async move { coordinator.acquire().await }
   });
   tokio::time::sleep(Duration::from_secs(1)).await;
   assert_eq!(coordinator.phase(), Phase::Pending);
   assert!(coordinator.status().pending);

   let toolkit = waiter.await.unwrap().unwrap();
   assert_eq!(toolkit.location(), "./worker.js");
   assert_eq!(coordinator.phase(), Phase::Completed);
}

#[tokio::test]
async fn test_loader_failure_is_passed_through() {
   let config = LoaderConfig::from_toml_str("location = \"./worker.so\"").unwrap();
   let coordinator = Coordinator::new(ToolkitLoader, config);

   let err = coordinator.acquire().await.unwrap_err();
   let AcquireError::Initialization { attempt, source } = &err else {
      panic!("expected an initialization error, got {err:?}");
   };
   assert_eq!(*attempt, 1);
   assert!(matches!(**source, LoadError::UnsupportedModule { .. }));
   assert_eq!(coordinator.phase(), Phase::Empty);
}
