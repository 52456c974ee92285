use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use shared_once::ReadyCell;

#[test]
fn test_new_is_not_ready() {
   let cell: ReadyCell<i32> = ReadyCell::new();
   assert!(!cell.is_ready());
   assert_eq!(cell.get(), None);
}

#[test]
fn test_publish() {
   let cell: ReadyCell<i32> = ReadyCell::default();

   // First publish wins
   assert_eq!(cell.publish(42), Ok(&42));
   assert!(cell.is_ready());
   assert_eq!(cell.get(), Some(&42));

   // Second publish hands the value back
   assert_eq!(cell.publish(24), Err(24));
   assert_eq!(cell.get(), Some(&42)); // Value remains unchanged
}

#[test]
fn test_debug() {
   let cell: ReadyCell<&str> = ReadyCell::new();
   assert_eq!(format!("{cell:?}"), "ReadyCell(<empty>)");
   cell.publish("toolkit").unwrap();
   assert_eq!(format!("{cell:?}"), "ReadyCell(\"toolkit\")");
}

#[test]
fn test_drop_releases_published_value() {
   let tracker = Arc::new(());
   {
      let cell = ReadyCell::new();
      cell.publish(Arc::clone(&tracker)).unwrap();
      assert_eq!(Arc::strong_count(&tracker), 2);
   }
   assert_eq!(Arc::strong_count(&tracker), 1);

   // An unpublished cell drops nothing
   let cell: ReadyCell<Arc<()>> = ReadyCell::new();
   drop(cell);
   assert_eq!(Arc::strong_count(&tracker), 1);
}

#[test]
fn test_multi_thread_publish_race() {
   let cell = Arc::new(ReadyCell::new());
   let winners = Arc::new(AtomicUsize::new(0));
   let threads: Vec<_> = (0..10)
      .map(|i| {
         let cell = Arc::clone(&cell);
         let winners = Arc::clone(&winners);
         thread::spawn(move || {
            thread::sleep(Duration::from_millis(5)); // Introduce slight offset
            if cell.publish(i).is_ok() {
               winners.fetch_add(1, Ordering::SeqCst);
            }
         })
      })
      .collect();

   for handle in threads {
      handle.join().unwrap();
   }
   // Losers may have bounced off a writer in progress, but exactly one published
   assert_eq!(winners.load(Ordering::SeqCst), 1);
   assert!(cell.is_ready());
   assert!(matches!(cell.get(), Some(v) if *v < 10));
}

#[test]
fn test_readers_see_published_value() {
   let cell = Arc::new(ReadyCell::<String>::new());
   let readers: Vec<_> = (0..4)
      .map(|_| {
         let cell = Arc::clone(&cell);
         thread::spawn(move || loop {
            if let Some(value) = cell.get() {
               return value.clone();
            }
            thread::yield_now();
         })
      })
      .collect();

   thread::sleep(Duration::from_millis(10));
   cell.publish(String::from("ready")).unwrap();

   for handle in readers {
      assert_eq!(handle.join().unwrap(), "ready");
   }
}
