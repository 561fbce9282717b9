//! Integration tests for cached-emitter
//!
//! End-to-end scenarios over the public API: registry bookkeeping, dispatch,
//! forking, single-flight calls and shared subscriptions, on both tokio
//! flavors.

#[cfg(feature = "tokio-scheduler")]
use std::sync::atomic::AtomicBool;
use std::{
  sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, Mutex,
  },
  time::Duration,
};

use cached_emitter::prelude::*;
#[cfg(feature = "tokio-scheduler")]
use tokio::time::{interval_at, Instant};
use tokio::{
  sync::{Barrier, Notify},
  time::sleep,
};

fn count_named<T>(emitter: &Emitter<T>, name: &str) -> usize {
  let name = EventName::from(name);
  emitter
    .subscriptions()
    .iter()
    .filter(|s| s.event_name() == Some(&name))
    .count()
}

#[cached_emitter_macro::test]
fn registry_scenario() {
  let emitter = Emitter::<bool>::new();
  let callback = Listener::new(|_| {});

  emitter.on("test1", |_| {});
  emitter.on("test2", |_| {});
  emitter.subscribe("test3", callback.clone());
  emitter.on("test3", |_| {});
  assert_eq!(emitter.len(), 4);
  assert_eq!(count_named(&emitter, "test3"), 2);

  emitter.off_event("test3");
  assert_eq!(emitter.len(), 2);
  assert_eq!(count_named(&emitter, "test3"), 0);
  assert!(!emitter.has_callback(&callback));
}

#[cached_emitter_macro::test]
fn lifecycle_signals_follow_the_last_subscription() {
  let emitter = Emitter::<u8>::new();
  let log = Arc::new(Mutex::new(Vec::<String>::new()));

  let a = emitter.on(1, |_| {});
  let b = emitter.on(1, |_| {});
  let c_log = log.clone();
  emitter.on_unsubscribe(&a, move || c_log.lock().unwrap().push("a".into()));
  let c_log = log.clone();
  emitter.on_unsubscribe_all(1, move || c_log.lock().unwrap().push("all".into()));

  // A user event spelled like a lifecycle signal is just another name.
  let c_log = log.clone();
  emitter.on(format!("unsubscribed:{a}"), move |_| c_log.lock().unwrap().push("user".into()));

  emitter.off(&a);
  assert_eq!(*log.lock().unwrap(), vec!["a".to_string()]);

  emitter.off(&b);
  assert_eq!(*log.lock().unwrap(), vec!["a".to_string(), "all".to_string()]);
}

// Detached bodies sleep on the tokio clock.
#[cfg(feature = "tokio-scheduler")]
#[cached_emitter_macro::test(paused)]
async fn sync_and_async_dispatch() {
  let emitter = Emitter::<u32>::new();
  let sum = Arc::new(AtomicUsize::new(0));

  for _ in 0..2 {
    let sum = sum.clone();
    emitter.on_async("add", move |v| {
      let sum = sum.clone();
      async move {
        sleep(Duration::from_millis(100)).await;
        sum.fetch_add(v as usize, Ordering::SeqCst);
        Ok(())
      }
    });
  }

  emitter.emit_async("add", 10).await.unwrap();
  assert_eq!(sum.load(Ordering::SeqCst), 20);

  emitter.emit_sync("add", 1);
  assert_eq!(sum.load(Ordering::SeqCst), 20);

  sleep(Duration::from_millis(150)).await;
  assert_eq!(sum.load(Ordering::SeqCst), 22);
}

#[cached_emitter_macro::test]
fn fork_and_fork_with() {
  let emitter = Emitter::<bool>::new();
  let t1 = emitter.on("test1", |_| {});
  let t2 = emitter.on("test2", |_| {});
  let t3 = emitter.on("test3", |_| {});

  let full = emitter.fork();
  let order: Vec<_> = full.subscriptions().iter().map(|s| s.token().clone()).collect();
  assert_eq!(order, vec![t1.clone(), t2.clone(), t3.clone()]);

  let subset = emitter.fork_with(|subs| {
    subs
      .iter()
      .filter(|s| s.token() != &t2)
      .cloned()
      .collect::<Vec<_>>()
  });
  assert_eq!(subset.len(), 2);
  assert!(!subset.has(&t2));
  assert_eq!(emitter.len(), 3);
  assert!(emitter.has(&t2));
}

#[cached_emitter_macro::test(shared)]
async fn single_flight_across_threads() {
  const CALLERS: usize = 16;

  let calls = Emitter::<Outcome<String, String>>::new();
  let runs = Arc::new(AtomicUsize::new(0));
  let release = Arc::new(Notify::new());
  let joined = Arc::new(Barrier::new(CALLERS + 1));

  let mut handles = vec![];
  for _ in 0..CALLERS {
    let calls = calls.clone();
    let runs = runs.clone();
    let release = release.clone();
    let joined = joined.clone();
    handles.push(tokio::spawn(async move {
      let pending = calls.cache_call("k", move || async move {
        runs.fetch_add(1, Ordering::SeqCst);
        release.notified().await;
        Ok("value".to_string())
      });
      joined.wait().await;
      pending.await
    }));
  }

  joined.wait().await;
  release.notify_one();

  for handle in handles {
    assert_eq!(handle.await.unwrap(), Ok("value".to_string()));
  }
  assert_eq!(runs.load(Ordering::SeqCst), 1);
  assert!(calls.is_empty());
}

#[cfg(feature = "tokio-scheduler")]
#[cached_emitter_macro::test]
async fn single_flight_failure_reaches_every_caller() {
  let calls = Emitter::<Outcome<u32, String>>::new();

  let first = calls.cache_call("k", || async {
    tokio::task::yield_now().await;
    Err("db down".to_string())
  });
  let second = calls.cache_call("k", || async { Ok(1) });

  let (first, second) = tokio::join!(first, second);
  assert_eq!(first, Err(CallError::Failed("db down".to_string())));
  assert_eq!(first, second);
}

#[cached_emitter_macro::test]
fn single_flight_without_scheduler() {
  let calls = Emitter::<Outcome<u32, String>>::builder()
    .scheduler(NoScheduler)
    .build::<Outcome<u32, String>>();

  let pending = calls.cache_call("k", || async { Ok(1) });
  assert_eq!(futures::executor::block_on(pending), Err(CallError::Unscheduled));
}

#[cfg(feature = "tokio-scheduler")]
#[cached_emitter_macro::test(paused)]
async fn shared_subscription_scenario() {
  let emitter = Emitter::<String>::new();
  let listening = Arc::new(AtomicBool::new(false));
  let raw = Arc::new(AtomicUsize::new(0));
  let cached = Arc::new(AtomicUsize::new(0));

  let source = || {
    let listening = listening.clone();
    let raw = raw.clone();
    move |sink: Sink<String>| async move {
      listening.store(true, Ordering::SeqCst);
      let period = Duration::from_millis(100);
      let c_raw = raw.clone();
      let ticking = tokio::spawn(async move {
        let mut ticks = interval_at(Instant::now() + period, period);
        loop {
          ticks.tick().await;
          c_raw.fetch_add(1, Ordering::SeqCst);
          sink.emit("1".to_string());
        }
      });
      Ok::<_, BoxError>(Teardown::new(move || {
        ticking.abort();
        listening.store(false, Ordering::SeqCst);
      }))
    }
  };
  let on_data = || {
    let cached = cached.clone();
    Listener::new(move |v: String| {
      assert_eq!(v, "1");
      cached.fetch_add(1, Ordering::SeqCst);
    })
  };

  let first = emitter.cache_subscribe("q", source(), on_data());
  let second = emitter.cache_subscribe("q", source(), on_data());

  sleep(Duration::from_millis(150)).await;
  assert!(listening.load(Ordering::SeqCst));
  assert_eq!(raw.load(Ordering::SeqCst), 1);
  assert_eq!(cached.load(Ordering::SeqCst), 2);

  emitter.off(&first);
  sleep(Duration::from_millis(200)).await;
  assert!(listening.load(Ordering::SeqCst));
  assert_eq!(raw.load(Ordering::SeqCst), 3);
  assert_eq!(cached.load(Ordering::SeqCst), 4);

  emitter.off(&second);
  sleep(Duration::from_millis(200)).await;
  assert!(!listening.load(Ordering::SeqCst));
  assert_eq!(raw.load(Ordering::SeqCst), 3);
  assert_eq!(cached.load(Ordering::SeqCst), 4);
}

#[cached_emitter_macro::test(shared)]
async fn shared_subscription_establishes_once_across_threads() {
  const JOINERS: usize = 8;

  let emitter = Emitter::<u32>::new();
  let establishes = Arc::new(AtomicUsize::new(0));
  let teardowns = Arc::new(AtomicUsize::new(0));

  let mut handles = vec![];
  for _ in 0..JOINERS {
    let emitter = emitter.clone();
    let establishes = establishes.clone();
    let teardowns = teardowns.clone();
    handles.push(tokio::spawn(async move {
      emitter.cache_subscribe(
        "shared",
        move |_sink| async move {
          establishes.fetch_add(1, Ordering::SeqCst);
          Ok(Teardown::new(move || {
            teardowns.fetch_add(1, Ordering::SeqCst);
          }))
        },
        Listener::new(|_| {}),
      )
    }));
  }
  let mut tokens = vec![];
  for handle in handles {
    tokens.push(handle.await.unwrap());
  }

  for token in &tokens {
    emitter.off(token);
  }
  // Teardown waits for establish; give both a moment on the pool.
  for _ in 0..50 {
    if teardowns.load(Ordering::SeqCst) == 1 {
      break;
    }
    sleep(Duration::from_millis(10)).await;
  }

  assert_eq!(establishes.load(Ordering::SeqCst), 1);
  assert_eq!(teardowns.load(Ordering::SeqCst), 1);
  assert!(emitter.is_empty());
}
