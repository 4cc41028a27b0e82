use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use rstest::rstest;
use spindle_core::{
    Lifecycle, PoolConfig, PoolError, StopSource, Task, TaskError, WaitStatus, WorkerPool,
};

#[derive(Debug, thiserror::Error)]
#[error("Error#3")]
struct DivisibleByThree;

fn calculate_square(x: i64) -> Result<i64, DivisibleByThree> {
    let delay = rand::thread_rng().gen_range(1..20);
    thread::sleep(Duration::from_millis(delay));
    if x % 3 == 0 {
        return Err(DivisibleByThree);
    }
    Ok(x * x)
}

#[rstest]
#[case(1, 10)]
#[case(2, 100)]
#[case(8, 500)]
fn every_task_runs_exactly_once(#[case] workers: usize, #[case] tasks: usize) {
    let runs = Arc::new(Mutex::new(HashMap::<usize, usize>::new()));
    let pool = WorkerPool::new(workers).unwrap();

    let handles: Vec<_> = (0..tasks)
        .map(|i| {
            let runs = Arc::clone(&runs);
            pool.submit(move || {
                *runs.lock().unwrap().entry(i).or_default() += 1;
                i
            })
            .unwrap()
        })
        .collect();

    // interleave some reads with teardown
    for handle in handles.into_iter().step_by(3) {
        handle.get().unwrap();
    }
    pool.shutdown();

    let runs = runs.lock().unwrap();
    assert_eq!(runs.len(), tasks);
    assert!(runs.values().all(|&n| n == 1));
}

#[test]
fn squares_collected_by_input() {
    let pool = WorkerPool::new(3).unwrap();
    let handles: Vec<_> = (1..=9)
        .map(|x| (x, pool.submit_fallible(move || calculate_square(x)).unwrap()))
        .collect();

    for (x, handle) in handles {
        match handle.get() {
            Ok(square) => assert_eq!(square, x * x),
            Err(err) => {
                assert_eq!(x % 3, 0);
                assert!(err.downcast_ref::<DivisibleByThree>().is_some());
                assert_eq!(err.to_string(), "task failed: Error#3");
            }
        }
    }
}

#[test]
fn hundred_increments_on_four_workers() {
    let counter = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(4).unwrap();
    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        pool.execute(move || {
            counter.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap();
    }
    drop(pool);
    assert_eq!(counter.load(Ordering::Relaxed), 100);
}

#[test]
fn dequeue_order_follows_submit_order() {
    let started = Arc::new(Mutex::new(Vec::new()));
    let pool = WorkerPool::new(1).unwrap();
    for i in 0..50 {
        let started = Arc::clone(&started);
        pool.execute(move || started.lock().unwrap().push(i)).unwrap();
    }
    pool.shutdown();
    assert_eq!(*started.lock().unwrap(), (0..50).collect::<Vec<_>>());
}

#[test]
fn shutdown_terminates_with_slow_backlog() {
    let pool = WorkerPool::new(4).unwrap();
    for _ in 0..16 {
        pool.execute(|| thread::sleep(Duration::from_millis(20))).unwrap();
    }
    let start = Instant::now();
    pool.shutdown();
    // 16 tasks * 20ms over 4 workers: roughly 80ms of work
    assert!(start.elapsed() < Duration::from_secs(5));
    let status = pool.status();
    assert_eq!(status.lifecycle, Lifecycle::Stopped);
    assert_eq!(status.running_workers, 0);
    assert_eq!(status.succeeded, 16);
}

#[test]
fn submit_after_shutdown_is_an_error_and_nothing_runs() {
    let ran = Arc::new(AtomicUsize::new(0));
    let pool = WorkerPool::new(2).unwrap();
    pool.shutdown();

    let err = pool
        .submit({
            let ran = Arc::clone(&ran);
            move || ran.fetch_add(1, Ordering::SeqCst)
        })
        .unwrap_err();
    assert!(matches!(err, PoolError::ShuttingDown));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(ran.load(Ordering::SeqCst), 0);
}

#[test]
fn empty_task_then_valid_task() {
    let pool = WorkerPool::new(1).unwrap();
    assert!(matches!(
        pool.submit_task(Task::<String>::default()),
        Err(PoolError::EmptyTask)
    ));
    let handle = pool.submit_task(Task::new(|| "ok".to_string())).unwrap();
    assert_eq!(handle.get().unwrap(), "ok");
}

#[test]
fn progress_polling_with_wait_for() {
    let pool = WorkerPool::new(2).unwrap();
    let save = pool
        .submit(|| thread::sleep(Duration::from_millis(150)))
        .unwrap();

    let mut dots = 0;
    while save.wait_for(Duration::from_millis(10)) != WaitStatus::Ready {
        dots += 1;
    }
    assert!(dots > 0);
    save.get().unwrap();
}

#[test]
fn shared_handle_across_consumers() {
    let pool = WorkerPool::new(2).unwrap();
    let shared = pool
        .submit(|| {
            thread::sleep(Duration::from_millis(30));
            String::from("data.txt")
        })
        .unwrap()
        .share();

    let consumers: Vec<_> = (0..3)
        .map(|_| {
            let shared = shared.clone();
            thread::spawn(move || shared.get().unwrap())
        })
        .collect();
    for c in consumers {
        assert_eq!(c.join().unwrap(), "data.txt");
    }
}

#[test]
fn panicking_task_keeps_pool_capacity() {
    let pool = WorkerPool::new(2).unwrap();
    let panics: Vec<_> = (0..4)
        .map(|i| pool.submit::<_, ()>(move || panic!("task {i} failed")).unwrap())
        .collect();
    for (i, h) in panics.into_iter().enumerate() {
        match h.get() {
            Err(TaskError::Panicked(msg)) => assert_eq!(msg, format!("task {i} failed")),
            other => panic!("expected panic, got {other:?}"),
        }
    }
    assert_eq!(pool.status().running_workers, 2);
    assert_eq!(pool.submit(|| 1 + 1).unwrap().get().unwrap(), 2);
}

#[test]
fn stop_token_ends_a_long_task() {
    let pool = WorkerPool::with_config(PoolConfig::new(1).with_thread_name("stoppable")).unwrap();
    let source = StopSource::new();
    let token = source.token();
    let handle = pool
        .submit(move || {
            while !token.stop_requested() {
                thread::sleep(Duration::from_millis(5));
            }
            "stopped"
        })
        .unwrap();

    assert_eq!(handle.wait_for(Duration::from_millis(30)), WaitStatus::Timeout);
    source.request_stop();
    assert_eq!(handle.get().unwrap(), "stopped");
}

#[tokio::test]
async fn await_handles_from_async_code() {
    let pool = WorkerPool::new(2).unwrap();
    let a = pool.submit(|| 6 * 7).unwrap();
    let b = pool.submit_fallible(|| calculate_square(9)).unwrap();

    assert_eq!(a.get_async().await.unwrap(), 42);
    assert!(matches!(b.get_async().await, Err(TaskError::Failed(_))));
}
