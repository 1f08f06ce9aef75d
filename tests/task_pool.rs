use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use asyncpool::task_pool::BoxError;
use asyncpool::{ErrorMode, PoolConfig, PoolError, TaskPool};
use rand::Rng;

fn counting_pool(limit: u32, jobs: usize, counter: &Arc<AtomicUsize>) -> TaskPool<(), String> {
    let mut pool = TaskPool::new(limit).unwrap();
    for _ in 0..jobs {
        let counter = Arc::clone(counter);
        pool.add_task(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    pool
}

#[tokio::test]
async fn counts_every_job_once_for_any_limit() {
    for limit in [1, 2, 10, 300] {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut pool = counting_pool(limit, 1000, &counter);
        assert_eq!(pool.pending(), 1000);

        pool.run_all().await.unwrap();

        assert_eq!(counter.load(Ordering::SeqCst), 1000, "limit {limit}");
        assert_eq!(pool.pending(), 0);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn never_exceeds_limit() {
    let limit = 8;
    let active = Arc::new(AtomicUsize::new(0));
    let peak = Arc::new(AtomicUsize::new(0));
    let done = Arc::new(AtomicUsize::new(0));

    let mut pool: TaskPool<(), String> = TaskPool::new(limit).unwrap();
    let mut rng = rand::thread_rng();
    for _ in 0..500 {
        let (active, peak, done) = (Arc::clone(&active), Arc::clone(&peak), Arc::clone(&done));
        let delay = Duration::from_millis(rng.gen_range(1..=6));
        pool.add_task(move || async move {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(delay).await;
            active.fetch_sub(1, Ordering::SeqCst);
            done.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    drop(rng);

    pool.run_all().await.unwrap();

    assert_eq!(done.load(Ordering::SeqCst), 500);
    assert!(peak.load(Ordering::SeqCst) <= limit as usize);
    assert!(peak.load(Ordering::SeqCst) >= 1);
}

#[tokio::test]
async fn more_workers_than_jobs_does_not_hang() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut pool: TaskPool<(), String> = TaskPool::new(300).unwrap();
    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        pool.add_task(move || async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    assert_eq!(pool.workers(), 100);

    tokio::time::timeout(Duration::from_secs(10), pool.run_all())
        .await
        .expect("run did not finish")
        .unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn pushed_results_are_neither_lost_nor_duplicated() {
    let results = Arc::new(Mutex::new(Vec::new()));
    let mut pool: TaskPool<(), String> = TaskPool::new(8).unwrap();
    for i in 0..300 {
        let results = Arc::clone(&results);
        pool.add_task(move || async move {
            results.lock().unwrap().push(i);
            Ok(())
        });
    }

    pool.run_all().await.unwrap();

    let mut results = results.lock().unwrap().clone();
    results.sort_unstable();
    assert_eq!(results, (0..300).collect::<Vec<_>>());
}

#[tokio::test]
async fn jobs_drain_a_shared_collection() {
    let items = Arc::new(Mutex::new(
        (0..300).map(|i| format!("testData{i}")).collect::<Vec<_>>(),
    ));
    let mut pool: TaskPool<(), String> = TaskPool::new(8).unwrap();
    for _ in 0..300 {
        let items = Arc::clone(&items);
        pool.add_task(move || async move {
            items.lock().unwrap().pop();
            Ok(())
        });
    }

    pool.run_all().await.unwrap();

    assert!(items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn empty_pool_resolves_immediately() {
    let mut pool: TaskPool<(), String> = TaskPool::new(8).unwrap();
    assert_eq!(pool.workers(), 0);
    assert_eq!(pool.run_all().await, Ok(()));
}

#[tokio::test]
async fn failure_is_returned_after_the_other_jobs_ran() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut pool = counting_pool(8, 100, &counter);
    pool.add_task(|| async { Err("fake error".to_owned()) });

    let result = pool.run_all().await;

    assert_eq!(result, Err("fake error".to_owned()));
    assert_eq!(counter.load(Ordering::SeqCst), 100);
    assert_eq!(pool.pending(), 0);
}

#[tokio::test]
async fn first_failure_wins_when_several_fail() {
    let mut pool: TaskPool<(), String> = TaskPool::new(1).unwrap();
    for i in 0..5 {
        pool.add_task(move || async move { Err(format!("failure {i}")) });
    }

    // A single worker takes jobs in FIFO order.
    assert_eq!(pool.run_all().await, Err("failure 0".to_owned()));
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut pool = counting_pool(4, 50, &counter);

    pool.run_all().await.unwrap();
    pool.run_all().await.unwrap();

    assert_eq!(counter.load(Ordering::SeqCst), 50);
}

#[tokio::test]
async fn zero_limit_is_rejected() {
    let result = TaskPool::<(), String>::new(0);
    assert!(matches!(result, Err(PoolError::InvalidLimit(0))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn collect_returns_every_output() {
    let mut pool: TaskPool<u32, String> = TaskPool::new(10).unwrap();
    for i in 0..1000 {
        pool.add_task(move || async move {
            tokio::task::yield_now().await;
            Ok(i * 2)
        });
    }

    let mut outputs = pool.collect().await.unwrap();
    outputs.sort_unstable();

    assert_eq!(outputs, (0..1000).map(|i| i * 2).collect::<Vec<_>>());
}

#[tokio::test]
async fn fail_fast_stops_taking_jobs() {
    let counter = Arc::new(AtomicUsize::new(0));
    let config = PoolConfig::new(1).error_mode(ErrorMode::FailFast);
    let mut pool: TaskPool<(), String> = TaskPool::with_config(config).unwrap();
    pool.add_task(|| async { Err("boom".to_owned()) });
    for _ in 0..100 {
        let counter = Arc::clone(&counter);
        pool.add_task(move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    assert_eq!(pool.run_all().await, Err("boom".to_owned()));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
    assert_eq!(pool.pending(), 0);
}

#[tokio::test]
async fn fail_fast_aborts_jobs_in_flight() {
    let finished = Arc::new(AtomicUsize::new(0));
    let config = PoolConfig::new(4).error_mode(ErrorMode::FailFast);
    let mut pool: TaskPool<(), String> = TaskPool::with_config(config).unwrap();
    for _ in 0..3 {
        let finished = Arc::clone(&finished);
        pool.add_task(move || async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            finished.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }
    pool.add_task(|| async {
        tokio::time::sleep(Duration::from_millis(10)).await;
        Err("boom".to_owned())
    });

    let result = tokio::time::timeout(Duration::from_secs(10), pool.run_all())
        .await
        .expect("in-flight jobs were not aborted");

    assert_eq!(result, Err("boom".to_owned()));
    assert_eq!(finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn panic_is_resumed_after_the_drain() {
    let counter = Arc::new(AtomicUsize::new(0));
    let mut pool = counting_pool(1, 20, &counter);
    pool.add_task(|| async {
        let blow_up = true;
        if blow_up {
            panic!("job blew up");
        }
        Ok(())
    });
    let after = Arc::clone(&counter);
    for _ in 0..20 {
        let after = Arc::clone(&after);
        pool.add_task(move || async move {
            after.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
    }

    let handle = tokio::spawn(async move { pool.run_all().await });
    let err = handle.await.unwrap_err();

    assert!(err.is_panic());
    assert_eq!(counter.load(Ordering::SeqCst), 40);
}

#[tokio::test]
async fn default_error_type_accepts_any_error() {
    let mut pool: TaskPool = TaskPool::new(2).unwrap();
    pool.add_task(|| async { Ok(()) });
    pool.add_task(|| async {
        let parsed: Result<(), BoxError> = "not a number"
            .parse::<u32>()
            .map(drop)
            .map_err(BoxError::from);
        parsed
    });

    let err = pool.run_all().await.unwrap_err();
    assert!(err.to_string().contains("invalid digit"));
}
