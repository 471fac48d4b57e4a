//! Bounded-parallelism execution primitives.
//!
//! Two disciplines are provided:
//! - [`gather_bounded`] — launch one task per input, each gated by a shared
//!   semaphore, and join them into one result slot per task (input order).
//! - [`process_with_workers`] — a fixed number of long-lived workers pull
//!   items from a closed channel until exhausted.
//!
//! Both isolate failure: a panic inside one unit is recovered and stored as
//! that unit's [`TempographError::TaskPanic`]; it never aborts sibling units
//! or the caller.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;
use tokio::sync::{mpsc, Mutex, Semaphore};
use tracing::warn;

use crate::errors::{Result, TempographError};

/// Render a panic payload as a message, best-effort.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

/// Run `tasks` concurrently, at most `limit` at a time, returning one result
/// slot per task in input order.
///
/// Each task is spawned immediately but blocks on a semaphore permit before
/// running, so at most `limit` tasks make progress at once. A panicked task
/// yields [`TempographError::TaskPanic`] in its own slot; a task whose permit
/// acquisition fails (semaphore closed) yields [`TempographError::Cancelled`].
/// Already-running tasks are never forcibly interrupted.
///
/// `limit == 0` is an input error.
pub async fn gather_bounded<T, F>(tasks: Vec<F>, limit: usize) -> Result<Vec<Result<T>>>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    if limit == 0 {
        return Err(TempographError::Validation(
            "concurrency limit must be > 0".to_string(),
        ));
    }

    gather_with_semaphore(tasks, Arc::new(Semaphore::new(limit))).await
}

/// Gather `tasks` gated by an externally-owned semaphore. Closing the
/// semaphore surfaces [`TempographError::Cancelled`] in the slot of every
/// task still waiting on a permit.
async fn gather_with_semaphore<T, F>(
    tasks: Vec<F>,
    semaphore: Arc<Semaphore>,
) -> Result<Vec<Result<T>>>
where
    F: Future<Output = Result<T>> + Send + 'static,
    T: Send + 'static,
{
    let mut handles = Vec::with_capacity(tasks.len());

    for task in tasks {
        let semaphore = Arc::clone(&semaphore);
        handles.push(tokio::spawn(async move {
            let _permit = semaphore
                .acquire_owned()
                .await
                .map_err(|_| TempographError::Cancelled)?;
            task.await
        }));
    }

    let mut results = Vec::with_capacity(handles.len());
    for handle in handles {
        let slot = match handle.await {
            Ok(result) => result,
            Err(join_err) if join_err.is_panic() => {
                let message = panic_message(join_err.into_panic());
                warn!(panic = %message, "recovered panic in gathered task");
                Err(TempographError::TaskPanic(message))
            }
            Err(_) => Err(TempographError::Cancelled),
        };
        results.push(slot);
    }

    Ok(results)
}

/// Process `items` with a fixed pool of `workers` long-lived tasks, each
/// pulling from a closed channel until exhausted.
///
/// Results are returned in input order, one slot per item. A panic while
/// processing one item is recovered into that item's slot and the worker
/// continues with the next item.
pub async fn process_with_workers<I, T, F, Fut>(
    items: Vec<I>,
    workers: usize,
    f: F,
) -> Result<Vec<Result<T>>>
where
    I: Send + 'static,
    T: Send + 'static,
    F: Fn(I) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    if workers == 0 {
        return Err(TempographError::Validation(
            "worker count must be > 0".to_string(),
        ));
    }

    let total = items.len();
    let (work_tx, work_rx) = mpsc::channel::<(usize, I)>(total.max(1));
    let (result_tx, mut result_rx) = mpsc::channel::<(usize, Result<T>)>(total.max(1));
    let work_rx = Arc::new(Mutex::new(work_rx));
    let f = Arc::new(f);

    let mut worker_handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let work_rx = Arc::clone(&work_rx);
        let result_tx = result_tx.clone();
        let f = Arc::clone(&f);
        worker_handles.push(tokio::spawn(async move {
            loop {
                let next = { work_rx.lock().await.recv().await };
                let Some((idx, item)) = next else { break };

                let outcome = std::panic::AssertUnwindSafe(f(item))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload);
                        warn!(panic = %message, "recovered panic in worker task");
                        Err(TempographError::TaskPanic(message))
                    });

                // Receiver only drops if the caller gave up; nothing to do then.
                let _ = result_tx.send((idx, outcome)).await;
            }
        }));
    }
    drop(result_tx);

    for pair in items.into_iter().enumerate() {
        work_tx
            .send(pair)
            .await
            .map_err(|_| TempographError::Cancelled)?;
    }
    drop(work_tx);

    let mut slots: Vec<Option<Result<T>>> = std::iter::repeat_with(|| None).take(total).collect();
    while let Some((idx, outcome)) = result_rx.recv().await {
        slots[idx] = Some(outcome);
    }

    for handle in worker_handles {
        // Worker bodies recover their own panics; join errors here mean the
        // runtime is shutting down.
        let _ = handle.await;
    }

    let mut results = Vec::with_capacity(total);
    for slot in slots {
        results.push(slot.unwrap_or(Err(TempographError::Cancelled)));
    }
    Ok(results)
}
