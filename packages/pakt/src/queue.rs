use std::future::Future;
use std::rc::Rc;

use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

/// Caps simultaneously outstanding async work at `concurrency`, per
/// spec.md §5 — backs `networkConcurrency` (registry fetches) and
/// `childConcurrency` (spawned exotic-resolver helper processes).
///
/// Per spec.md §5 ("single-threaded cooperative... no data structure needs
/// a lock") the resolver's mutable state is `Rc<RefCell<_>>`, not
/// `Arc<Mutex<_>>` — so this queue schedules onto a `tokio::task::LocalSet`
/// via `spawn_local` rather than the default multi-threaded executor.
/// Built as a semaphore + spawned tasks per the "semaphore + task list, no
/// preemption" design note in spec.md §9: `schedule` spawns rather than
/// blocking the calling task, so it can be called reentrantly from within
/// a task it itself is running (a Request fanning out child Requests)
/// without deadlocking. Callers must run inside `LocalSet::run_until`.
#[derive(Clone)]
pub struct TaskQueue {
    semaphore: Rc<Semaphore>,
}

impl TaskQueue {
    pub fn new(concurrency: usize) -> TaskQueue {
        TaskQueue { semaphore: Rc::new(Semaphore::new(concurrency.max(1))) }
    }

    pub fn schedule<F>(&self, task: F) -> JoinHandle<F::Output>
    where
        F: Future + 'static,
        F::Output: 'static,
    {
        let semaphore = self.semaphore.clone();

        tokio::task::spawn_local(async move {
            let _permit = semaphore.acquire_owned().await.expect("task queue semaphore closed");
            task.await
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::time::Duration;
    use tokio::task::LocalSet;

    #[tokio::test]
    async fn never_exceeds_the_configured_concurrency() {
        let local = LocalSet::new();

        local
            .run_until(async {
                let queue = TaskQueue::new(2);
                let in_flight = Rc::new(Cell::new(0usize));
                let max_observed = Rc::new(Cell::new(0usize));

                let mut handles = Vec::new();
                for _ in 0..8 {
                    let in_flight = in_flight.clone();
                    let max_observed = max_observed.clone();

                    handles.push(queue.schedule(async move {
                        in_flight.set(in_flight.get() + 1);
                        max_observed.set(max_observed.get().max(in_flight.get()));
                        tokio::time::sleep(Duration::from_millis(10)).await;
                        in_flight.set(in_flight.get() - 1);
                    }));
                }

                for handle in handles {
                    handle.await.unwrap();
                }

                assert!(max_observed.get() <= 2);
            })
            .await;
    }

    #[tokio::test]
    async fn schedule_can_be_called_reentrantly() {
        let local = LocalSet::new();

        local
            .run_until(async {
                let queue = TaskQueue::new(4);
                let inner_queue = queue.clone();

                let handle = queue.schedule(async move {
                    let child = inner_queue.schedule(async { 41 });
                    child.await.unwrap() + 1
                });

                assert_eq!(handle.await.unwrap(), 42);
            })
            .await;
    }
}
