//! Bounded worker pool and the per-problem dispatcher built on it.
//!
//! Every item gets its own spawned task, gated by a semaphore sized to
//! `max_workers`. Join handles are collected in submission order, so each
//! result lands in the slot of the item that produced it no matter which
//! task finished first. A task that errors or panics only fills its own slot.

use super::executor::TaskExecutor;
use super::problem::{Problem, TaskResult};
use super::session::ResearchCallback;
use crate::error::{ConfigError, TaskError};
use futures::future::join_all;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

/// Runs async jobs with at most `max_workers` in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerPool {
    max_workers: usize,
}

impl WorkerPool {
    pub fn new(max_workers: usize) -> Result<Self, ConfigError> {
        if max_workers == 0 {
            return Err(ConfigError::Invalid {
                message: "max_workers must be at least 1".to_string(),
            });
        }
        Ok(Self { max_workers })
    }

    pub fn max_workers(&self) -> usize {
        self.max_workers
    }

    /// Run `job` on every item and return one result per item, in input order.
    ///
    /// Returns only after every job has finished. Jobs are never retried or
    /// cancelled because of a sibling's failure.
    pub async fn run<I, T, F, Fut>(&self, items: Vec<I>, job: F) -> Vec<Result<T, TaskError>>
    where
        I: Send + 'static,
        T: Send + 'static,
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, TaskError>> + Send + 'static,
    {
        let semaphore = Arc::new(Semaphore::new(self.max_workers));
        let job = Arc::new(job);
        let mut handles = Vec::with_capacity(items.len());

        for item in items {
            let sem = semaphore.clone();
            let job = job.clone();
            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.map_err(|_| TaskError::Aborted)?;
                (*job)(item).await
            }));
        }

        join_all(handles)
            .await
            .into_iter()
            .map(|joined| match joined {
                Ok(result) => result,
                Err(e) if e.is_panic() => Err(TaskError::Panicked {
                    message: panic_message(e.into_panic()),
                }),
                Err(_) => Err(TaskError::Aborted),
            })
            .collect()
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

/// Fans problems out to a [`TaskExecutor`] on a [`WorkerPool`].
pub struct Dispatcher {
    pool: WorkerPool,
    executor: Arc<dyn TaskExecutor>,
    callback: Arc<dyn ResearchCallback>,
}

impl Dispatcher {
    pub fn new(
        pool: WorkerPool,
        executor: Arc<dyn TaskExecutor>,
        callback: Arc<dyn ResearchCallback>,
    ) -> Self {
        Self {
            pool,
            executor,
            callback,
        }
    }

    /// Research every problem. Always returns exactly one result per problem,
    /// ordered as the input; failures are captured as `Failed` results.
    pub async fn dispatch(&self, problems: Vec<Problem>) -> Vec<TaskResult> {
        info!(
            problems = problems.len(),
            max_workers = self.pool.max_workers(),
            "Dispatching research tasks"
        );
        let submitted = problems.clone();
        let executor = self.executor.clone();
        let outcomes = self
            .pool
            .run(problems, move |problem: Problem| {
                let executor = executor.clone();
                async move { executor.execute(&problem).await }
            })
            .await;

        let mut results = Vec::with_capacity(submitted.len());
        for (problem, outcome) in submitted.iter().zip(outcomes) {
            let result = match outcome {
                Ok(result) => {
                    debug!(problem_index = problem.index, "Task completed");
                    result
                }
                Err(e) => {
                    warn!(problem_index = problem.index, error = %e, "Task failed");
                    TaskResult::failed(problem, &e)
                }
            };
            self.callback.on_task_complete(&result);
            results.push(result);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::research::session::NoOpResearchCallback;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    /// Finishes later problems first.
    struct ReverseDelayExecutor {
        total: usize,
    }

    #[async_trait]
    impl TaskExecutor for ReverseDelayExecutor {
        async fn execute(&self, problem: &Problem) -> Result<TaskResult, TaskError> {
            let delay = (self.total - problem.index) as u64 * 10;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(TaskResult::success(
                problem,
                Vec::new(),
                format!("summary of {}", problem.text),
            ))
        }
    }

    /// Fails on one index, panics on another.
    struct FlakyExecutor {
        fail_on: usize,
        panic_on: Option<usize>,
    }

    #[async_trait]
    impl TaskExecutor for FlakyExecutor {
        async fn execute(&self, problem: &Problem) -> Result<TaskResult, TaskError> {
            if Some(problem.index) == self.panic_on {
                panic!("executor blew up on {}", problem.index);
            }
            if problem.index == self.fail_on {
                return Err(TaskError::Oracle(crate::error::LlmError::Connection {
                    message: "reset by peer".into(),
                }));
            }
            Ok(TaskResult::success(problem, Vec::new(), "fine"))
        }
    }

    fn dispatcher(max_workers: usize, executor: Arc<dyn TaskExecutor>) -> Dispatcher {
        Dispatcher::new(
            WorkerPool::new(max_workers).unwrap(),
            executor,
            Arc::new(NoOpResearchCallback),
        )
    }

    #[test]
    fn test_pool_rejects_zero_workers() {
        assert!(matches!(
            WorkerPool::new(0),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_pool_bounds_concurrency() {
        let pool = WorkerPool::new(2).unwrap();
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (flight, top) = (in_flight.clone(), peak.clone());

        let results = pool
            .run((0..6).collect(), move |i: usize| {
                let flight = flight.clone();
                let top = top.clone();
                async move {
                    let now = flight.fetch_add(1, Ordering::SeqCst) + 1;
                    top.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(20)).await;
                    flight.fetch_sub(1, Ordering::SeqCst);
                    Ok(i * 10)
                }
            })
            .await;

        let values: Vec<_> = results.into_iter().map(|r| r.unwrap()).collect();
        assert_eq!(values, vec![0, 10, 20, 30, 40, 50]);
        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_pool_empty_input() {
        let pool = WorkerPool::new(3).unwrap();
        let results = pool.run(Vec::<u8>::new(), |i| async move { Ok(i) }).await;
        assert!(results.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_preserves_input_order() {
        let problems = Problem::from_texts(["a", "b", "c", "d"]);
        let results = dispatcher(4, Arc::new(ReverseDelayExecutor { total: 4 }))
            .dispatch(problems)
            .await;
        let indices: Vec<_> = results.iter().map(|r| r.problem_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert_eq!(results[3].narrative_summary, "summary of d");
    }

    #[tokio::test]
    async fn test_dispatch_contains_failure_and_panic() {
        let problems = Problem::from_texts(["a", "b", "c", "d"]);
        let executor = Arc::new(FlakyExecutor {
            fail_on: 1,
            panic_on: Some(3),
        });
        let results = dispatcher(2, executor).dispatch(problems).await;

        assert_eq!(results.len(), 4);
        assert!(results[0].is_success());
        assert!(!results[1].is_success());
        assert_eq!(
            results[1].error.as_deref(),
            Some("Provider connection failed: reset by peer")
        );
        assert!(results[2].is_success());
        assert!(!results[3].is_success());
        assert!(
            results[3]
                .error
                .as_deref()
                .unwrap()
                .contains("executor blew up on 3")
        );
        assert_eq!(results[3].problem_text, "d");
    }
}
