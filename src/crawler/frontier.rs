//! Crawl frontier shared by all workers
//!
//! The frontier owns the pending task queue, the visited set and the count of tasks
//! currently being processed. A crawl run is finished once nothing is pending and no
//! worker is in flight; from then on every `dequeue` returns `None`.

use crate::crawler::lock;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use tokio::sync::Notify;
use url::Url;

/// One unit of crawl work
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlTask {
    /// Normalized URL to fetch
    pub url: Url,

    /// Link distance from the seed (seed = 0)
    pub depth: u32,
}

impl CrawlTask {
    pub fn new(url: Url, depth: u32) -> Self {
        Self { url, depth }
    }
}

#[derive(Debug, Default)]
struct FrontierState {
    pending: VecDeque<CrawlTask>,
    visited: HashSet<String>,
    in_flight: usize,
    stopped: bool,
}

impl FrontierState {
    fn is_drained(&self) -> bool {
        self.pending.is_empty() && self.in_flight == 0
    }
}

/// Work queue plus visited set for one run
///
/// Each normalized URL is handed out at most once per run, no matter how many workers
/// discover it concurrently.
#[derive(Debug, Default)]
pub struct Frontier {
    state: Mutex<FrontierState>,
    notify: Notify,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues a task unless its URL was already seen
    ///
    /// # Returns
    ///
    /// * `true` - The task was queued
    /// * `false` - The URL was already visited, or the frontier is stopped or drained
    pub fn enqueue(&self, task: CrawlTask) -> bool {
        {
            let mut state = lock(&self.state);
            if state.stopped || !state.visited.insert(task.url.as_str().to_string()) {
                return false;
            }
            state.pending.push_back(task);
        }
        self.notify.notify_one();
        true
    }

    /// Waits for the next task
    ///
    /// Returns `None` once the frontier is stopped, or once it is drained: no task is
    /// pending and no worker holds one that could still produce more. A drained
    /// frontier is closed, so later `enqueue` calls are rejected. Every task returned
    /// must be acknowledged with [`Frontier::task_done`].
    pub async fn dequeue(&self) -> Option<CrawlTask> {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before inspecting the state so a wakeup in between is not lost
            notified.as_mut().enable();

            {
                let mut state = lock(&self.state);
                if state.stopped {
                    return None;
                }
                if let Some(task) = state.pending.pop_front() {
                    state.in_flight += 1;
                    return Some(task);
                }
                if state.in_flight == 0 {
                    // Nobody is left to produce or take work
                    state.stopped = true;
                    drop(state);
                    self.notify.notify_waiters();
                    return None;
                }
            }

            notified.await;
        }
    }

    /// Marks a dequeued task as fully processed
    pub fn task_done(&self) {
        let drained = {
            let mut state = lock(&self.state);
            state.in_flight = state.in_flight.saturating_sub(1);
            state.is_drained()
        };
        if drained {
            self.notify.notify_waiters();
        }
    }

    /// Stops the frontier: pending tasks are dropped and every waiter is released
    pub fn stop(&self) {
        {
            let mut state = lock(&self.state);
            state.stopped = true;
            state.pending.clear();
        }
        self.notify.notify_waiters();
    }

    pub fn is_stopped(&self) -> bool {
        lock(&self.state).stopped
    }

    /// No task is pending and none is in flight
    pub fn is_drained(&self) -> bool {
        lock(&self.state).is_drained()
    }

    pub fn pending_len(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Number of distinct URLs ever accepted
    pub fn visited_len(&self) -> usize {
        lock(&self.state).visited.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    fn task(path: &str, depth: u32) -> CrawlTask {
        let url = Url::parse(&format!("https://example.com{}", path)).unwrap();
        CrawlTask::new(url, depth)
    }

    #[test]
    fn test_enqueue_deduplicates() {
        let frontier = Frontier::new();
        assert!(frontier.enqueue(task("/a", 0)));
        assert!(!frontier.enqueue(task("/a", 3)));
        assert!(frontier.enqueue(task("/b", 1)));
        assert_eq!(frontier.pending_len(), 2);
        assert_eq!(frontier.visited_len(), 2);
    }

    #[tokio::test]
    async fn test_fifo_order() {
        let frontier = Frontier::new();
        frontier.enqueue(task("/a", 0));
        frontier.enqueue(task("/b", 1));

        assert_eq!(frontier.dequeue().await.unwrap().url.path(), "/a");
        assert_eq!(frontier.dequeue().await.unwrap().url.path(), "/b");
    }

    #[tokio::test]
    async fn test_empty_frontier_is_drained() {
        let frontier = Frontier::new();
        assert!(frontier.is_drained());
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_dequeue_waits_for_in_flight_work() {
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue(task("/seed", 0));
        let seed = frontier.dequeue().await.unwrap();
        assert!(!frontier.is_drained());

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move { frontier.dequeue().await })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        // The in-flight task discovers a child before completing
        frontier.enqueue(task("/child", seed.depth + 1));
        frontier.task_done();

        let next = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(next.unwrap().url.path(), "/child");
    }

    #[tokio::test]
    async fn test_waiters_released_when_drained() {
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue(task("/only", 0));
        frontier.dequeue().await.unwrap();

        let waiters: Vec<_> = (0..3)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move { frontier.dequeue().await })
            })
            .collect();

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.task_done();

        for waiter in waiters {
            let result = tokio::time::timeout(Duration::from_secs(1), waiter)
                .await
                .unwrap()
                .unwrap();
            assert!(result.is_none());
        }
        assert!(frontier.is_drained());
    }

    #[tokio::test]
    async fn test_drained_frontier_rejects_late_work() {
        let frontier = Frontier::new();
        frontier.enqueue(task("/only", 0));
        frontier.dequeue().await.unwrap();
        frontier.task_done();

        assert!(frontier.dequeue().await.is_none());
        assert!(!frontier.enqueue(task("/late", 0)));
        assert_eq!(frontier.pending_len(), 0);
        assert!(frontier.dequeue().await.is_none());
    }

    #[tokio::test]
    async fn test_stop_releases_waiters_and_rejects_work() {
        let frontier = Arc::new(Frontier::new());
        frontier.enqueue(task("/a", 0));
        frontier.enqueue(task("/b", 0));
        frontier.dequeue().await.unwrap();

        let waiter = {
            let frontier = Arc::clone(&frontier);
            tokio::spawn(async move {
                // Consumes /b, then blocks on the in-flight /a
                let first = frontier.dequeue().await;
                let second = frontier.dequeue().await;
                (first, second)
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        frontier.stop();

        let (first, second) = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.unwrap().url.path(), "/b");
        assert!(second.is_none());
        assert!(frontier.is_stopped());
        assert!(!frontier.enqueue(task("/c", 0)));
        assert_eq!(frontier.pending_len(), 0);
    }

    #[tokio::test]
    async fn test_concurrent_enqueue_of_same_url() {
        let frontier = Arc::new(Frontier::new());
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let frontier = Arc::clone(&frontier);
                tokio::spawn(async move { frontier.enqueue(task("/shared", 1)) })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            if handle.await.unwrap() {
                accepted += 1;
            }
        }
        assert_eq!(accepted, 1);
        assert_eq!(frontier.pending_len(), 1);
    }
}
