//! Cancelable asynchronous tasks with begin/end lifecycle notification.
//!
//! [`TaskManager`] is an explicitly constructed, explicitly owned registry
//! of in-flight tasks. There is no process-wide singleton; clone the
//! handle into whichever component needs to submit or cancel work.
//!
//! Every task is addressed two ways:
//! - by **owner**: the logical requester, so a surface can cancel
//!   everything it started when it is torn down
//! - by **category**: the kind of work, so unrelated subsystems don't
//!   interfere with each other's cancellation
//!
//! Cancellation is cooperative. `cancel_owner`/`cancel_category` trigger
//! the task's [`CancellationToken`]; work must observe the token at its
//! suspension points to exit promptly. A task blocked in a single bounded
//! read is interrupted at the next checked point, not instantaneously;
//! the stream's read timeout is the hard deadline that makes the check
//! eventually reachable.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

/// Handle to a submitted task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

/// Opaque identity of a task's logical requester.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OwnerId(u64);

impl OwnerId {
    /// Mint a fresh owner identity.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Kind of work a task performs, used to scope bulk cancellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskCategory(pub u16);

impl TaskCategory {
    /// Connection establishment.
    pub const CONNECT: TaskCategory = TaskCategory(1);
    /// The long-running read-and-dispatch loop.
    pub const READ_LOOP: TaskCategory = TaskCategory(2);
}

/// Lifecycle state of a task, as seen by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskState {
    /// Registered, worker not yet started.
    Pending,
    /// Worker running.
    Running,
    /// Cancellation requested before a normal outcome was produced.
    Cancelled,
    /// Worker produced an outcome (success or error).
    Completed,
}

/// Wrapped outcome delivered to `on_end`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome<T, E> {
    /// The work completed and returned a value.
    Ok(T),
    /// The work completed with an error. Errors are delivered here, never
    /// thrown across the worker boundary uncaught.
    Err(E),
    /// The work was cancelled before producing an outcome.
    Cancelled,
}

impl<T, E> TaskOutcome<T, E> {
    /// Whether this outcome is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskOutcome::Cancelled)
    }

    /// Whether this outcome is a success.
    pub fn is_ok(&self) -> bool {
        matches!(self, TaskOutcome::Ok(_))
    }
}

struct TaskEntry {
    owner: OwnerId,
    category: TaskCategory,
    state: TaskState,
    token: CancellationToken,
}

struct Inner {
    tasks: Mutex<HashMap<TaskId, TaskEntry>>,
    next_id: AtomicU64,
}

/// Registry of in-flight tasks. Cheaply cloneable; all clones share one
/// registry. The registry mutex is the only state touched from multiple
/// execution contexts, and it is held only for map operations, never
/// across an await.
#[derive(Clone)]
pub struct TaskManager {
    inner: Arc<Inner>,
}

impl TaskManager {
    /// Create an empty task manager.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                tasks: Mutex::new(HashMap::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Submit a unit of work.
    ///
    /// Registers the task as `Pending`, invokes `on_begin` synchronously on
    /// the calling context, then schedules `work` on the runtime. `work`
    /// receives the task's cancellation token and should observe it at its
    /// suspension points. When the work finishes, or the token fires
    /// first, the outcome is wrapped as a [`TaskOutcome`] and handed to
    /// `on_end`. `on_begin` always strictly precedes `on_end`; the two
    /// never run concurrently for the same task.
    ///
    /// If the token is already triggered when the worker first polls, the
    /// work future is dropped unpolled, so cancelled work performs no side
    /// effects past submission.
    pub fn submit<T, E, B, F, Fut, D>(
        &self,
        owner: OwnerId,
        category: TaskCategory,
        on_begin: B,
        work: F,
        on_end: D,
    ) -> TaskId
    where
        T: Send + 'static,
        E: Send + 'static,
        B: FnOnce(),
        F: FnOnce(CancellationToken) -> Fut + Send + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        D: FnOnce(TaskOutcome<T, E>) + Send + 'static,
    {
        let id = TaskId(self.inner.next_id.fetch_add(1, Ordering::Relaxed));
        let token = CancellationToken::new();

        self.inner.tasks.lock().insert(
            id,
            TaskEntry {
                owner,
                category,
                state: TaskState::Pending,
                token: token.clone(),
            },
        );

        on_begin();

        let manager = self.clone();
        tokio::spawn(async move {
            manager.mark_running(id);

            let fut = work(token.clone());
            let outcome = tokio::select! {
                biased;
                _ = token.cancelled() => TaskOutcome::Cancelled,
                result = fut => match result {
                    Ok(value) => TaskOutcome::Ok(value),
                    Err(error) => TaskOutcome::Err(error),
                },
            };

            manager.mark_finished(id, outcome.is_cancelled());
            on_end(outcome);
            manager.inner.tasks.lock().remove(&id);
        });

        id
    }

    /// Cancel every non-terminal task belonging to `owner`.
    ///
    /// Returns the number of tasks cancelled. Advisory: each task exits at
    /// its next cancellation-checked point.
    pub fn cancel_owner(&self, owner: OwnerId) -> usize {
        self.cancel_matching(|entry| entry.owner == owner)
    }

    /// Cancel every non-terminal task of `category`, across all owners.
    pub fn cancel_category(&self, category: TaskCategory) -> usize {
        self.cancel_matching(|entry| entry.category == category)
    }

    /// Cancel one task by id. Returns false if it is unknown or terminal.
    pub fn cancel(&self, id: TaskId) -> bool {
        let mut tasks = self.inner.tasks.lock();
        match tasks.get_mut(&id) {
            Some(entry) if !is_terminal(entry.state) => {
                entry.token.cancel();
                entry.state = TaskState::Cancelled;
                true
            }
            _ => false,
        }
    }

    /// Current state of a task, if it is still registered.
    pub fn state(&self, id: TaskId) -> Option<TaskState> {
        self.inner.tasks.lock().get(&id).map(|entry| entry.state)
    }

    /// Number of registered non-terminal tasks.
    pub fn active_count(&self) -> usize {
        self.inner
            .tasks
            .lock()
            .values()
            .filter(|entry| !is_terminal(entry.state))
            .count()
    }

    fn cancel_matching(&self, matches: impl Fn(&TaskEntry) -> bool) -> usize {
        let mut cancelled = 0;
        let mut tasks = self.inner.tasks.lock();
        for entry in tasks.values_mut() {
            if matches(entry) && !is_terminal(entry.state) {
                entry.token.cancel();
                entry.state = TaskState::Cancelled;
                cancelled += 1;
            }
        }
        if cancelled > 0 {
            tracing::debug!(cancelled, "cancelled tasks");
        }
        cancelled
    }

    fn mark_running(&self, id: TaskId) {
        let mut tasks = self.inner.tasks.lock();
        if let Some(entry) = tasks.get_mut(&id) {
            if entry.state == TaskState::Pending {
                entry.state = TaskState::Running;
            }
        }
    }

    fn mark_finished(&self, id: TaskId, cancelled: bool) {
        let mut tasks = self.inner.tasks.lock();
        if let Some(entry) = tasks.get_mut(&id) {
            entry.state = if cancelled {
                TaskState::Cancelled
            } else {
                TaskState::Completed
            };
        }
    }
}

impl Default for TaskManager {
    fn default() -> Self {
        Self::new()
    }
}

fn is_terminal(state: TaskState) -> bool {
    matches!(state, TaskState::Cancelled | TaskState::Completed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tokio::sync::oneshot;

    #[tokio::test]
    async fn test_begin_precedes_end_with_ok_outcome() {
        let manager = TaskManager::new();
        let began = Arc::new(AtomicBool::new(false));
        let began_at_end = began.clone();
        let began_in_begin = began.clone();
        let (end_tx, end_rx) = oneshot::channel();

        manager.submit(
            OwnerId::next(),
            TaskCategory::CONNECT,
            move || began_in_begin.store(true, Ordering::SeqCst),
            |_token| async { Ok::<_, &str>(42u32) },
            move |outcome| {
                assert!(began_at_end.load(Ordering::SeqCst), "on_begin must run first");
                end_tx.send(outcome).unwrap();
            },
        );

        assert!(began.load(Ordering::SeqCst), "on_begin is synchronous");
        assert_eq!(end_rx.await.unwrap(), TaskOutcome::Ok(42));
    }

    #[tokio::test]
    async fn test_error_outcome_is_wrapped() {
        let manager = TaskManager::new();
        let (end_tx, end_rx) = oneshot::channel();

        manager.submit(
            OwnerId::next(),
            TaskCategory::CONNECT,
            || {},
            |_token| async { Err::<u32, _>("no route to device") },
            move |outcome| end_tx.send(outcome).unwrap(),
        );

        assert_eq!(end_rx.await.unwrap(), TaskOutcome::Err("no route to device"));
    }

    #[tokio::test]
    async fn test_cancel_owner_delivers_cancelled_before_side_effects() {
        let manager = TaskManager::new();
        let owner = OwnerId::next();
        let side_effect = Arc::new(AtomicBool::new(false));
        let side_effect_in_work = side_effect.clone();
        let (end_tx, end_rx) = oneshot::channel();

        manager.submit(
            owner,
            TaskCategory::READ_LOOP,
            || {},
            move |token| async move {
                // Observe cancellation before touching the connection.
                tokio::select! {
                    _ = token.cancelled() => return Err("cancelled"),
                    _ = tokio::time::sleep(Duration::from_millis(50)) => {}
                }
                side_effect_in_work.store(true, Ordering::SeqCst);
                Ok(())
            },
            move |outcome| end_tx.send(outcome).unwrap(),
        );

        assert_eq!(manager.cancel_owner(owner), 1);

        let outcome = end_rx.await.unwrap();
        assert!(outcome.is_cancelled() || outcome == TaskOutcome::Err("cancelled"));
        assert!(
            !side_effect.load(Ordering::SeqCst),
            "cancelled work must not reach its side effect"
        );
    }

    #[tokio::test]
    async fn test_cancel_category_is_selective() {
        let manager = TaskManager::new();
        let owner = OwnerId::next();
        let (connect_tx, connect_rx) = oneshot::channel();
        let (read_tx, read_rx) = oneshot::channel();

        // A connect task that waits on its token.
        manager.submit(
            owner,
            TaskCategory::CONNECT,
            || {},
            |token| async move {
                token.cancelled().await;
                Err::<(), _>("unreachable result")
            },
            move |outcome: TaskOutcome<(), &str>| connect_tx.send(outcome).unwrap(),
        );

        // A read-loop task for the same owner that finishes on its own.
        manager.submit(
            owner,
            TaskCategory::READ_LOOP,
            || {},
            |_token| async {
                tokio::time::sleep(Duration::from_millis(10)).await;
                Ok::<_, &str>("done")
            },
            move |outcome| read_tx.send(outcome).unwrap(),
        );

        assert_eq!(manager.cancel_category(TaskCategory::CONNECT), 1);

        assert!(connect_rx.await.unwrap().is_cancelled());
        assert_eq!(read_rx.await.unwrap(), TaskOutcome::Ok("done"));
    }

    #[tokio::test]
    async fn test_entry_removed_after_end() {
        let manager = TaskManager::new();
        let (end_tx, end_rx) = oneshot::channel();

        let id = manager.submit(
            OwnerId::next(),
            TaskCategory::CONNECT,
            || {},
            |_token| async { Ok::<_, std::io::Error>(()) },
            move |_outcome| end_tx.send(()).unwrap(),
        );

        end_rx.await.unwrap();
        // Give the worker a beat to clear the registry after on_end.
        tokio::task::yield_now().await;
        assert_eq!(manager.state(id), None);
        assert_eq!(manager.active_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_unknown_or_finished_task() {
        let manager = TaskManager::new();
        let (end_tx, end_rx) = oneshot::channel();

        let id = manager.submit(
            OwnerId::next(),
            TaskCategory::CONNECT,
            || {},
            |_token| async { Ok::<_, std::io::Error>(()) },
            move |_outcome| end_tx.send(()).unwrap(),
        );
        end_rx.await.unwrap();
        tokio::task::yield_now().await;

        assert!(!manager.cancel(id));
    }
}
