//! Cancellable delayed tasks
//!
//! Every debounce and delay in the viewer runs off one deadline queue
//! owned by the session: tasks are scheduled with an explicit `now`,
//! swept on `tick`, and dropped wholesale on destroy so nothing fires
//! against torn-down state.

use std::time::{Duration, Instant};

/// What to do when a deadline elapses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskKind {
    /// Scroll idle period elapsed.
    ScrollEnd,
    /// Print blob still not ready; show the preparing dialog.
    PrintDialog,
    /// Print context has settled; invoke print.
    PrintSettle,
    /// Overall load budget exhausted.
    LoadDeadline,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

#[derive(Clone, Debug)]
struct Delayed {
    id: TaskId,
    kind: TaskKind,
    due_at: Instant,
}

/// Deadline queue. Not a thread: the owner passes `now` into `due` from
/// its event loop, which keeps expiry deterministic and testable.
#[derive(Debug, Default)]
pub struct TaskQueue {
    tasks: Vec<Delayed>,
    next_id: u64,
}

impl TaskQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, kind: TaskKind, delay: Duration, now: Instant) -> TaskId {
        self.next_id += 1;
        let id = TaskId(self.next_id);
        self.tasks.push(Delayed {
            id,
            kind,
            due_at: now + delay,
        });
        id
    }

    /// Cancel and re-arm a kind in one step (debounce).
    pub fn reschedule(&mut self, kind: TaskKind, delay: Duration, now: Instant) -> TaskId {
        self.cancel_kind(kind);
        self.schedule(kind, delay, now)
    }

    /// Returns true if the task was still pending.
    pub fn cancel(&mut self, id: TaskId) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.id != id);
        self.tasks.len() != before
    }

    /// Returns true if any task of this kind was still pending.
    pub fn cancel_kind(&mut self, kind: TaskKind) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.kind != kind);
        self.tasks.len() != before
    }

    #[must_use]
    pub fn is_pending(&self, kind: TaskKind) -> bool {
        self.tasks.iter().any(|task| task.kind == kind)
    }

    /// Remove and return all tasks due at `now`, in deadline order.
    pub fn due(&mut self, now: Instant) -> Vec<TaskKind> {
        let mut fired: Vec<Delayed> = Vec::new();
        self.tasks.retain(|task| {
            if task.due_at <= now {
                fired.push(task.clone());
                false
            } else {
                true
            }
        });
        fired.sort_by_key(|task| task.due_at);
        fired.into_iter().map(|task| task.kind).collect()
    }

    pub fn clear(&mut self) {
        self.tasks.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_after_the_deadline() {
        let mut queue = TaskQueue::new();
        let t0 = Instant::now();

        queue.schedule(TaskKind::ScrollEnd, Duration::from_millis(500), t0);

        assert!(queue.due(t0 + Duration::from_millis(499)).is_empty());
        assert_eq!(
            queue.due(t0 + Duration::from_millis(500)),
            vec![TaskKind::ScrollEnd]
        );
        assert!(queue.is_empty());
    }

    #[test]
    fn cancel_removes_a_pending_task() {
        let mut queue = TaskQueue::new();
        let t0 = Instant::now();

        let id = queue.schedule(TaskKind::PrintDialog, Duration::from_millis(500), t0);
        assert!(queue.cancel(id));
        assert!(!queue.cancel(id));
        assert!(queue.due(t0 + Duration::from_secs(1)).is_empty());
    }

    #[test]
    fn reschedule_debounces_a_kind() {
        let mut queue = TaskQueue::new();
        let t0 = Instant::now();

        queue.reschedule(TaskKind::ScrollEnd, Duration::from_millis(500), t0);
        queue.reschedule(
            TaskKind::ScrollEnd,
            Duration::from_millis(500),
            t0 + Duration::from_millis(400),
        );

        // The first deadline has moved; nothing fires at t0+500
        assert!(queue.due(t0 + Duration::from_millis(500)).is_empty());
        assert_eq!(
            queue.due(t0 + Duration::from_millis(900)),
            vec![TaskKind::ScrollEnd]
        );
    }

    #[test]
    fn due_preserves_deadline_order() {
        let mut queue = TaskQueue::new();
        let t0 = Instant::now();

        queue.schedule(TaskKind::PrintSettle, Duration::from_millis(200), t0);
        queue.schedule(TaskKind::ScrollEnd, Duration::from_millis(100), t0);

        assert_eq!(
            queue.due(t0 + Duration::from_secs(1)),
            vec![TaskKind::ScrollEnd, TaskKind::PrintSettle]
        );
    }

    #[test]
    fn clear_drops_everything() {
        let mut queue = TaskQueue::new();
        let t0 = Instant::now();

        queue.schedule(TaskKind::LoadDeadline, Duration::from_secs(180), t0);
        queue.schedule(TaskKind::ScrollEnd, Duration::from_millis(500), t0);
        queue.clear();

        assert!(queue.is_empty());
        assert!(queue.due(t0 + Duration::from_secs(300)).is_empty());
    }
}
