use super::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum TaskKind {
    HideMessage { generation: u64 },
    SettleSubmission { attempt: u64, outcome: SubmissionOutcome },
}

impl TaskKind {
    fn timer_kind(&self) -> TimerKind {
        match self {
            Self::HideMessage { .. } => TimerKind::HideMessage,
            Self::SettleSubmission { .. } => TimerKind::SubmissionResponse,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    HideMessage,
    SubmissionResponse,
}

#[derive(Debug, Clone)]
pub(crate) struct ScheduledTask {
    pub(crate) id: i64,
    pub(crate) due_at: i64,
    order: i64,
    pub(crate) kind: TaskKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingTimer {
    pub id: i64,
    pub due_at: i64,
    pub order: i64,
    pub kind: TimerKind,
}

/// Virtual clock plus the queue of timers waiting on it.
#[derive(Debug, Clone)]
pub(crate) struct Scheduler {
    pub(crate) now_ms: i64,
    pub(crate) step_limit: usize,
    queue: Vec<ScheduledTask>,
    next_timer_id: i64,
    next_task_order: i64,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self {
            now_ms: 0,
            step_limit: 10_000,
            queue: Vec::new(),
            next_timer_id: 1,
            next_task_order: 0,
        }
    }
}

impl Scheduler {
    pub(crate) fn schedule(&mut self, delay_ms: i64, kind: TaskKind) -> (i64, i64) {
        let id = self.next_timer_id;
        self.next_timer_id += 1;
        let order = self.next_task_order;
        self.next_task_order += 1;
        let due_at = self.now_ms.saturating_add(delay_ms.max(0));
        self.queue.push(ScheduledTask {
            id,
            due_at,
            order,
            kind,
        });
        (id, due_at)
    }

    pub(crate) fn clear(&mut self, timer_id: i64) -> bool {
        let before = self.queue.len();
        self.queue.retain(|task| task.id != timer_id);
        self.queue.len() != before
    }

    /// Drops pending hide timers; a newer message owns the region now.
    pub(crate) fn clear_message_hides(&mut self) -> usize {
        let before = self.queue.len();
        self.queue
            .retain(|task| !matches!(task.kind, TaskKind::HideMessage { .. }));
        before - self.queue.len()
    }

    pub(crate) fn clear_all(&mut self) -> usize {
        let cleared = self.queue.len();
        self.queue.clear();
        cleared
    }

    pub(crate) fn len(&self) -> usize {
        self.queue.len()
    }

    pub(crate) fn pending(&self) -> Vec<PendingTimer> {
        let mut timers = self
            .queue
            .iter()
            .map(|task| PendingTimer {
                id: task.id,
                due_at: task.due_at,
                order: task.order,
                kind: task.kind.timer_kind(),
            })
            .collect::<Vec<_>>();
        timers.sort_by_key(|timer| (timer.due_at, timer.order));
        timers
    }

    fn next_task_index(&self, due_limit: Option<i64>) -> Option<usize> {
        self.queue
            .iter()
            .enumerate()
            .filter(|(_, task)| due_limit.is_none_or(|limit| task.due_at <= limit))
            .min_by_key(|(_, task)| (task.due_at, task.order))
            .map(|(idx, _)| idx)
    }

    pub(crate) fn has_next(&self, due_limit: Option<i64>) -> bool {
        self.next_task_index(due_limit).is_some()
    }

    /// Removes the earliest task due by `due_limit` (any task when `None`),
    /// moving the clock up to it when `advance_clock` is set.
    pub(crate) fn pop_next(
        &mut self,
        due_limit: Option<i64>,
        advance_clock: bool,
    ) -> Option<ScheduledTask> {
        let idx = self.next_task_index(due_limit)?;
        let task = self.queue.remove(idx);
        if advance_clock && task.due_at > self.now_ms {
            self.now_ms = task.due_at;
        }
        Some(task)
    }

    pub(crate) fn step_limit_error(&self, steps: usize, due_limit: Option<i64>) -> Error {
        let due_limit_desc = due_limit
            .map(|value| value.to_string())
            .unwrap_or_else(|| "none".into());
        let next_task_desc = self
            .next_task_index(due_limit)
            .and_then(|idx| self.queue.get(idx))
            .map(|task| format!("id={},due_at={},order={}", task.id, task.due_at, task.order))
            .unwrap_or_else(|| "none".into());

        Error::Runtime(format!(
            "timer queue exceeded max steps: limit={}, steps={steps}, now_ms={}, due_limit={due_limit_desc}, pending_tasks={}, next_task={next_task_desc}",
            self.step_limit,
            self.now_ms,
            self.queue.len(),
        ))
    }
}
