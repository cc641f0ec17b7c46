//! Cancellable one-shot timers on simulated or wall-clock time
//!
//! Crossfade completion is signalled by a fixed timer rather than by the
//! automation itself. Timers are polled by the engine tick, so tests drive
//! them by advancing a `ManualClock`.

/// Handle returned by [`TimerQueue::schedule`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(u64);

#[derive(Debug, Clone)]
struct Pending<T> {
    id: TimerId,
    due: f64,
    payload: T,
}

/// Timers ordered by due time
#[derive(Debug, Clone)]
pub struct TimerQueue<T> {
    pending: Vec<Pending<T>>,
    next_id: u64,
}

impl<T> Default for TimerQueue<T> {
    fn default() -> Self {
        Self {
            pending: Vec::new(),
            next_id: 0,
        }
    }
}

impl<T> TimerQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fire `payload` once the clock reaches `due`
    pub fn schedule(&mut self, due: f64, payload: T) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        // Equal due times fire in scheduling order
        let at = self.pending.partition_point(|p| p.due <= due);
        self.pending.insert(at, Pending { id, due, payload });
        id
    }

    /// Drop a pending timer, returning its payload if it had not fired
    pub fn cancel(&mut self, id: TimerId) -> Option<T> {
        let index = self.pending.iter().position(|p| p.id == id)?;
        Some(self.pending.remove(index).payload)
    }

    /// Remove and return every timer due at or before `now`
    pub fn poll(&mut self, now: f64) -> Vec<T> {
        let due = self.pending.partition_point(|p| p.due <= now);
        self.pending.drain(..due).map(|p| p.payload).collect()
    }

    pub fn next_due(&self) -> Option<f64> {
        self.pending.first().map(|p| p.due)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_returns_due_in_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(3.0, "c");
        timers.schedule(1.0, "a");
        timers.schedule(2.0, "b");

        assert!(timers.poll(0.5).is_empty());
        assert_eq!(timers.poll(2.0), vec!["a", "b"]);
        assert_eq!(timers.next_due(), Some(3.0));
        assert_eq!(timers.poll(10.0), vec!["c"]);
        assert!(timers.is_empty());
    }

    #[test]
    fn test_cancel_prevents_firing() {
        let mut timers = TimerQueue::new();
        let id = timers.schedule(1.0, 7);
        timers.schedule(1.0, 8);
        assert_eq!(timers.cancel(id), Some(7));
        assert_eq!(timers.cancel(id), None);
        assert_eq!(timers.poll(1.0), vec![8]);
    }

    #[test]
    fn test_same_due_time_keeps_schedule_order() {
        let mut timers = TimerQueue::new();
        timers.schedule(1.0, 1);
        timers.schedule(1.0, 2);
        timers.schedule(1.0, 3);
        assert_eq!(timers.len(), 3);
        assert_eq!(timers.poll(1.0), vec![1, 2, 3]);
    }
}
