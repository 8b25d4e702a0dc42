//! Single-slot scheduling of work onto the next animation frame.
//!
//! At most one job is pending; scheduling again replaces an unprocessed job
//! ("latest wins"). The host drains the slot once per rendered frame, so
//! the work is aligned to frames rather than to a fixed delay.

/// A cancellable, single-slot frame scheduler.
#[derive(Debug, Clone)]
pub struct FrameScheduler<T> {
    pending: Option<T>,
    superseded: u64,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self {
            pending: None,
            superseded: 0,
        }
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `job` for the next frame. Returns `true` if it replaced a job
    /// that had not run yet.
    pub fn schedule(&mut self, job: T) -> bool {
        let replaced = self.pending.replace(job).is_some();
        if replaced {
            self.superseded += 1;
        }
        replaced
    }

    /// Drop the pending job, if any.
    pub fn cancel(&mut self) -> Option<T> {
        self.pending.take()
    }

    /// Take the job due on this frame.
    pub fn take(&mut self) -> Option<T> {
        self.pending.take()
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// How many jobs were replaced before they ran.
    pub fn superseded(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn latest_job_wins() {
        let mut s = FrameScheduler::new();
        assert!(!s.schedule(1));
        assert!(s.schedule(2));
        assert!(s.schedule(3));
        assert_eq!(s.take(), Some(3));
        assert_eq!(s.take(), None);
        assert_eq!(s.superseded(), 2);
    }

    #[test]
    fn cancel_clears_the_slot() {
        let mut s = FrameScheduler::new();
        s.schedule("a");
        assert!(s.is_pending());
        assert_eq!(s.cancel(), Some("a"));
        assert!(!s.is_pending());
        assert_eq!(s.take(), None);
    }

    #[test]
    fn scheduling_after_take_is_not_a_supersede() {
        let mut s = FrameScheduler::new();
        s.schedule(1);
        s.take();
        assert!(!s.schedule(2));
        assert_eq!(s.superseded(), 0);
    }
}
