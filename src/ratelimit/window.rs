use std::collections::VecDeque;
use std::time::Instant;

/// A sliding window of admission timestamps, pruned lazily.
///
/// Timestamps are pushed in admission order, so the front is always the
/// oldest entry and pruning stops at the first one still inside the window.
#[derive(Debug, Clone, Default)]
pub(crate) struct Window {
    data: VecDeque<Instant>,
}

impl Window {
    /// Create an empty window with room for `capacity` timestamps
    pub(crate) fn with_capacity(capacity: usize) -> Self {
        Self {
            data: VecDeque::with_capacity(capacity),
        }
    }

    /// Drop all timestamps older than `cutoff`
    pub(crate) fn prune(&mut self, cutoff: Instant) {
        while let Some(oldest) = self.data.front() {
            if *oldest >= cutoff {
                break;
            }
            self.data.pop_front();
        }
    }

    /// Record an admission at `now`
    pub(crate) fn record(&mut self, now: Instant) {
        self.data.push_back(now);
    }

    /// Number of admissions currently inside the window
    pub(crate) fn len(&self) -> usize {
        self.data.len()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    #[test]
    fn prune_removes_only_expired_entries() {
        let now = Instant::now();
        let mut window = Window::with_capacity(4);
        window.record(now - Duration::from_secs(120));
        window.record(now - Duration::from_secs(90));
        window.record(now - Duration::from_secs(10));
        window.record(now);

        window.prune(now - Duration::from_secs(60));
        assert_eq!(window.len(), 2);
    }

    #[test]
    fn prune_on_empty_window_is_a_noop() {
        let mut window = Window::with_capacity(2);
        window.prune(Instant::now());
        assert_eq!(window.len(), 0);
    }
}
