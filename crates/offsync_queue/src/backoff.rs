//! Retry backoff schedule.

use std::time::Duration;

/// Delays applied after successive failures of a payload.
///
/// The n-th failure (1-based) waits `steps[min(n - 1, len - 1)]`: once the
/// schedule runs out, its last step repeats.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffSchedule {
    steps: Vec<Duration>,
}

impl BackoffSchedule {
    /// Creates a schedule from explicit steps.
    ///
    /// An empty schedule means "retry immediately".
    pub fn new(steps: Vec<Duration>) -> Self {
        Self { steps }
    }

    /// Creates a schedule that always waits `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self::new(vec![delay])
    }

    /// Returns the configured steps.
    pub fn steps(&self) -> &[Duration] {
        &self.steps
    }

    /// Returns the delay to wait after `retry_count` failures.
    ///
    /// `retry_count` is the count *after* the failure was recorded, so the
    /// first failure passes 1. Zero means nothing failed yet.
    pub fn delay_for_retry(&self, retry_count: u32) -> Duration {
        if retry_count == 0 || self.steps.is_empty() {
            return Duration::ZERO;
        }
        let index = (retry_count as usize - 1).min(self.steps.len() - 1);
        self.steps[index]
    }
}

impl Default for BackoffSchedule {
    /// 1s, 5s, 15s, then 60s for every further retry.
    fn default() -> Self {
        Self::new(vec![
            Duration::from_secs(1),
            Duration::from_secs(5),
            Duration::from_secs(15),
            Duration::from_secs(60),
        ])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_schedule() {
        let schedule = BackoffSchedule::default();
        assert_eq!(schedule.delay_for_retry(0), Duration::ZERO);
        assert_eq!(schedule.delay_for_retry(1), Duration::from_secs(1));
        assert_eq!(schedule.delay_for_retry(2), Duration::from_secs(5));
        assert_eq!(schedule.delay_for_retry(3), Duration::from_secs(15));
        assert_eq!(schedule.delay_for_retry(4), Duration::from_secs(60));
    }

    #[test]
    fn last_step_repeats() {
        let schedule = BackoffSchedule::default();
        for retry in 5..20 {
            assert_eq!(schedule.delay_for_retry(retry), Duration::from_secs(60));
        }
    }

    #[test]
    fn fixed_and_empty_schedules() {
        let fixed = BackoffSchedule::fixed(Duration::from_millis(250));
        assert_eq!(fixed.delay_for_retry(1), Duration::from_millis(250));
        assert_eq!(fixed.delay_for_retry(9), Duration::from_millis(250));

        let empty = BackoffSchedule::new(Vec::new());
        assert_eq!(empty.delay_for_retry(3), Duration::ZERO);
    }
}
