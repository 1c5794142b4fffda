//! Summarization threshold and trim eligibility decisions
//!
//! Everything here is a pure function of a count and the configured limits.

use crate::config::CacheSettings;

/// Whether a session holding `count` messages has reached `message_limit`.
///
/// A non-positive limit disables summarization entirely.
pub fn needs_summarization(count: usize, message_limit: i64) -> bool {
    if message_limit <= 0 {
        return false;
    }
    count as u128 >= message_limit as u128
}

/// Whether a trim to `keep_last` would remove anything from `count` messages
pub fn trim_eligible(count: usize, keep_last: i64) -> bool {
    if keep_last <= 0 {
        return false;
    }
    count as u128 > keep_last as u128
}

/// Threshold parameters fixed for the lifetime of the process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    message_limit: i64,
    keep_last: i64,
}

impl CachePolicy {
    pub fn new(message_limit: i64, keep_last: i64) -> Self {
        Self {
            message_limit,
            keep_last,
        }
    }

    pub fn from_settings(settings: &CacheSettings) -> Self {
        Self::new(settings.message_limit, settings.keep_last)
    }

    pub fn message_limit(&self) -> i64 {
        self.message_limit
    }

    pub fn keep_last(&self) -> i64 {
        self.keep_last
    }

    pub fn is_enabled(&self) -> bool {
        self.message_limit > 0
    }

    /// A trim with these parameters leaves the session at or above the limit
    pub fn trim_recrosses_threshold(&self) -> bool {
        self.is_enabled() && self.keep_last >= self.message_limit
    }

    pub fn needs_summarization(&self, count: usize) -> bool {
        needs_summarization(count, self.message_limit)
    }

    /// True only for the count at which the threshold is first reached,
    /// i.e. `count` needs summarization and `count - 1` did not.
    pub fn is_threshold_crossing(&self, count: usize) -> bool {
        count > 0 && self.needs_summarization(count) && !self.needs_summarization(count - 1)
    }

    /// Appends between re-armed signals once a session stays above the
    /// limit. A completed summarization trims `limit - keep_last` messages,
    /// so a session that missed its trim re-signals at the same pace.
    pub fn rearm_interval(&self) -> usize {
        let retained = self.keep_last.clamp(0, self.message_limit.max(0));
        usize::try_from(self.message_limit - retained)
            .unwrap_or(usize::MAX)
            .max(1)
    }

    /// True for counts above the limit that re-arm summarization, e.g. after
    /// a failed summarization left the session untrimmed.
    ///
    /// Like the crossing, this is a pure function of the count an append
    /// returned, so each re-armed count is observed by exactly one caller.
    pub fn is_overdue(&self, count: usize) -> bool {
        let Ok(limit) = usize::try_from(self.message_limit) else {
            return false;
        };
        self.is_enabled() && count > limit && (count - limit) % self.rearm_interval() == 0
    }
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self::from_settings(&CacheSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_reached_at_limit() {
        assert!(!needs_summarization(9, 10));
        assert!(needs_summarization(10, 10));
        assert!(needs_summarization(11, 10));
    }

    #[test]
    fn test_disabled_limit_never_signals() {
        for limit in [0, -1, i64::MIN] {
            assert!(!needs_summarization(0, limit));
            assert!(!needs_summarization(usize::MAX, limit));
        }
        let policy = CachePolicy::new(0, 5);
        assert!(!policy.is_enabled());
        assert!(!policy.is_threshold_crossing(1));
    }

    #[test]
    fn test_exactly_one_crossing_in_a_run() {
        let policy = CachePolicy::new(10, 3);
        let crossings: Vec<usize> = (1..=25).filter(|&c| policy.is_threshold_crossing(c)).collect();
        assert_eq!(crossings, vec![10]);
    }

    #[test]
    fn test_limit_of_one_crosses_on_first_message() {
        let policy = CachePolicy::new(1, 0);
        assert!(policy.is_threshold_crossing(1));
        assert!(!policy.is_threshold_crossing(0));
    }

    #[test]
    fn test_overdue_counts_follow_trim_stride() {
        let policy = CachePolicy::new(4, 2);
        let overdue: Vec<usize> = (1..=12).filter(|&c| policy.is_overdue(c)).collect();
        assert_eq!(overdue, vec![6, 8, 10, 12]);
        assert!(!policy.is_overdue(4));

        // No retained messages: re-arm once per full limit.
        let policy = CachePolicy::new(3, 0);
        let overdue: Vec<usize> = (1..=10).filter(|&c| policy.is_overdue(c)).collect();
        assert_eq!(overdue, vec![6, 9]);

        // keep_last at or above the limit re-arms on every append.
        let policy = CachePolicy::new(3, 5);
        assert_eq!(policy.rearm_interval(), 1);
        assert!(policy.is_overdue(4) && policy.is_overdue(5));

        assert!(!CachePolicy::new(0, 2).is_overdue(100));
    }

    #[test]
    fn test_trim_eligibility() {
        assert!(!trim_eligible(5, 0));
        assert!(!trim_eligible(5, -2));
        assert!(!trim_eligible(3, 3));
        assert!(trim_eligible(4, 3));
    }

    #[test]
    fn test_pathological_keep_last_is_detected() {
        assert!(CachePolicy::new(10, 10).trim_recrosses_threshold());
        assert!(CachePolicy::new(10, 12).trim_recrosses_threshold());
        assert!(!CachePolicy::new(10, 5).trim_recrosses_threshold());
        assert!(!CachePolicy::new(0, 12).trim_recrosses_threshold());
        // Post-trim count is recomputed, not assumed below the limit.
        assert!(CachePolicy::new(10, 12).needs_summarization(12));
    }
}
