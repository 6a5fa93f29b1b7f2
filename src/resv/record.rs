//! Reservation records.

use crate::casemap::irc_to_lower;
use crate::matcher::is_channel_name;
use std::fmt;

/// What a reservation forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResvKind {
    /// An exact channel name.
    Channel,
    /// A nickname glob pattern.
    Nick,
}

impl ResvKind {
    /// Classify a pattern by its syntax.
    pub fn of(pattern: &str) -> Self {
        if is_channel_name(pattern) { Self::Channel } else { Self::Nick }
    }
}

impl fmt::Display for ResvKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Channel => f.write_str("channel"),
            Self::Nick => f.write_str("nick"),
        }
    }
}

/// A single active reservation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResvRecord {
    pub kind: ResvKind,
    /// Channel name or nickname mask, as given by the operator.
    pub pattern: String,
    pub reason: String,
    /// Unix timestamp when the reservation lapses; `None` is permanent.
    pub expires_at: Option<i64>,
    /// Who placed it (`nick!user@host{server}`).
    pub set_by: String,
    /// Unix timestamp of creation.
    pub set_at: i64,
}

impl ResvRecord {
    /// A permanent reservation.
    pub fn permanent(
        pattern: impl Into<String>,
        reason: impl Into<String>,
        set_by: impl Into<String>,
        set_at: i64,
    ) -> Self {
        let pattern = pattern.into();
        Self {
            kind: ResvKind::of(&pattern),
            pattern,
            reason: reason.into(),
            expires_at: None,
            set_by: set_by.into(),
            set_at,
        }
    }

    /// A reservation lasting `duration` seconds from `now`.
    /// A zero duration yields a permanent record.
    pub fn with_duration(
        pattern: impl Into<String>,
        reason: impl Into<String>,
        set_by: impl Into<String>,
        now: i64,
        duration: u64,
    ) -> Self {
        let mut record = Self::permanent(pattern, reason, set_by, now);
        if duration > 0 {
            let duration = i64::try_from(duration).unwrap_or(i64::MAX);
            record.expires_at = Some(now.saturating_add(duration));
        }
        record
    }

    pub fn is_temporary(&self) -> bool {
        self.expires_at.is_some()
    }

    /// Has this record lapsed at `now`?
    pub fn is_expired(&self, now: i64) -> bool {
        matches!(self.expires_at, Some(expires) if expires <= now)
    }

    /// Case-folded key used by the channel index.
    pub fn key(&self) -> String {
        irc_to_lower(&self.pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_follows_syntax() {
        assert_eq!(ResvKind::of("#spam"), ResvKind::Channel);
        assert_eq!(ResvKind::of("&local"), ResvKind::Channel);
        assert_eq!(ResvKind::of("badnick*"), ResvKind::Nick);
    }

    #[test]
    fn duration_sets_expiry() {
        let perm = ResvRecord::with_duration("#spam", "no spam", "oper", 1000, 0);
        assert!(!perm.is_temporary());
        assert!(!perm.is_expired(i64::MAX));

        let temp = ResvRecord::with_duration("#spam", "no spam", "oper", 1000, 600);
        assert_eq!(temp.expires_at, Some(1600));
        assert!(!temp.is_expired(1599));
        assert!(temp.is_expired(1600));
    }

    #[test]
    fn huge_duration_stays_in_the_future() {
        let temp = ResvRecord::with_duration("#spam", "no spam", "oper", 1000, u64::MAX);
        assert_eq!(temp.expires_at, Some(i64::MAX));
        assert!(!temp.is_expired(1000));
    }
}
