//! In-memory reservation store.
//!
//! Channel reservations live in a map keyed by the case-folded channel
//! name, so lookups are exact. Nickname reservations are glob patterns
//! kept in insertion order; the first pattern that matches a nickname wins.

use super::record::{ResvKind, ResvRecord};
use crate::casemap::{irc_eq, irc_to_lower};
use crate::matcher::Matcher;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Insertion conflict: a reservation with this pattern already exists.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("already reserved: {reason}")]
pub struct AlreadyExists {
    /// Reason of the reservation already in place.
    pub reason: String,
}

/// All active reservations.
pub struct ResvStore {
    channels: HashMap<String, ResvRecord>,
    nicks: Vec<ResvRecord>,
    matcher: Arc<dyn Matcher>,
}

impl std::fmt::Debug for ResvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResvStore")
            .field("channels", &self.channels.len())
            .field("nicks", &self.nicks.len())
            .finish()
    }
}

impl ResvStore {
    /// Create an empty store using `matcher` for nickname lookups.
    pub fn new(matcher: Arc<dyn Matcher>) -> Self {
        Self {
            channels: HashMap::new(),
            nicks: Vec::new(),
            matcher,
        }
    }

    /// Insert a record, refusing duplicates.
    pub fn insert(&mut self, record: ResvRecord) -> Result<(), AlreadyExists> {
        match record.kind {
            ResvKind::Channel => {
                let key = record.key();
                if let Some(existing) = self.channels.get(&key) {
                    return Err(AlreadyExists {
                        reason: existing.reason.clone(),
                    });
                }
                self.channels.insert(key, record);
            }
            ResvKind::Nick => {
                if let Some(existing) = self.find_nick_pattern(&record.pattern) {
                    return Err(AlreadyExists {
                        reason: existing.reason.clone(),
                    });
                }
                self.nicks.push(record);
            }
        }
        Ok(())
    }

    /// Insert records loaded from disk, skipping any already present.
    /// Returns how many were skipped.
    pub fn insert_loaded(&mut self, records: impl IntoIterator<Item = ResvRecord>) -> usize {
        let mut duplicates = 0;
        for record in records {
            let pattern = record.pattern.clone();
            if self.insert(record).is_err() {
                debug!(pattern = %pattern, "Duplicate reservation in file, ignoring");
                duplicates += 1;
            }
        }
        duplicates
    }

    /// Exact (case-folded) channel lookup.
    pub fn lookup_channel(&self, name: &str) -> Option<&ResvRecord> {
        self.channels.get(&irc_to_lower(name))
    }

    /// First nickname reservation whose pattern matches `nick`.
    pub fn lookup_nick(&self, nick: &str) -> Option<&ResvRecord> {
        self.nicks
            .iter()
            .find(|record| self.matcher.matches(&record.pattern, nick))
    }

    /// Nickname reservation whose pattern text equals `pattern`.
    pub fn find_nick_pattern(&self, pattern: &str) -> Option<&ResvRecord> {
        self.nicks.iter().find(|record| irc_eq(&record.pattern, pattern))
    }

    /// Reservation with this literal pattern, of the kind its syntax implies.
    pub fn get(&self, kind: ResvKind, pattern: &str) -> Option<&ResvRecord> {
        match kind {
            ResvKind::Channel => self.lookup_channel(pattern),
            ResvKind::Nick => self.find_nick_pattern(pattern),
        }
    }

    pub fn remove_channel(&mut self, name: &str) -> Option<ResvRecord> {
        self.channels.remove(&irc_to_lower(name))
    }

    /// Remove the nickname reservation whose pattern text is `pattern`
    /// (not the reservation a nickname would match).
    pub fn remove_nick_by_exact_pattern(&mut self, pattern: &str) -> Option<ResvRecord> {
        let idx = self
            .nicks
            .iter()
            .position(|record| irc_eq(&record.pattern, pattern))?;
        Some(self.nicks.remove(idx))
    }

    /// Remove by literal pattern.
    pub fn remove(&mut self, kind: ResvKind, pattern: &str) -> Option<ResvRecord> {
        match kind {
            ResvKind::Channel => self.remove_channel(pattern),
            ResvKind::Nick => self.remove_nick_by_exact_pattern(pattern),
        }
    }

    /// Drop temporary reservations that have lapsed at `now`.
    pub fn expire(&mut self, now: i64) -> Vec<ResvRecord> {
        let mut expired = Vec::new();

        let lapsed: Vec<String> = self
            .channels
            .iter()
            .filter(|(_, record)| record.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in lapsed {
            if let Some(record) = self.channels.remove(&key) {
                expired.push(record);
            }
        }

        let (gone, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.nicks)
            .into_iter()
            .partition(|record| record.is_expired(now));
        self.nicks = kept;
        expired.extend(gone);

        if !expired.is_empty() {
            debug!(count = expired.len(), "Expired temporary reservations");
        }

        expired
    }

    /// All records: channels first, then nicks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ResvRecord> {
        self.channels.values().chain(self.nicks.iter())
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn nick_count(&self) -> usize {
        self.nicks.len()
    }

    pub fn len(&self) -> usize {
        self.channels.len() + self.nicks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
