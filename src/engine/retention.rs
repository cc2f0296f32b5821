// Copyright © 2024 Pathway

use super::location::LocationTable;
use super::sample::Payload;
use super::time::{DateTimeUtc, Duration};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PurgeStats {
    pub dropped_locations: usize,
    pub trimmed_entries: usize,
}

impl PurgeStats {
    pub fn accumulate(&mut self, other: PurgeStats) {
        self.dropped_locations += other.dropped_locations;
        self.trimmed_entries += other.trimmed_entries;
    }
}

/// Cutoff for a retention window ending at `now`, `None` when retention is off.
pub fn retention_cutoff(now: DateTimeUtc, window: Option<Duration>) -> Option<DateTimeUtc> {
    window.map(|window| now - window)
}

impl<P: Payload> LocationTable<P> {
    /// Drops locations whose representative is older than `cutoff` and trims
    /// the history of the others. Anything exactly at `cutoff` stays.
    ///
    /// A location whose representative is stale but whose history still holds
    /// an entry at or after `cutoff` is kept, so entries merged since the last
    /// reduction survive until the next one picks them up.
    pub fn purge(&mut self, cutoff: Option<DateTimeUtc>) -> PurgeStats {
        let Some(cutoff) = cutoff else {
            return PurgeStats::default();
        };
        let mut trimmed_entries = 0;
        let dropped_locations = self.retain(|record| {
            let expired = record.representative.timestamp < cutoff
                && record.history().iter().all(|entry| entry.timestamp < cutoff);
            if expired {
                return false;
            }
            trimmed_entries += record.trim_before(cutoff);
            true
        });
        PurgeStats {
            dropped_locations,
            trimmed_entries,
        }
    }
}
