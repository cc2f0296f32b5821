// Copyright © 2024 Pathway

use indexmap::map::Entry;
use indexmap::IndexMap;
use log::debug;

use super::sample::{LocationKey, Payload, Sample};
use super::time::DateTimeUtc;

/// Everything known about one location: the live value and the raw observations.
#[derive(Debug, Clone)]
pub struct LocationRecord<P> {
    pub representative: Sample<P>,
    history: Vec<Sample<P>>,
}

impl<P: Payload> LocationRecord<P> {
    /// Starts a record seeded by its first observation, which is both the
    /// representative and the first history entry.
    pub fn new(first: Sample<P>) -> Self {
        Self {
            representative: first.clone(),
            history: vec![first],
        }
    }

    pub fn history(&self) -> &[Sample<P>] {
        &self.history
    }

    pub fn entry_at(&self, timestamp: DateTimeUtc) -> Option<&Sample<P>> {
        self.history
            .iter()
            .find(|entry| entry.timestamp == timestamp)
    }

    /// Appends unless an entry with the same timestamp is already present.
    pub fn insert_if_absent(&mut self, sample: Sample<P>) -> bool {
        if self.entry_at(sample.timestamp).is_some() {
            return false;
        }
        self.history.push(sample);
        true
    }

    /// Appends, replacing any entry with the same timestamp.
    /// Returns whether an entry was replaced.
    pub fn upsert(&mut self, sample: Sample<P>) -> bool {
        let position = self
            .history
            .iter()
            .position(|entry| entry.timestamp == sample.timestamp);
        if let Some(position) = position {
            self.history.remove(position);
        }
        self.history.push(sample);
        position.is_some()
    }

    /// Drops history entries strictly older than `cutoff`, returns how many went.
    pub fn trim_before(&mut self, cutoff: DateTimeUtc) -> usize {
        let before = self.history.len();
        self.history.retain(|entry| entry.timestamp >= cutoff);
        before - self.history.len()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub new_locations: usize,
    pub appended: usize,
    pub duplicates: usize,
    pub malformed: usize,
}

impl IngestStats {
    pub fn accumulate(&mut self, other: IngestStats) {
        self.new_locations += other.new_locations;
        self.appended += other.appended;
        self.duplicates += other.duplicates;
        self.malformed += other.malformed;
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub new_locations: usize,
    pub appended: usize,
    pub replaced: usize,
}

impl MergeStats {
    pub fn accumulate(&mut self, other: MergeStats) {
        self.new_locations += other.new_locations;
        self.appended += other.appended;
        self.replaced += other.replaced;
    }
}

/// One record per location, iterated in first-seen order.
#[derive(Debug, Clone)]
pub struct LocationTable<P> {
    records: IndexMap<LocationKey, LocationRecord<P>>,
}

impl<P> Default for LocationTable<P> {
    fn default() -> Self {
        Self {
            records: IndexMap::new(),
        }
    }
}

impl<P: Payload> LocationTable<P> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, key: &LocationKey) -> Option<&LocationRecord<P>> {
        self.records.get(key)
    }

    pub fn get_at(&self, latitude: f64, longitude: f64) -> Option<&LocationRecord<P>> {
        self.get(&LocationKey::new(latitude, longitude))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LocationKey, &LocationRecord<P>)> {
        self.records.iter()
    }

    pub fn records(&self) -> impl ExactSizeIterator<Item = &LocationRecord<P>> {
        self.records.values()
    }

    pub(crate) fn records_mut(&mut self) -> impl Iterator<Item = &mut LocationRecord<P>> {
        self.records.values_mut()
    }

    pub fn history_len(&self) -> usize {
        self.records.values().map(|record| record.history.len()).sum()
    }

    /// Folds a freshly loaded batch in. Entries whose timestamp is already in
    /// the location's history are ignored, so ingesting a batch twice is the
    /// same as ingesting it once. Samples with non-finite coordinates or
    /// values count as malformed and are dropped.
    pub fn ingest_merge(&mut self, batch: impl IntoIterator<Item = Sample<P>>) -> IngestStats {
        let mut stats = IngestStats::default();
        for sample in batch {
            if !sample.has_finite_coordinates() {
                debug!(
                    "skipping {} sample with non-finite coordinates ({}, {})",
                    P::VARIABLE,
                    sample.latitude,
                    sample.longitude
                );
                stats.malformed += 1;
                continue;
            }
            if !sample.payload.is_defined() {
                debug!(
                    "skipping {} sample at ({}, {}) with a non-finite value",
                    P::VARIABLE,
                    sample.latitude,
                    sample.longitude
                );
                stats.malformed += 1;
                continue;
            }
            match self.records.entry(sample.location_key()) {
                Entry::Vacant(entry) => {
                    entry.insert(LocationRecord::new(sample));
                    stats.new_locations += 1;
                    stats.appended += 1;
                }
                Entry::Occupied(mut entry) => {
                    if entry.get_mut().insert_if_absent(sample) {
                        stats.appended += 1;
                    } else {
                        stats.duplicates += 1;
                    }
                }
            }
        }
        stats
    }

    /// Upserts every history entry of `incoming` by timestamp: on a clash
    /// the incoming entry replaces ours. `incoming` is left untouched.
    pub fn cross_batch_merge(&mut self, incoming: &LocationTable<P>) -> MergeStats {
        let mut stats = MergeStats::default();
        for (key, incoming_record) in &incoming.records {
            let record = match self.records.entry(*key) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => {
                    stats.new_locations += 1;
                    entry.insert(LocationRecord {
                        representative: incoming_record.representative.clone(),
                        history: Vec::with_capacity(incoming_record.history.len()),
                    })
                }
            };
            for entry in &incoming_record.history {
                if record.upsert(entry.clone()) {
                    stats.replaced += 1;
                } else {
                    stats.appended += 1;
                }
            }
        }
        stats
    }

    /// Keeps only the records satisfying `keep`, preserving order.
    pub(crate) fn retain(&mut self, mut keep: impl FnMut(&mut LocationRecord<P>) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|_key, record| keep(record));
        before - self.records.len()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<P: Payload> FromIterator<Sample<P>> for LocationTable<P> {
    fn from_iter<T: IntoIterator<Item = Sample<P>>>(iter: T) -> Self {
        let mut table = Self::new();
        table.ingest_merge(iter);
        table
    }
}
