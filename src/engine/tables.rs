// Copyright © 2024 Pathway

use super::location::{IngestStats, LocationTable, MergeStats};
use super::reduce::{ReductionPolicy, ReductionStats};
use super::retention::PurgeStats;
use super::sample::{
    ChlorophyllData, CurrentData, Payload, Sample, SstData, VariantData, WavesData, WindData,
};
use super::time::DateTimeUtc;

/// One location table per variable.
#[derive(Debug, Clone, Default)]
pub struct EnvironmentTables {
    pub currents: LocationTable<CurrentData>,
    pub sst: LocationTable<SstData>,
    pub wind: LocationTable<WindData>,
    pub waves: LocationTable<WavesData>,
    pub chlorophyll: LocationTable<ChlorophyllData>,
}

/// Payloads that have a table of their own in [`EnvironmentTables`].
pub trait Stored: Payload {
    fn table(tables: &EnvironmentTables) -> &LocationTable<Self>;

    fn table_mut(tables: &mut EnvironmentTables) -> &mut LocationTable<Self>;
}

macro_rules! impl_stored {
    ($payload:ty, $field:ident) => {
        impl Stored for $payload {
            fn table(tables: &EnvironmentTables) -> &LocationTable<Self> {
                &tables.$field
            }

            fn table_mut(tables: &mut EnvironmentTables) -> &mut LocationTable<Self> {
                &mut tables.$field
            }
        }
    };
}

impl_stored!(CurrentData, currents);
impl_stored!(SstData, sst);
impl_stored!(WindData, wind);
impl_stored!(WavesData, waves);
impl_stored!(ChlorophyllData, chlorophyll);

#[derive(Default)]
struct SplitBatch {
    currents: Vec<Sample<CurrentData>>,
    sst: Vec<Sample<SstData>>,
    wind: Vec<Sample<WindData>>,
    waves: Vec<Sample<WavesData>>,
    chlorophyll: Vec<Sample<ChlorophyllData>>,
}

impl SplitBatch {
    fn push(&mut self, sample: Sample<VariantData>) {
        let Sample {
            latitude,
            longitude,
            timestamp,
            payload,
        } = sample;
        match payload {
            VariantData::Current(data) => {
                self.currents
                    .push(Sample::new(latitude, longitude, timestamp, data));
            }
            VariantData::Sst(data) => {
                self.sst.push(Sample::new(latitude, longitude, timestamp, data));
            }
            VariantData::Wind(data) => {
                self.wind.push(Sample::new(latitude, longitude, timestamp, data));
            }
            VariantData::Waves(data) => {
                self.waves.push(Sample::new(latitude, longitude, timestamp, data));
            }
            VariantData::Chlorophyll(data) => {
                self.chlorophyll
                    .push(Sample::new(latitude, longitude, timestamp, data));
            }
        }
    }
}

impl EnvironmentTables {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table<P: Stored>(&self) -> &LocationTable<P> {
        P::table(self)
    }

    pub fn table_mut<P: Stored>(&mut self) -> &mut LocationTable<P> {
        P::table_mut(self)
    }

    /// Routes every sample to the table of its variable.
    pub fn ingest(&mut self, batch: impl IntoIterator<Item = Sample<VariantData>>) -> IngestStats {
        let mut split = SplitBatch::default();
        for sample in batch {
            split.push(sample);
        }
        let mut stats = IngestStats::default();
        stats.accumulate(self.currents.ingest_merge(split.currents));
        stats.accumulate(self.sst.ingest_merge(split.sst));
        stats.accumulate(self.wind.ingest_merge(split.wind));
        stats.accumulate(self.waves.ingest_merge(split.waves));
        stats.accumulate(self.chlorophyll.ingest_merge(split.chlorophyll));
        stats
    }

    /// Cross-batch merge of every table of `incoming` into ours.
    pub fn merge(&mut self, incoming: &EnvironmentTables) -> MergeStats {
        let mut stats = MergeStats::default();
        stats.accumulate(self.currents.cross_batch_merge(&incoming.currents));
        stats.accumulate(self.sst.cross_batch_merge(&incoming.sst));
        stats.accumulate(self.wind.cross_batch_merge(&incoming.wind));
        stats.accumulate(self.waves.cross_batch_merge(&incoming.waves));
        stats.accumulate(self.chlorophyll.cross_batch_merge(&incoming.chlorophyll));
        stats
    }

    pub fn purge(&mut self, cutoff: Option<DateTimeUtc>) -> PurgeStats {
        let mut stats = PurgeStats::default();
        stats.accumulate(self.currents.purge(cutoff));
        stats.accumulate(self.sst.purge(cutoff));
        stats.accumulate(self.wind.purge(cutoff));
        stats.accumulate(self.waves.purge(cutoff));
        stats.accumulate(self.chlorophyll.purge(cutoff));
        stats
    }

    pub fn reduce(&mut self, policy: ReductionPolicy, now_eff: DateTimeUtc) -> ReductionStats {
        let mut stats = ReductionStats::default();
        stats.accumulate(self.currents.reduce(policy, now_eff));
        stats.accumulate(self.sst.reduce(policy, now_eff));
        stats.accumulate(self.wind.reduce(policy, now_eff));
        stats.accumulate(self.waves.reduce(policy, now_eff));
        stats.accumulate(self.chlorophyll.reduce(policy, now_eff));
        stats
    }

    pub fn location_count(&self) -> usize {
        self.currents.len()
            + self.sst.len()
            + self.wind.len()
            + self.waves.len()
            + self.chlorophyll.len()
    }

    pub fn history_len(&self) -> usize {
        self.currents.history_len()
            + self.sst.history_len()
            + self.wind.history_len()
            + self.waves.history_len()
            + self.chlorophyll.history_len()
    }

    pub fn clear(&mut self) {
        self.currents.clear();
        self.sst.clear();
        self.wind.clear();
        self.waves.clear();
        self.chlorophyll.clear();
    }
}
