// Copyright © 2024 Pathway

use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

use super::location::{LocationRecord, LocationTable};
use super::sample::{Fields, Payload, Sample};
use super::time::DateTimeUtc;
use super::Error;

/// How a location's history collapses into its representative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReductionPolicy {
    #[default]
    MostRecent,
    Mean,
}

impl Display for ReductionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MostRecent => f.write_str("most-recent"),
            Self::Mean => f.write_str("mean"),
        }
    }
}

impl FromStr for ReductionPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "most-recent" | "mostrecent" | "last" => Ok(Self::MostRecent),
            "mean" | "average" => Ok(Self::Mean),
            other => Err(Error::ParseError(format!(
                "unknown reduction policy {other:?}, expected most-recent or mean"
            ))),
        }
    }
}

/// Folds the qualifying history entries of one location.
pub trait TemporalReducer<P: Payload> {
    type State;

    fn init(&self, sample: &Sample<P>) -> Self::State;

    fn combine(&self, state: &mut Self::State, sample: &Sample<P>);

    fn finish(&self, state: Self::State) -> Sample<P>;

    /// Reduces the entries with `timestamp <= now_eff`, `None` if there are none.
    fn reduce(&self, history: &[Sample<P>], now_eff: DateTimeUtc) -> Option<Sample<P>> {
        let mut qualifying = history.iter().filter(|entry| entry.timestamp <= now_eff);
        let mut state = self.init(qualifying.next()?);
        for entry in qualifying {
            self.combine(&mut state, entry);
        }
        Some(self.finish(state))
    }
}

pub struct MostRecentReducer;

impl<P: Payload> TemporalReducer<P> for MostRecentReducer {
    type State = Sample<P>;

    fn init(&self, sample: &Sample<P>) -> Self::State {
        sample.clone()
    }

    fn combine(&self, state: &mut Self::State, sample: &Sample<P>) {
        if sample.timestamp > state.timestamp {
            *state = sample.clone();
        }
    }

    fn finish(&self, state: Self::State) -> Sample<P> {
        state
    }
}

pub struct MeanReducer;

pub struct MeanState<P> {
    sums: Fields,
    count: u32,
    latest: Sample<P>,
}

impl<P: Payload> TemporalReducer<P> for MeanReducer {
    type State = MeanState<P>;

    fn init(&self, sample: &Sample<P>) -> Self::State {
        MeanState {
            sums: sample.payload.fields(),
            count: 1,
            latest: sample.clone(),
        }
    }

    fn combine(&self, state: &mut Self::State, sample: &Sample<P>) {
        for (sum, value) in state.sums.iter_mut().zip(sample.payload.fields()) {
            *sum += value;
        }
        state.count += 1;
        if sample.timestamp > state.latest.timestamp {
            state.latest = sample.clone();
        }
    }

    fn finish(&self, state: Self::State) -> Sample<P> {
        let count = f64::from(state.count);
        let means: Fields = state.sums.iter().map(|sum| sum / count).collect();
        let payload = state.latest.payload.with_fields(&means);
        state.latest.with_payload(payload)
    }
}

impl ReductionPolicy {
    pub fn reduce<P: Payload>(
        self,
        history: &[Sample<P>],
        now_eff: DateTimeUtc,
    ) -> Option<Sample<P>> {
        match self {
            Self::MostRecent => MostRecentReducer.reduce(history, now_eff),
            Self::Mean => MeanReducer.reduce(history, now_eff),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReductionOutcome {
    Reduced,
    NoValidData,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReductionStats {
    pub reduced: usize,
    pub no_valid_data: usize,
}

impl ReductionStats {
    pub fn accumulate(&mut self, other: ReductionStats) {
        self.reduced += other.reduced;
        self.no_valid_data += other.no_valid_data;
    }
}

impl<P: Payload> LocationRecord<P> {
    /// Rewrites the representative from the history. History is not touched.
    pub fn reduce(&mut self, policy: ReductionPolicy, now_eff: DateTimeUtc) -> ReductionOutcome {
        match policy.reduce(self.history(), now_eff) {
            Some(representative) => {
                self.representative = representative;
                ReductionOutcome::Reduced
            }
            None => {
                self.representative = self.representative.no_valid_data();
                ReductionOutcome::NoValidData
            }
        }
    }
}

impl<P: Payload> LocationTable<P> {
    pub fn reduce(&mut self, policy: ReductionPolicy, now_eff: DateTimeUtc) -> ReductionStats {
        let mut stats = ReductionStats::default();
        for record in self.records_mut() {
            match record.reduce(policy, now_eff) {
                ReductionOutcome::Reduced => stats.reduced += 1,
                ReductionOutcome::NoValidData => stats.no_valid_data += 1,
            }
        }
        stats
    }
}
