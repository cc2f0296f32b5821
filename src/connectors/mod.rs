// Copyright © 2024 Pathway

/*
    Loaders turn an external source (a network feed, a current-meter text
    file, a gridded array file) into a batch of samples of one variable.
    Parsing is theirs; the engine only sees the batches.
*/

use std::io;

use itertools::Itertools;
use log::debug;

pub mod memory;

pub use memory::{MemoryFeed, MemoryLoader};

use crate::engine::error::DynError;
use crate::engine::{DateTimeUtc, Sample, Variable, VariantData};

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum LoadError {
    #[error("required variables missing from the source: {}", .0.join(", "))]
    MissingVariables(Vec<String>),

    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Other(DynError),
}

pub trait Loader: Send {
    fn name(&self) -> &str;

    fn variable(&self) -> Variable;

    /// Loads the current content of the source. Samples older than
    /// `date_cutoff` are left out; `None` loads everything.
    fn load(
        &mut self,
        date_cutoff: Option<DateTimeUtc>,
    ) -> Result<Vec<Sample<VariantData>>, LoadError>;
}

/// Fails with the list of required fields of `variable` absent from `available`.
pub fn check_required_fields<'a>(
    variable: Variable,
    available: impl IntoIterator<Item = &'a str>,
) -> Result<(), LoadError> {
    let available: Vec<&str> = available.into_iter().collect();
    let missing = variable
        .required_fields()
        .iter()
        .filter(|field| !available.iter().any(|name| name.eq_ignore_ascii_case(field)))
        .map(ToString::to_string)
        .collect_vec();
    if missing.is_empty() {
        Ok(())
    } else {
        Err(LoadError::MissingVariables(missing))
    }
}

fn malformed_reason(variable: Variable, sample: &Sample<VariantData>) -> Option<&'static str> {
    if sample.payload.variable() != variable {
        Some("wrong variable")
    } else if !sample.has_finite_coordinates() {
        Some("non-finite coordinates")
    } else if !sample.payload.fields().iter().all(|value| value.is_finite()) {
        Some("non-finite value")
    } else {
        None
    }
}

/// Gathers parsed records into a batch. Malformed records and records
/// older than `date_cutoff` are skipped; this never fails.
pub fn collect_batch(
    variable: Variable,
    records: impl IntoIterator<Item = Result<Sample<VariantData>, DynError>>,
    date_cutoff: Option<DateTimeUtc>,
) -> Vec<Sample<VariantData>> {
    let mut malformed = 0;
    let mut too_old = 0;
    let mut batch = Vec::new();
    for record in records {
        let sample = match record {
            Ok(sample) => sample,
            Err(error) => {
                debug!("skipping malformed {variable} record: {error}");
                malformed += 1;
                continue;
            }
        };
        if let Some(reason) = malformed_reason(variable, &sample) {
            debug!(
                "skipping {variable} record at ({}, {}): {reason}",
                sample.latitude, sample.longitude
            );
            malformed += 1;
            continue;
        }
        if date_cutoff.is_some_and(|cutoff| sample.timestamp < cutoff) {
            too_old += 1;
            continue;
        }
        batch.push(sample);
    }
    if malformed > 0 || too_old > 0 {
        debug!(
            "{variable} batch: kept {}, skipped {malformed} malformed and {too_old} too old",
            batch.len()
        );
    }
    batch
}
