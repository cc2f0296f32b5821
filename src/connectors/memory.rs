// Copyright © 2024 Pathway

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use super::{collect_batch, LoadError, Loader};
use crate::engine::{DateTimeUtc, Sample, Variable, VariantData};

type Queue = Arc<Mutex<VecDeque<Vec<Sample<VariantData>>>>>;

/// Producer side of a [`MemoryLoader`]; cheap to clone and share.
#[derive(Clone, Default)]
pub struct MemoryFeed {
    queue: Queue,
}

impl MemoryFeed {
    pub fn push(&self, batch: Vec<Sample<VariantData>>) {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push_back(batch);
    }

    pub fn pending(&self) -> usize {
        self.queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .len()
    }
}

/// Serves batches pushed through its [`MemoryFeed`]. Every load drains all
/// pending batches.
pub struct MemoryLoader {
    name: String,
    variable: Variable,
    feed: MemoryFeed,
}

impl MemoryLoader {
    pub fn new(name: impl Into<String>, variable: Variable) -> Self {
        Self {
            name: name.into(),
            variable,
            feed: MemoryFeed::default(),
        }
    }

    pub fn feed(&self) -> MemoryFeed {
        self.feed.clone()
    }
}

impl Loader for MemoryLoader {
    fn name(&self) -> &str {
        &self.name
    }

    fn variable(&self) -> Variable {
        self.variable
    }

    fn load(
        &mut self,
        date_cutoff: Option<DateTimeUtc>,
    ) -> Result<Vec<Sample<VariantData>>, LoadError> {
        let pending: Vec<_> = self
            .feed
            .queue
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .drain(..)
            .collect();
        Ok(collect_batch(
            self.variable,
            pending.into_iter().flatten().map(Ok),
            date_cutoff,
        ))
    }
}
