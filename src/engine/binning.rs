// Copyright © 2024 Pathway

//! Screen-space declutter.
//!
//! Visible representatives are projected, snapped to a grid whose cell size is
//! the icon radius, and every occupied cell yields one blended datum. The blend
//! is a pairwise average: with three or more contributions the result depends
//! on the order of combination, which is why [`Partitioning`] is explicit.

use std::num::{NonZeroU32, NonZeroUsize};
use std::sync::atomic::{AtomicBool, Ordering};

use indexmap::map::Entry;
use indexmap::IndexMap;
use log::debug;
use num_integer::Integer;
use rayon::prelude::*;

use super::config::Config;
use super::location::{LocationRecord, LocationTable};
use super::render::{Projection, ScreenPoint};
use super::retention::retention_cutoff;
use super::sample::{Payload, Variable};
use super::time::DateTimeUtc;
use super::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i64,
    pub y: i64,
}

impl CellKey {
    /// Snaps a screen point to the upper-left corner of its cell. Negative
    /// coordinates land in the cell to their upper-left as well.
    #[allow(clippy::cast_possible_truncation)]
    pub fn quantize(point: ScreenPoint, cell_size: NonZeroU32) -> Self {
        let size = i64::from(cell_size.get());
        let x = point.x.floor() as i64;
        let y = point.y.floor() as i64;
        Self {
            x: x - x.mod_floor(&size),
            y: y - y.mod_floor(&size),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    pub fn origin(&self) -> ScreenPoint {
        ScreenPoint::new(self.x as f64, self.y as f64)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Cell<P> {
    pub key: CellKey,
    pub payload: P,
    pub timestamp: DateTimeUtc,
    pub contributions: usize,
    pub stale: bool,
}

impl<P: Payload> Cell<P> {
    fn new(key: CellKey, payload: P, timestamp: DateTimeUtc) -> Self {
        Self {
            key,
            payload,
            timestamp,
            contributions: 1,
            stale: false,
        }
    }

    fn absorb(&mut self, payload: &P, timestamp: DateTimeUtc, contributions: usize) {
        self.payload = self.payload.blend(payload);
        self.timestamp = self.timestamp.max(timestamp);
        self.contributions += contributions;
    }

    pub fn is_older_than(&self, cutoff: DateTimeUtc) -> bool {
        self.timestamp < cutoff
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Partitioning {
    /// One pass over the table in order.
    #[default]
    Sequential,
    /// Contiguous chunks of at most `n` locations in table order, built in
    /// parallel and combined left to right. Output is reproducible.
    FixedChunks(NonZeroUsize),
    /// Rayon fold/reduce. Combination order is unspecified.
    WorkStealing,
}

#[derive(Debug, Clone, Copy)]
pub struct BinningParams {
    pub cell_size: NonZeroU32,
    pub margin: f64,
    pub hard_cutoff: Option<DateTimeUtc>,
    pub ignore_date_limit: bool,
    pub freshness_cutoff: Option<DateTimeUtc>,
    pub partitioning: Partitioning,
}

impl BinningParams {
    pub fn new(cell_size: NonZeroU32) -> Self {
        Self {
            cell_size,
            margin: 0.0,
            hard_cutoff: None,
            ignore_date_limit: false,
            freshness_cutoff: None,
            partitioning: Partitioning::Sequential,
        }
    }

    /// Parameters for drawing `variable` at `now` under a configuration snapshot.
    pub fn from_config(
        config: &Config,
        variable: Variable,
        now: DateTimeUtc,
        partitioning: Partitioning,
    ) -> Result<Self> {
        let cell_size = config
            .style(variable)
            .cell_size()
            .ok_or(Error::ZeroCellSize {
                variable: variable.name(),
            })?;
        Ok(Self {
            cell_size,
            margin: config.margin_px,
            hard_cutoff: retention_cutoff(now, config.retention_window()),
            ignore_date_limit: config.ignore_date_limit,
            freshness_cutoff: Some(now - config.freshness()),
            partitioning,
        })
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BinningStats {
    pub total_locations: usize,
    pub visible_locations: usize,
    pub earliest: Option<DateTimeUtc>,
    pub latest: Option<DateTimeUtc>,
    pub occupied_cells: usize,
}

#[derive(Debug, Clone)]
pub struct Binning<P> {
    pub cells: Vec<Cell<P>>,
    pub stats: BinningStats,
}

#[derive(Debug, Clone)]
pub enum BinningOutcome<P> {
    Completed(Binning<P>),
    Aborted,
}

impl<P> BinningOutcome<P> {
    pub fn completed(self) -> Option<Binning<P>> {
        match self {
            Self::Completed(binning) => Some(binning),
            Self::Aborted => None,
        }
    }
}

struct PartialBins<P> {
    cells: IndexMap<CellKey, Cell<P>>,
    visible: usize,
    earliest: Option<DateTimeUtc>,
    latest: Option<DateTimeUtc>,
}

impl<P> Default for PartialBins<P> {
    fn default() -> Self {
        Self {
            cells: IndexMap::new(),
            visible: 0,
            earliest: None,
            latest: None,
        }
    }
}

impl<P: Payload> PartialBins<P> {
    fn insert(&mut self, key: CellKey, payload: &P, timestamp: DateTimeUtc, contributions: usize) {
        match self.cells.entry(key) {
            Entry::Occupied(mut entry) => entry.get_mut().absorb(payload, timestamp, contributions),
            Entry::Vacant(entry) => {
                let mut cell = Cell::new(key, payload.clone(), timestamp);
                cell.contributions = contributions;
                entry.insert(cell);
            }
        }
    }

    fn note_timestamp(&mut self, timestamp: DateTimeUtc) {
        self.earliest = Some(self.earliest.map_or(timestamp, |earliest| earliest.min(timestamp)));
        self.latest = Some(self.latest.map_or(timestamp, |latest| latest.max(timestamp)));
    }

    fn merge(mut self, other: Self) -> Self {
        for (key, cell) in other.cells {
            self.insert(key, &cell.payload, cell.timestamp, cell.contributions);
        }
        self.visible += other.visible;
        if let Some(earliest) = other.earliest {
            self.note_timestamp(earliest);
        }
        if let Some(latest) = other.latest {
            self.note_timestamp(latest);
        }
        self
    }
}

struct Binner<'a, P, V: ?Sized> {
    projection: &'a V,
    params: &'a BinningParams,
    abort: &'a AtomicBool,
    viewport: (f64, f64),
    _payload: std::marker::PhantomData<fn() -> P>,
}

impl<P: Payload, V: Projection + ?Sized> Binner<'_, P, V> {
    fn visible_point(&self, record: &LocationRecord<P>) -> Option<ScreenPoint> {
        let representative = &record.representative;
        if !self.params.ignore_date_limit {
            if let Some(cutoff) = self.params.hard_cutoff {
                if representative.timestamp < cutoff {
                    return None;
                }
            }
        }
        if !representative.is_defined() {
            return None;
        }
        let point = self
            .projection
            .project(representative.latitude, representative.longitude)?;
        let (width, height) = self.viewport;
        let margin = self.params.margin;
        let inside = point.x >= -margin
            && point.x <= width + margin
            && point.y >= -margin
            && point.y <= height + margin;
        inside.then_some(point)
    }

    fn absorb(&self, mut partial: PartialBins<P>, record: &LocationRecord<P>) -> PartialBins<P> {
        if self.abort.load(Ordering::Relaxed) {
            return partial;
        }
        if let Some(point) = self.visible_point(record) {
            let representative = &record.representative;
            let key = CellKey::quantize(point, self.params.cell_size);
            partial.insert(key, &representative.payload, representative.timestamp, 1);
            partial.visible += 1;
            partial.note_timestamp(representative.timestamp);
        }
        partial
    }

    fn build<'r>(&self, records: impl IntoIterator<Item = &'r LocationRecord<P>>) -> PartialBins<P> {
        records
            .into_iter()
            .fold(PartialBins::default(), |partial, record| self.absorb(partial, record))
    }
}

/// Bins the representatives of `table` as seen through `projection`.
///
/// Setting `abort` from another thread makes the pass stop early and return
/// [`BinningOutcome::Aborted`].
pub fn bin_table<P, V>(
    table: &LocationTable<P>,
    projection: &V,
    params: &BinningParams,
    abort: &AtomicBool,
) -> BinningOutcome<P>
where
    P: Payload,
    V: Projection + ?Sized,
{
    let binner = Binner {
        projection,
        params,
        abort,
        viewport: projection.viewport_size(),
        _payload: std::marker::PhantomData,
    };

    let partial = match params.partitioning {
        Partitioning::Sequential => binner.build(table.records()),
        Partitioning::FixedChunks(chunk_size) => {
            let records: Vec<&LocationRecord<P>> = table.records().collect();
            let partials: Vec<PartialBins<P>> = records
                .par_chunks(chunk_size.get())
                .map(|chunk| binner.build(chunk.iter().copied()))
                .collect();
            partials
                .into_iter()
                .fold(PartialBins::default(), PartialBins::merge)
        }
        Partitioning::WorkStealing => {
            let records: Vec<&LocationRecord<P>> = table.records().collect();
            records
                .par_iter()
                .fold(PartialBins::default, |partial, record| {
                    binner.absorb(partial, record)
                })
                .reduce(PartialBins::default, PartialBins::merge)
        }
    };

    if abort.load(Ordering::Relaxed) {
        debug!("{} binning pass aborted", P::VARIABLE);
        return BinningOutcome::Aborted;
    }

    let mut cells: Vec<Cell<P>> = partial.cells.into_values().collect();
    if let Some(freshness_cutoff) = params.freshness_cutoff {
        for cell in &mut cells {
            cell.stale = cell.is_older_than(freshness_cutoff);
        }
    }
    let stats = BinningStats {
        total_locations: table.len(),
        visible_locations: partial.visible,
        earliest: partial.earliest,
        latest: partial.latest,
        occupied_cells: cells.len(),
    };
    debug!(
        "{} binning: {} of {} locations visible in {} cells",
        P::VARIABLE,
        stats.visible_locations,
        stats.total_locations,
        stats.occupied_cells
    );
    BinningOutcome::Completed(Binning { cells, stats })
}
