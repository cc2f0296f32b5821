pub mod error;
pub use self::error::{Error, Result};

pub mod time;
pub use time::{DateTimeUtc, Duration};

pub mod sample;
pub use sample::{
    ChlorophyllData, CurrentData, LocationKey, Payload, Sample, SstData, Variable, VariantData,
    WavesData, WindData,
};

pub mod location;
pub use location::{IngestStats, LocationRecord, LocationTable, MergeStats};

pub mod reduce;
pub use reduce::{ReductionOutcome, ReductionPolicy, ReductionStats, TemporalReducer};

pub mod retention;
pub use retention::{retention_cutoff, PurgeStats};

pub mod binning;
pub use binning::{
    bin_table, Binning, BinningOutcome, BinningParams, BinningStats, Cell, CellKey, Partitioning,
};

pub mod render;
pub use render::{
    render_cells, render_layer, ColorMap, Layer, Projection, ScreenPoint, Visual, VisualDatum,
};

pub mod config;
pub use config::{Config, VariableStyle};

pub mod tables;
pub use tables::{EnvironmentTables, Stored};

pub mod store;
pub use store::{EnvironmentStore, RefreshReport, Refresher};
