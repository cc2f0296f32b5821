// Copyright © 2024 Pathway

//! The contract with whatever draws the map, and the conversion of binned
//! cells into ready-to-draw icons.

use std::sync::atomic::AtomicBool;

use super::binning::{bin_table, BinningOutcome, BinningParams, BinningStats, Cell, Partitioning};
use super::config::{Config, VariableStyle, MS_TO_KNOT};
use super::sample::{ChlorophyllData, CurrentData, Payload, SstData, WavesData, WindData};
use super::tables::{EnvironmentTables, Stored};
use super::time::DateTimeUtc;
use super::Result;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ScreenPoint {
    pub x: f64,
    pub y: f64,
}

impl ScreenPoint {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Read-only view of the map being drawn.
pub trait Projection: Sync {
    /// Screen position of a coordinate, `None` if it cannot be projected.
    fn project(&self, latitude: f64, longitude: f64) -> Option<ScreenPoint>;

    fn viewport_size(&self) -> (f64, f64);

    fn zoom_level(&self) -> u32;

    /// Map rotation in radians.
    fn rotation(&self) -> f64;
}

pub trait ColorMap<C>: Sync {
    /// `normalized` is usually within `[0, 1]` but may fall outside it.
    fn color_for(&self, normalized: f64) -> C;
}

impl<C, F> ColorMap<C> for F
where
    F: Fn(f64) -> C + Sync,
{
    fn color_for(&self, normalized: f64) -> C {
        self(normalized)
    }
}

/// Per-variable drawing rules.
pub trait Visual: Payload {
    /// Value fed to the colour map.
    fn normalized(&self, style: &VariableStyle) -> f64;

    /// Icon angle in radians before the map rotation is applied, `None` for
    /// variables drawn without direction.
    fn icon_angle(&self) -> Option<f64> {
        None
    }

    fn legend_text(&self) -> Option<String>;
}

impl Visual for CurrentData {
    fn normalized(&self, style: &VariableStyle) -> f64 {
        self.speed_cm_s / style.max
    }

    fn icon_angle(&self) -> Option<f64> {
        Some((90.0 - self.heading_deg).to_radians())
    }

    fn legend_text(&self) -> Option<String> {
        Some(format!("{:.1}cm/s", self.speed_cm_s))
    }
}

impl Visual for SstData {
    fn normalized(&self, style: &VariableStyle) -> f64 {
        (self.celsius - style.min) / (style.max - style.min)
    }

    fn legend_text(&self) -> Option<String> {
        Some(format!("{:.1}\u{b0}C", self.celsius))
    }
}

impl Visual for WindData {
    fn normalized(&self, style: &VariableStyle) -> f64 {
        self.speed() / style.max
    }

    fn icon_angle(&self) -> Option<f64> {
        Some(self.heading_deg().to_radians())
    }

    fn legend_text(&self) -> Option<String> {
        None
    }
}

impl WindData {
    /// Speed used to pick the wind barb.
    pub fn speed_knots(&self) -> f64 {
        self.speed() * MS_TO_KNOT
    }
}

impl Visual for WavesData {
    fn normalized(&self, style: &VariableStyle) -> f64 {
        self.significant_height / style.max
    }

    fn icon_angle(&self) -> Option<f64> {
        Some(self.peak_direction.to_radians())
    }

    fn legend_text(&self) -> Option<String> {
        Some(format!("{:.1}m", self.significant_height))
    }
}

impl Visual for ChlorophyllData {
    fn normalized(&self, style: &VariableStyle) -> f64 {
        (self.mg_m3 - style.min) / (style.max - style.min)
    }

    fn legend_text(&self) -> Option<String> {
        Some(format!("{:.1}mg/m\u{b3}", self.mg_m3))
    }
}

/// One icon to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct VisualDatum<C, P> {
    pub position: ScreenPoint,
    /// `None` when the variable is drawn without the colour map.
    pub color: Option<C>,
    pub alpha: u8,
    pub rotation: Option<f64>,
    pub legend: Option<String>,
    pub stale: bool,
    pub timestamp: DateTimeUtc,
    pub payload: P,
}

/// Turns binned cells into icons. Stale cells get half the transparency.
pub fn render_cells<P, C, V, M>(
    cells: &[Cell<P>],
    style: &VariableStyle,
    transparency: u8,
    projection: &V,
    color_map: &M,
) -> Vec<VisualDatum<C, P>>
where
    P: Visual,
    V: Projection + ?Sized,
    M: ColorMap<C> + ?Sized,
{
    let map_rotation = projection.rotation();
    let show_legend = style.legend && projection.zoom_level() >= style.legend_from_zoom;
    cells
        .iter()
        .map(|cell| VisualDatum {
            position: cell.key.origin(),
            color: style
                .use_color_map
                .then(|| color_map.color_for(cell.payload.normalized(style))),
            alpha: if cell.stale {
                transparency / 2
            } else {
                transparency
            },
            rotation: cell.payload.icon_angle().map(|angle| angle - map_rotation),
            legend: if show_legend {
                cell.payload.legend_text()
            } else {
                None
            },
            stale: cell.stale,
            timestamp: cell.timestamp,
            payload: cell.payload.clone(),
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct Layer<C, P> {
    pub data: Vec<VisualDatum<C, P>>,
    pub stats: BinningStats,
}

/// Bins and renders one variable of a snapshot. Hidden variables give an
/// empty layer, an aborted pass gives `None`.
#[allow(clippy::too_many_arguments)]
pub fn render_layer<P, C, V, M>(
    tables: &EnvironmentTables,
    config: &Config,
    projection: &V,
    color_map: &M,
    now: DateTimeUtc,
    partitioning: Partitioning,
    abort: &AtomicBool,
) -> Result<Option<Layer<C, P>>>
where
    P: Visual + Stored,
    V: Projection + ?Sized,
    M: ColorMap<C> + ?Sized,
{
    let style = config.style(P::VARIABLE);
    if !style.visible {
        return Ok(Some(Layer {
            data: Vec::new(),
            stats: BinningStats::default(),
        }));
    }
    let params = BinningParams::from_config(config, P::VARIABLE, now, partitioning)?;
    let binning = match bin_table(tables.table::<P>(), projection, &params, abort) {
        BinningOutcome::Completed(binning) => binning,
        BinningOutcome::Aborted => return Ok(None),
    };
    let data = render_cells(
        &binning.cells,
        style,
        config.transparency,
        projection,
        color_map,
    );
    Ok(Some(Layer {
        data,
        stats: binning.stats,
    }))
}
