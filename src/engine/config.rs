// Copyright © 2024 Pathway

use std::num::NonZeroU32;

use log::warn;
use serde::{Deserialize, Serialize};

use super::reduce::ReductionPolicy;
use super::sample::Variable;
use super::time::Duration;
use super::{Error, Result};
use crate::env::{override_from_env, parse_env_flag, parse_env_var};

const RETENTION_HOURS_RANGE: (f64, f64) = (3.0, 120.0);
const RELOAD_MINUTES_RANGE: (u32, u32) = (1, 10);

pub const MS_TO_KNOT: f64 = 3600.0 / 1852.0;

/// Display settings of one variable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariableStyle {
    pub visible: bool,
    pub min: f64,
    pub max: f64,
    /// Icon radius in pixels, also the declutter cell size.
    pub icon_radius: u32,
    pub legend: bool,
    pub legend_from_zoom: u32,
    pub use_color_map: bool,
}

impl VariableStyle {
    fn new(min: f64, max: f64, icon_radius: u32) -> Self {
        Self {
            visible: true,
            min,
            max,
            icon_radius,
            legend: true,
            legend_from_zoom: 13,
            use_color_map: true,
        }
    }

    pub fn cell_size(&self) -> Option<NonZeroU32> {
        NonZeroU32::new(self.icon_radius)
    }

    fn validate(&mut self, variable: Variable) -> Result<()> {
        for (bound, value) in [("min", self.min), ("max", self.max)] {
            if !value.is_finite() {
                return Err(Error::NonFiniteBound {
                    name: format!("{variable} {bound}"),
                    value,
                });
            }
        }
        if self.icon_radius == 0 {
            return Err(Error::ZeroCellSize {
                variable: variable.name(),
            });
        }
        if variable != Variable::Sst && self.max <= 0.0 {
            warn!("{variable} max {} is not positive, using 1", self.max);
            self.max = 1.0;
        }
        if self.min >= self.max {
            let min = self.max - 10.0;
            warn!(
                "{variable} min {} is not below max {}, using {min}",
                self.min, self.max
            );
            self.min = min;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// `None` keeps everything ever loaded.
    pub retention_hours: Option<f64>,
    pub lookahead_hours: f64,
    pub freshness_hours: f64,
    pub policy: ReductionPolicy,
    pub ignore_date_limit: bool,
    pub transparency: u8,
    pub reload_interval_minutes: u32,
    pub refresh_period_seconds: u64,
    pub margin_px: f64,
    pub currents: VariableStyle,
    pub sst: VariableStyle,
    pub wind: VariableStyle,
    pub waves: VariableStyle,
    pub chlorophyll: VariableStyle,
}

impl Default for Config {
    fn default() -> Self {
        let mut wind = VariableStyle::new(0.0, 65.0 / MS_TO_KNOT, 20);
        wind.legend = false;
        Self {
            retention_hours: Some(12.0),
            lookahead_hours: 1.0,
            freshness_hours: 3.0,
            policy: ReductionPolicy::MostRecent,
            ignore_date_limit: false,
            transparency: 128,
            reload_interval_minutes: 5,
            refresh_period_seconds: 30,
            margin_px: 100.0,
            currents: VariableStyle::new(0.0, 200.0, 12),
            sst: VariableStyle::new(-10.0, 40.0, 8),
            wind,
            waves: VariableStyle::new(0.0, 7.0, 12),
            chlorophyll: VariableStyle::new(0.01, 60.0, 8),
        }
    }
}

fn check_hours(name: &'static str, hours: f64) -> Result<()> {
    if !hours.is_finite() {
        return Err(Error::NonFiniteDuration { name, hours });
    }
    if hours < 0.0 {
        return Err(Error::NegativeDuration { name, hours });
    }
    Ok(())
}

impl Config {
    pub fn style(&self, variable: Variable) -> &VariableStyle {
        match variable {
            Variable::Currents => &self.currents,
            Variable::Sst => &self.sst,
            Variable::Wind => &self.wind,
            Variable::Waves => &self.waves,
            Variable::Chlorophyll => &self.chlorophyll,
        }
    }

    pub fn style_mut(&mut self, variable: Variable) -> &mut VariableStyle {
        match variable {
            Variable::Currents => &mut self.currents,
            Variable::Sst => &mut self.sst,
            Variable::Wind => &mut self.wind,
            Variable::Waves => &mut self.waves,
            Variable::Chlorophyll => &mut self.chlorophyll,
        }
    }

    pub fn retention_window(&self) -> Option<Duration> {
        self.retention_hours.map(Duration::from_hours)
    }

    pub fn lookahead(&self) -> Duration {
        Duration::from_hours(self.lookahead_hours)
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_hours(self.freshness_hours)
    }

    pub fn reload_interval(&self) -> Duration {
        Duration::from_minutes(i64::from(self.reload_interval_minutes))
    }

    pub fn refresh_period(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.refresh_period_seconds.max(1))
    }

    /// Rejects settings that make the time windows inconsistent and clamps
    /// the recoverable ones into range.
    #[allow(clippy::float_cmp)]
    pub fn validate(mut self) -> Result<Self> {
        if let Some(hours) = self.retention_hours {
            check_hours("retention window", hours)?;
        }
        check_hours("lookahead", self.lookahead_hours)?;
        check_hours("freshness threshold", self.freshness_hours)?;
        if !self.margin_px.is_finite() || self.margin_px < 0.0 {
            return Err(Error::InvalidMargin(self.margin_px));
        }

        if let Some(hours) = self.retention_hours {
            let (low, high) = RETENTION_HOURS_RANGE;
            let clamped = hours.clamp(low, high);
            if clamped != hours {
                warn!("retention window of {hours}h is out of range, using {clamped}h");
                self.retention_hours = Some(clamped);
            }
        }
        let (low, high) = RELOAD_MINUTES_RANGE;
        let reload = self.reload_interval_minutes.clamp(low, high);
        if reload != self.reload_interval_minutes {
            warn!(
                "reload interval of {} minutes is out of range, using {reload}",
                self.reload_interval_minutes
            );
            self.reload_interval_minutes = reload;
        }

        for variable in Variable::ALL {
            self.style_mut(variable).validate(variable)?;
        }
        Ok(self)
    }

    /// Defaults overlaid with the `ENVDISP_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(hours) = parse_env_var("ENVDISP_RETENTION_HOURS")? {
            config.retention_hours = Some(hours);
        }
        if parse_env_flag("ENVDISP_RETENTION")? == Some(false) {
            config.retention_hours = None;
        }
        override_from_env(&mut config.lookahead_hours, "ENVDISP_LOOKAHEAD_HOURS")?;
        override_from_env(&mut config.freshness_hours, "ENVDISP_FRESHNESS_HOURS")?;
        override_from_env(&mut config.policy, "ENVDISP_REDUCTION")?;
        if let Some(flag) = parse_env_flag("ENVDISP_IGNORE_DATE_LIMIT")? {
            config.ignore_date_limit = flag;
        }
        override_from_env(&mut config.transparency, "ENVDISP_TRANSPARENCY")?;
        override_from_env(
            &mut config.reload_interval_minutes,
            "ENVDISP_RELOAD_MINUTES",
        )?;
        override_from_env(
            &mut config.refresh_period_seconds,
            "ENVDISP_REFRESH_SECONDS",
        )?;
        override_from_env(&mut config.margin_px, "ENVDISP_MARGIN_PX")?;
        config.validate()
    }
}
