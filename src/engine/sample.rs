// Copyright © 2024 Pathway

//! Measurements and their per-variable payloads.
//!
//! Every variable is a small `Copy`-free struct implementing [`Payload`], which
//! exposes its numeric fields as a flat vector. The temporal reducers and the
//! screen-space binning only ever work on that vector, so the five variables
//! share a single implementation of both.

use std::fmt::{self, Debug, Display};
use std::hash::{Hash, Hasher};

use itertools::Itertools;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use super::time::DateTimeUtc;

/// Numeric fields of a payload, in a fixed per-variable order.
pub type Fields = SmallVec<[f64; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Variable {
    Currents,
    Sst,
    Wind,
    Waves,
    Chlorophyll,
}

impl Variable {
    pub const ALL: [Variable; 5] = [
        Variable::Currents,
        Variable::Sst,
        Variable::Wind,
        Variable::Waves,
        Variable::Chlorophyll,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Self::Currents => "currents",
            Self::Sst => "sst",
            Self::Wind => "wind",
            Self::Waves => "waves",
            Self::Chlorophyll => "chlorophyll",
        }
    }

    /// Fields a source must provide for this variable, coordinates and time included.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            Self::Currents => &["lat", "lon", "time", "speed", "heading"],
            Self::Sst => &["lat", "lon", "time", "sst"],
            Self::Wind => &["lat", "lon", "time", "u", "v"],
            Self::Waves => &["lat", "lon", "time", "hs", "tp", "pdir"],
            Self::Chlorophyll => &["lat", "lon", "time", "chlorophyll"],
        }
    }
}

impl Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub trait Payload: Clone + Debug + PartialEq + Send + Sync + 'static {
    const VARIABLE: Variable;

    fn fields(&self) -> Fields;

    /// Returns a copy with the numeric fields replaced, keeping everything else.
    /// Fields missing from a short slice become NaN.
    #[must_use]
    fn with_fields(&self, fields: &[f64]) -> Self;

    /// Same payload with every numeric field set to NaN.
    #[must_use]
    fn undefined(&self) -> Self {
        let fields = Fields::from_elem(f64::NAN, self.fields().len());
        self.with_fields(&fields)
    }

    fn is_defined(&self) -> bool {
        self.fields().iter().all(|value| value.is_finite())
    }

    /// Unweighted pairwise average of the numeric fields.
    ///
    /// Applied repeatedly this is not a running mean: the result depends on the
    /// order in which contributions are blended.
    #[must_use]
    fn blend(&self, other: &Self) -> Self {
        let fields: Fields = self
            .fields()
            .iter()
            .zip(other.fields().iter())
            .map(|(a, b)| (a + b) / 2.0)
            .collect();
        self.with_fields(&fields)
    }
}

fn field(fields: &[f64], index: usize) -> f64 {
    fields.get(index).copied().unwrap_or(f64::NAN)
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CurrentData {
    pub speed_cm_s: f64,
    pub heading_deg: f64,
    pub resolution_km: f64,
    pub info: String,
}

impl CurrentData {
    pub fn new(speed_cm_s: f64, heading_deg: f64) -> Self {
        Self {
            speed_cm_s,
            heading_deg,
            resolution_km: 0.0,
            info: String::new(),
        }
    }

    #[must_use]
    pub fn with_resolution(mut self, resolution_km: f64) -> Self {
        self.resolution_km = resolution_km;
        self
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }
}

impl Payload for CurrentData {
    const VARIABLE: Variable = Variable::Currents;

    fn fields(&self) -> Fields {
        smallvec::smallvec![self.speed_cm_s, self.heading_deg, self.resolution_km]
    }

    fn with_fields(&self, fields: &[f64]) -> Self {
        Self {
            speed_cm_s: field(fields, 0),
            heading_deg: field(fields, 1),
            resolution_km: field(fields, 2),
            info: self.info.clone(),
        }
    }

    fn blend(&self, other: &Self) -> Self {
        Self {
            speed_cm_s: (self.speed_cm_s + other.speed_cm_s) / 2.0,
            heading_deg: (self.heading_deg + other.heading_deg) / 2.0,
            resolution_km: (self.resolution_km + other.resolution_km) / 2.0,
            info: merge_info(&self.info, &other.info),
        }
    }
}

/// Joins two comma separated lists keeping the distinct entries in order.
pub fn merge_info(first: &str, second: &str) -> String {
    if first.is_empty() {
        return second.to_string();
    }
    if second.is_empty() || first.eq_ignore_ascii_case(second) {
        return first.to_string();
    }
    first
        .split(',')
        .chain(second.split(','))
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .unique()
        .join(", ")
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SstData {
    pub celsius: f64,
}

impl SstData {
    pub fn new(celsius: f64) -> Self {
        Self { celsius }
    }
}

impl Payload for SstData {
    const VARIABLE: Variable = Variable::Sst;

    fn fields(&self) -> Fields {
        smallvec::smallvec![self.celsius]
    }

    fn with_fields(&self, fields: &[f64]) -> Self {
        Self { celsius: field(fields, 0) }
    }
}

/// Wind vector in m/s, `u` eastwards and `v` northwards.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WindData {
    pub u: f64,
    pub v: f64,
}

impl WindData {
    pub fn new(u: f64, v: f64) -> Self {
        Self { u, v }
    }

    /// Heading is measured the same way [`WindData::heading_deg`] reports it.
    pub fn from_speed_heading(speed: f64, heading_deg: f64) -> Self {
        let radians = heading_deg.to_radians();
        Self {
            u: speed * radians.cos(),
            v: speed * radians.sin(),
        }
    }

    pub fn speed(&self) -> f64 {
        self.u.hypot(self.v)
    }

    /// Angle of the vector in degrees, normalised to `[0, 360)`.
    pub fn heading_deg(&self) -> f64 {
        normalize_degrees(self.v.atan2(self.u).to_degrees())
    }
}

impl Payload for WindData {
    const VARIABLE: Variable = Variable::Wind;

    fn fields(&self) -> Fields {
        smallvec::smallvec![self.u, self.v]
    }

    fn with_fields(&self, fields: &[f64]) -> Self {
        Self {
            u: field(fields, 0),
            v: field(fields, 1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WavesData {
    pub significant_height: f64,
    pub peak_period: f64,
    pub peak_direction: f64,
}

impl WavesData {
    pub fn new(significant_height: f64, peak_period: f64, peak_direction: f64) -> Self {
        Self {
            significant_height,
            peak_period,
            peak_direction,
        }
    }
}

impl Payload for WavesData {
    const VARIABLE: Variable = Variable::Waves;

    fn fields(&self) -> Fields {
        smallvec::smallvec![self.significant_height, self.peak_period, self.peak_direction]
    }

    fn with_fields(&self, fields: &[f64]) -> Self {
        Self {
            significant_height: field(fields, 0),
            peak_period: field(fields, 1),
            peak_direction: field(fields, 2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ChlorophyllData {
    pub mg_m3: f64,
}

impl ChlorophyllData {
    pub fn new(mg_m3: f64) -> Self {
        Self { mg_m3 }
    }
}

impl Payload for ChlorophyllData {
    const VARIABLE: Variable = Variable::Chlorophyll;

    fn fields(&self) -> Fields {
        smallvec::smallvec![self.mg_m3]
    }

    fn with_fields(&self, fields: &[f64]) -> Self {
        Self { mg_m3: field(fields, 0) }
    }
}

/// Payload of any variable, as produced by loaders.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum VariantData {
    Current(CurrentData),
    Sst(SstData),
    Wind(WindData),
    Waves(WavesData),
    Chlorophyll(ChlorophyllData),
}

impl VariantData {
    pub fn variable(&self) -> Variable {
        match self {
            Self::Current(_) => Variable::Currents,
            Self::Sst(_) => Variable::Sst,
            Self::Wind(_) => Variable::Wind,
            Self::Waves(_) => Variable::Waves,
            Self::Chlorophyll(_) => Variable::Chlorophyll,
        }
    }

    pub fn fields(&self) -> Fields {
        match self {
            Self::Current(data) => data.fields(),
            Self::Sst(data) => data.fields(),
            Self::Wind(data) => data.fields(),
            Self::Waves(data) => data.fields(),
            Self::Chlorophyll(data) => data.fields(),
        }
    }
}

impl From<CurrentData> for VariantData {
    fn from(data: CurrentData) -> Self {
        Self::Current(data)
    }
}

impl From<SstData> for VariantData {
    fn from(data: SstData) -> Self {
        Self::Sst(data)
    }
}

impl From<WindData> for VariantData {
    fn from(data: WindData) -> Self {
        Self::Wind(data)
    }
}

impl From<WavesData> for VariantData {
    fn from(data: WavesData) -> Self {
        Self::Waves(data)
    }
}

impl From<ChlorophyllData> for VariantData {
    fn from(data: ChlorophyllData) -> Self {
        Self::Chlorophyll(data)
    }
}

/// Exact-coordinate identity of a location. No rounding is applied, so only
/// bit-identical coordinates collide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LocationKey {
    latitude_bits: u64,
    longitude_bits: u64,
}

impl LocationKey {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude_bits: latitude.to_bits(),
            longitude_bits: longitude.to_bits(),
        }
    }

    pub fn latitude(&self) -> f64 {
        f64::from_bits(self.latitude_bits)
    }

    pub fn longitude(&self) -> f64 {
        f64::from_bits(self.longitude_bits)
    }
}

impl Display for LocationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.latitude(), self.longitude())
    }
}

/// One measurement of one variable at one instant and location.
///
/// Equality and hashing only look at the coordinates: two samples at the same
/// place are the same entity for table keying, whatever their time or value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sample<P> {
    pub latitude: f64,
    pub longitude: f64,
    pub timestamp: DateTimeUtc,
    pub payload: P,
}

impl<P> Sample<P> {
    pub fn new(latitude: f64, longitude: f64, timestamp: DateTimeUtc, payload: P) -> Self {
        Self {
            latitude,
            longitude,
            timestamp,
            payload,
        }
    }

    pub fn location_key(&self) -> LocationKey {
        LocationKey::new(self.latitude, self.longitude)
    }

    pub fn with_payload<Q>(&self, payload: Q) -> Sample<Q> {
        Sample {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: self.timestamp,
            payload,
        }
    }

    pub fn has_finite_coordinates(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

impl<P: Payload> Sample<P> {
    /// Representative for a location whose history has nothing usable.
    #[must_use]
    pub fn no_valid_data(&self) -> Self {
        Self {
            latitude: self.latitude,
            longitude: self.longitude,
            timestamp: DateTimeUtc::EPOCH,
            payload: self.payload.undefined(),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.has_finite_coordinates() && self.payload.is_defined()
    }
}

impl<P> PartialEq for Sample<P> {
    fn eq(&self, other: &Self) -> bool {
        self.location_key() == other.location_key()
    }
}

impl<P> Eq for Sample<P> {}

impl<P> Hash for Sample<P> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.location_key().hash(state);
    }
}

pub fn normalize_degrees(angle: f64) -> f64 {
    let normalized = angle.rem_euclid(360.0);
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}
