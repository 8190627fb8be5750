//! Epoch resolution: time-scale detection and JD/MJD/ISO parsing
//!
//! Everything downstream works in Julian Date on the TDB scale; this module is
//! the single place where user-facing epochs are turned into that.

use std::fmt;
use std::str::FromStr;

use hifitime::{Duration, Epoch};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{DAYS_PER_JULIAN_CENTURY, J2000_JD, MJD_OFFSET};

/// TT - TAI, fixed by definition
const TT_MINUS_TAI_SECONDS: f64 = 32.184;

/// A bare number above this is read as a JD rather than an MJD
const JD_DETECTION_THRESHOLD: f64 = 1.0e6;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum EpochError {
    #[error("Cannot parse epoch: {0}")]
    Unparseable(String),
    #[error("Unknown time scale: {0}")]
    UnknownScale(String),
    #[error("Unknown time format: {0}")]
    UnknownFormat(String),
    #[error("Epoch is not finite: {0}")]
    NotFinite(f64),
}

/// Time scales accepted for user epochs
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Timescale {
    Utc,
    Tai,
    Tt,
    Tdb,
}

impl Timescale {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Utc => "UTC",
            Self::Tai => "TAI",
            Self::Tt => "TT",
            Self::Tdb => "TDB",
        }
    }

    /// TDB Julian Date of the instant whose Julian Date on this scale is `jd`
    pub fn jd_tdb(&self, jd: f64) -> Result<f64, EpochError> {
        match self {
            Self::Tdb if jd.is_finite() => Ok(jd),
            _ => self.epoch_from_jd(jd).map(jd_tdb),
        }
    }

    /// Epoch whose Julian Date on this scale is `jd`
    pub fn epoch_from_jd(&self, jd: f64) -> Result<Epoch, EpochError> {
        if !jd.is_finite() {
            return Err(EpochError::NotFinite(jd));
        }
        Ok(match self {
            Self::Utc => Epoch::from_jde_utc(jd),
            Self::Tai => Epoch::from_jde_tai(jd),
            Self::Tt => Epoch::from_jde_tai(jd) - Duration::from_seconds(TT_MINUS_TAI_SECONDS),
            Self::Tdb => Epoch::from_jde_tdb(jd),
        })
    }
}

impl FromStr for Timescale {
    type Err = EpochError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "utc" => Ok(Self::Utc),
            "tai" => Ok(Self::Tai),
            "tt" => Ok(Self::Tt),
            "tdb" => Ok(Self::Tdb),
            other => Err(EpochError::UnknownScale(other.to_string())),
        }
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Numeric epoch formats
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFormat {
    Jd,
    Mjd,
}

impl TimeFormat {
    /// Convert a value in this format to a Julian Date
    pub fn to_jd(&self, value: f64) -> f64 {
        match self {
            Self::Jd => value,
            Self::Mjd => value + MJD_OFFSET,
        }
    }
}

impl FromStr for TimeFormat {
    type Err = EpochError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "jd" => Ok(Self::Jd),
            "mjd" => Ok(Self::Mjd),
            other => Err(EpochError::UnknownFormat(other.to_string())),
        }
    }
}

/// An epoch as supplied by a caller, resolved against a declared scale/format
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum EpochSpec {
    Value(f64),
    Text(String),
    #[serde(skip)]
    Epoch(Epoch),
    /// Julian Date on the TDB scale, whatever the declared units
    #[serde(skip)]
    JdTdb(f64),
}

impl EpochSpec {
    /// Julian Date (TDB), using `scale` when the text does not name one and
    /// `format` for bare numeric values.
    pub fn resolve_jd(&self, scale: Timescale, format: TimeFormat) -> Result<f64, EpochError> {
        match self {
            Self::Epoch(epoch) => Ok(jd_tdb(*epoch)),
            Self::JdTdb(jd) => Timescale::Tdb.jd_tdb(*jd),
            Self::Value(value) => scale.jd_tdb(format.to_jd(*value)),
            Self::Text(text) => detect_jd(text, scale),
        }
    }
}

impl From<f64> for EpochSpec {
    fn from(value: f64) -> Self {
        Self::Value(value)
    }
}

impl From<&str> for EpochSpec {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for EpochSpec {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<Epoch> for EpochSpec {
    fn from(epoch: Epoch) -> Self {
        Self::Epoch(epoch)
    }
}

/// Parse a textual epoch to a Julian Date (TDB), detecting its time scale
/// and format.
///
/// Accepted shapes:
/// - `"2459000.5"` (JD), `"59000.0"` (MJD), picked by magnitude
/// - `"JD 2459000.5 TDB"`, `"MJD 59000 UTC"`
/// - `"2020-05-31T00:00:00 TT"`, `"2020-05-31"`
///
/// A trailing scale token wins over `default_scale`.
pub fn detect_jd(text: &str, default_scale: Timescale) -> Result<f64, EpochError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(EpochError::Unparseable(text.to_string()));
    }

    let (body, scale) = match trimmed.rsplit_once(char::is_whitespace) {
        Some((head, tail)) => match tail.parse::<Timescale>() {
            Ok(scale) => (head.trim(), scale),
            Err(_) => (trimmed, default_scale),
        },
        None => (trimmed, default_scale),
    };

    let upper = body.to_ascii_uppercase();
    if let Some(rest) = upper.strip_prefix("MJD") {
        let value = parse_number(rest, text)?;
        return scale.jd_tdb(TimeFormat::Mjd.to_jd(value));
    }
    if let Some(rest) = upper.strip_prefix("JD") {
        let value = parse_number(rest, text)?;
        return scale.jd_tdb(value);
    }

    if let Ok(value) = body.parse::<f64>() {
        let format = if value > JD_DETECTION_THRESHOLD { TimeFormat::Jd } else { TimeFormat::Mjd };
        return scale.jd_tdb(format.to_jd(value));
    }

    let calendar = if body.contains('T') || body.contains(' ') {
        body.to_string()
    } else {
        format!("{body}T00:00:00")
    };
    Epoch::from_str(&format!("{calendar} {}", scale.name()))
        .map(jd_tdb)
        .map_err(|_| EpochError::Unparseable(text.to_string()))
}

fn parse_number(s: &str, original: &str) -> Result<f64, EpochError> {
    s.trim()
        .parse::<f64>()
        .map_err(|_| EpochError::Unparseable(original.to_string()))
}

/// Julian Date on the TDB scale
pub fn jd_tdb(epoch: Epoch) -> f64 {
    epoch.to_jde_tdb_days()
}

/// Epoch for a TDB Julian Date. Only for handing instants to hifitime
/// consumers; reading the JD back from it is not exact.
pub fn epoch_from_jd_tdb(jd: f64) -> Epoch {
    Epoch::from_jde_tdb(jd)
}

/// Julian centuries (TDB) from J2000
pub fn jd_to_jc(jd: f64) -> f64 {
    (jd - J2000_JD) / DAYS_PER_JULIAN_CENTURY
}
