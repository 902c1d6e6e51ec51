use std::fmt;

use serde::{Deserialize, Serialize};

use crate::layout_engine::Orientation;

/// Which axis a resize command acts on.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, strum::Display, strum::EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ResizeDimension {
    Width,
    Height,
    /// Whatever axis the window's own parent splits along.
    #[default]
    Smart,
}

impl ResizeDimension {
    pub fn orientation(self) -> Option<Orientation> {
        match self {
            ResizeDimension::Width => Some(Orientation::Horizontal),
            ResizeDimension::Height => Some(Orientation::Vertical),
            ResizeDimension::Smart => None,
        }
    }
}

/// A resize amount given as pixels (`"+50"`, `"-20"`) or as a percentage of
/// the parent container's extent (`"+10%"`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(try_from = "String", into = "String")]
pub enum ResizeValue {
    Pixels(f64),
    Percent(f64),
}

impl ResizeValue {
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        let value = if let Some(num_str) = trimmed.strip_suffix('%') {
            let pct: f64 = num_str.trim().parse().ok()?;
            Self::Percent(pct / 100.0)
        } else {
            let px: f64 = trimmed.parse().ok()?;
            Self::Pixels(px)
        };
        value.is_finite().then_some(value)
    }

    fn is_finite(&self) -> bool {
        match *self {
            ResizeValue::Pixels(v) | ResizeValue::Percent(v) => v.is_finite(),
        }
    }

    /// Converts to a fraction of a parent whose extent along the resize axis
    /// is `extent` pixels.
    pub fn fraction_of(&self, extent: f64) -> f64 {
        match *self {
            ResizeValue::Percent(pct) => pct,
            ResizeValue::Pixels(_) if extent <= 0.0 => 0.0,
            ResizeValue::Pixels(px) => px / extent,
        }
    }
}

impl fmt::Display for ResizeValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ResizeValue::Pixels(px) => write!(f, "{px:+}"),
            ResizeValue::Percent(pct) => write!(f, "{:+}%", pct * 100.0),
        }
    }
}

impl TryFrom<String> for ResizeValue {
    type Error = String;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw).ok_or_else(|| format!("invalid resize amount {raw:?}"))
    }
}

impl From<ResizeValue> for String {
    fn from(value: ResizeValue) -> String { value.to_string() }
}
