//! Price and signal series value types.

use crate::domain::error::QuantError;
use serde::{Serialize, Serializer};

/// Ordered prices indexed by time step. Never empty.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    prices: Vec<f64>,
}

impl PriceSeries {
    pub fn new(prices: Vec<f64>) -> Result<Self, QuantError> {
        if prices.is_empty() {
            return Err(QuantError::EmptySeries);
        }
        Ok(Self { prices })
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.prices
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    /// Always false; kept for the `len`/`is_empty` convention.
    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

impl TryFrom<Vec<f64>> for PriceSeries {
    type Error = QuantError;

    fn try_from(prices: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(prices)
    }
}

/// Two index-aligned price series of equal length.
#[derive(Debug, Clone, PartialEq)]
pub struct PairSeries {
    asset_a: PriceSeries,
    asset_b: PriceSeries,
}

impl PairSeries {
    pub fn new(asset_a: PriceSeries, asset_b: PriceSeries) -> Result<Self, QuantError> {
        if asset_a.len() != asset_b.len() {
            return Err(QuantError::SeriesLengthMismatch {
                left: asset_a.len(),
                right: asset_b.len(),
            });
        }
        Ok(Self { asset_a, asset_b })
    }

    pub fn from_vecs(asset_a: Vec<f64>, asset_b: Vec<f64>) -> Result<Self, QuantError> {
        Self::new(PriceSeries::new(asset_a)?, PriceSeries::new(asset_b)?)
    }

    pub fn asset_a(&self) -> &[f64] {
        self.asset_a.as_slice()
    }

    pub fn asset_b(&self) -> &[f64] {
        self.asset_b.as_slice()
    }

    pub fn len(&self) -> usize {
        self.asset_a.len()
    }

    pub fn is_empty(&self) -> bool {
        self.asset_a.is_empty()
    }
}

/// Position held going into the next price move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn as_f64(self) -> f64 {
        match self {
            Position::Short => -1.0,
            Position::Flat => 0.0,
            Position::Long => 1.0,
        }
    }
}

impl Serialize for Position {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_f64())
    }
}

/// Simultaneous positions in both legs of a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PairPosition {
    pub a: Position,
    pub b: Position,
}

impl PairPosition {
    pub const FLAT: PairPosition = PairPosition {
        a: Position::Flat,
        b: Position::Flat,
    };

    pub fn new(a: Position, b: Position) -> Self {
        Self { a, b }
    }
}

impl Serialize for PairPosition {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        (self.a, self.b).serialize(serializer)
    }
}

/// Signals produced by a strategy run, one per time step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum SignalSeries {
    Single(Vec<Position>),
    Pair(Vec<PairPosition>),
}

impl SignalSeries {
    pub fn len(&self) -> usize {
        match self {
            SignalSeries::Single(s) => s.len(),
            SignalSeries::Pair(s) => s.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
