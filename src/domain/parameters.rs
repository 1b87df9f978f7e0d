//! Named numeric strategy parameters and parameter grids.

use crate::domain::error::QuantError;
use serde::Serialize;
use std::collections::BTreeMap;

/// Mapping from parameter name to numeric value.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct StrategyParameters {
    values: BTreeMap<String, f64>,
}

impl StrategyParameters {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: f64) -> Self {
        self.insert(name, value);
        self
    }

    pub fn insert(&mut self, name: &str, value: f64) {
        self.values.insert(name.to_string(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> + '_ {
        self.values.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Fill in defaults for missing keys and reject keys the strategy does not accept.
    pub fn resolve(
        &self,
        strategy: &str,
        defaults: &[(&str, f64)],
    ) -> Result<StrategyParameters, QuantError> {
        if let Some((name, _)) = self
            .iter()
            .find(|(name, _)| !defaults.iter().any(|(known, _)| known == name))
        {
            return Err(QuantError::UnknownParameter {
                strategy: strategy.to_string(),
                name: name.to_string(),
            });
        }

        let mut resolved = StrategyParameters::new();
        for &(name, default) in defaults {
            let value = self.get(name).unwrap_or(default);
            if !value.is_finite() {
                return Err(QuantError::invalid_parameter(strategy, name, "must be finite"));
            }
            resolved.insert(name, value);
        }
        Ok(resolved)
    }

    /// Read a whole-number window length that must exceed `minimum_exclusive`.
    pub fn lookback(
        &self,
        strategy: &str,
        name: &str,
        minimum_exclusive: usize,
    ) -> Result<usize, QuantError> {
        let value = self
            .get(name)
            .ok_or_else(|| QuantError::invalid_parameter(strategy, name, "missing"))?;
        if value.fract() != 0.0 {
            return Err(QuantError::invalid_parameter(strategy, name, "must be a whole number"));
        }
        if value >= usize::MAX as f64 {
            return Err(QuantError::invalid_parameter(strategy, name, "is too large"));
        }
        if value <= minimum_exclusive as f64 {
            return Err(QuantError::invalid_parameter(
                strategy,
                name,
                format!("{name} must be greater than {minimum_exclusive}"),
            ));
        }
        Ok(value as usize)
    }
}

impl<const N: usize> From<[(&str, f64); N]> for StrategyParameters {
    fn from(pairs: [(&str, f64); N]) -> Self {
        let mut params = StrategyParameters::new();
        for (name, value) in pairs {
            params.insert(name, value);
        }
        params
    }
}

/// Candidate values per parameter, iterated in insertion order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<(String, Vec<f64>)>,
}

impl ParameterGrid {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an axis. Re-adding a name replaces its candidates in place.
    pub fn axis(mut self, name: &str, values: impl IntoIterator<Item = f64>) -> Self {
        let values: Vec<f64> = values.into_iter().collect();
        match self.axes.iter_mut().find(|(existing, _)| existing == name) {
            Some((_, slot)) => *slot = values,
            None => self.axes.push((name.to_string(), values)),
        }
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.axes.iter().map(|(name, _)| name.as_str())
    }

    /// Number of combinations in the Cartesian product.
    pub fn size(&self) -> usize {
        self.axes.iter().map(|(_, values)| values.len()).product()
    }

    /// Cartesian product of all axes. The last axis varies fastest.
    ///
    /// An empty grid yields a single empty combination; an axis without
    /// candidates yields none.
    pub fn combinations(&self) -> Vec<StrategyParameters> {
        let total = self.size();
        let mut out = Vec::with_capacity(total);
        let mut indices = vec![0usize; self.axes.len()];

        for _ in 0..total {
            let mut params = StrategyParameters::new();
            for ((name, values), &idx) in self.axes.iter().zip(&indices) {
                params.insert(name, values[idx]);
            }
            out.push(params);

            for pos in (0..indices.len()).rev() {
                indices[pos] += 1;
                if indices[pos] < self.axes[pos].1.len() {
                    break;
                }
                indices[pos] = 0;
            }
        }
        out
    }
}
