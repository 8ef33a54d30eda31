//! Ground-Truth Aggregation
//!
//! Exact per-station min/mean/max in double precision. The mean is a plain
//! left-to-right sum divided by the count; consumers compare against it with
//! a tolerance, never for bit equality.

use crate::MeasurementGroup;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Min/mean/max for one station
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationAggregate {
    /// Station name
    pub key: String,
    /// Smallest reading
    pub min: f64,
    /// Arithmetic mean
    pub mean: f64,
    /// Largest reading
    pub max: f64,
}

impl StationAggregate {
    /// Create an aggregate from already-computed values
    pub fn new(key: impl Into<String>, min: f64, mean: f64, max: f64) -> Self {
        Self {
            key: key.into(),
            min,
            mean,
            max,
        }
    }

    /// Aggregate a reading sequence. Returns `None` for an empty sequence.
    pub fn from_readings(key: impl Into<String>, readings: &[f64]) -> Option<Self> {
        let (&first, rest) = readings.split_first()?;

        let mut min = first;
        let mut max = first;
        let mut sum = first;
        for &value in rest {
            min = min.min(value);
            max = max.max(value);
            sum += value;
        }

        // Rounding in the sum can push the mean one ulp past an extreme
        let mean = (sum / readings.len() as f64).clamp(min, max);

        Some(Self::new(key, min, mean, max))
    }

    /// `min <= mean <= max`
    pub fn is_ordered(&self) -> bool {
        self.min <= self.mean && self.mean <= self.max
    }

    /// `max - min`
    pub fn range(&self) -> f64 {
        self.max - self.min
    }
}

/// Reference aggregates for every station of a [`MeasurementGroup`]
#[derive(Debug, Clone, Default)]
pub struct GroundTruth {
    aggregates: BTreeMap<String, StationAggregate>,
}

impl GroundTruth {
    /// Aggregate every station of the group
    pub fn compute(group: &MeasurementGroup) -> Self {
        let aggregates = group
            .iter()
            .filter_map(|(station, readings)| {
                StationAggregate::from_readings(station, readings)
                    .map(|agg| (station.to_string(), agg))
            })
            .collect();
        Self { aggregates }
    }

    /// Aggregate for one station
    pub fn get(&self, station: &str) -> Option<&StationAggregate> {
        self.aggregates.get(station)
    }

    /// Whether the station is known
    pub fn contains(&self, station: &str) -> bool {
        self.aggregates.contains_key(station)
    }

    /// Aggregates in ascending station order
    pub fn iter(&self) -> impl Iterator<Item = &StationAggregate> {
        self.aggregates.values()
    }

    /// Number of stations
    pub fn len(&self) -> usize {
        self.aggregates.len()
    }

    /// Whether there are no stations
    pub fn is_empty(&self) -> bool {
        self.aggregates.is_empty()
    }
}
