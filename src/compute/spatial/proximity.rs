//! Spatiotemporal proximity detection.
//!
//! Finds every ordered pair of events `(e1, e2)` with `e1.time < e2.time`,
//! `e2.time - e1.time <= max_gap` and a great-circle distance of at most
//! `max_distance_km`. Both thresholds are inclusive.
//!
//! Events are sorted by time and swept once. Each incoming event is compared
//! only against the events of its trailing time window, so the work is
//! bounded by the window sizes rather than by `n²`:
//!
//! - [`ProximityIndex::LinearWindow`] compares against every window member.
//! - [`ProximityIndex::SpatialWindow`] keeps the window in an R*-tree and
//!   compares only against members inside the distance envelope, which keeps
//!   the sweep fast when many events share a time window but are spread out
//!   in space.
//!
//! Both strategies produce identical pairs in identical order.

use super::distance::{haversine_km, to_cartesian};
use super::window_index::{WindowIndex, WindowPoint};
use crate::compute::validation::validate_coordinates;
use crate::config::{ProximityConfig, ProximityIndex};
use crate::error::{QueryError, Result};
use crate::result::ResultTable;
use crate::table::{RecordTable, Value};
use chrono::{DateTime, TimeDelta, Utc};

/// Columns of the result table produced by [`ProximityDetector::detect_table`].
pub const PAIR_COLUMNS: [&str; 5] = ["eq1", "eq2", "t1", "t2", "distance_km"];

/// Columns the detector reads.
pub const SOURCE_COLUMNS: [&str; 4] = ["id", "time", "latitude", "longitude"];

/// Two events close in space and time. `first` is the earlier one.
#[derive(Debug, Clone, PartialEq)]
pub struct ProximityPair {
    pub first: String,
    pub second: String,
    pub first_time: DateTime<Utc>,
    pub second_time: DateTime<Utc>,
    pub distance_km: f64,
}

impl ProximityPair {
    pub fn gap(&self) -> TimeDelta {
        self.second_time - self.first_time
    }
}

/// An event eligible for pairing.
#[derive(Debug, Clone)]
struct Sighting<'a> {
    row: usize,
    id: &'a str,
    time: DateTime<Utc>,
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Clone)]
pub struct ProximityDetector {
    config: ProximityConfig,
    max_gap: TimeDelta,
}

impl ProximityDetector {
    pub fn new(config: ProximityConfig) -> Result<Self> {
        config.validate().map_err(QueryError::InvalidInput)?;
        // Saturates for gaps beyond the representable range.
        let micros = (config.max_gap_minutes * 60.0 * 1_000_000.0).round() as i64;
        Ok(Self {
            config,
            max_gap: TimeDelta::microseconds(micros),
        })
    }

    pub fn config(&self) -> &ProximityConfig {
        &self.config
    }

    /// All qualifying pairs, ordered by the earlier event's time, then the
    /// later event's time; equal times keep table row order.
    pub fn detect(&self, table: &RecordTable) -> Result<Vec<ProximityPair>> {
        table.require(&SOURCE_COLUMNS)?;
        let sightings = sightings(table)?;

        let (slots, comparisons) = match self.config.index {
            ProximityIndex::LinearWindow => self.linear_sweep(&sightings),
            ProximityIndex::SpatialWindow => self.spatial_sweep(&sightings),
        };

        log::debug!(
            "proximity {:?}: {} events, {} comparisons, {} pairs",
            self.config.index,
            sightings.len(),
            comparisons,
            slots.len()
        );

        Ok(slots
            .into_iter()
            .map(|(i, j, distance_km)| ProximityPair {
                first: sightings[i].id.to_string(),
                second: sightings[j].id.to_string(),
                first_time: sightings[i].time,
                second_time: sightings[j].time,
                distance_km,
            })
            .collect())
    }

    /// Pairs as a result table with columns `eq1, eq2, t1, t2, distance_km`.
    pub fn detect_table(&self, table: &RecordTable) -> Result<ResultTable> {
        let mut result = ResultTable::new(PAIR_COLUMNS.iter().map(|c| c.to_string()).collect());
        for pair in self.detect(table)? {
            result.push_row(vec![
                Value::Text(pair.first),
                Value::Text(pair.second),
                Value::Time(pair.first_time),
                Value::Time(pair.second_time),
                Value::float(pair.distance_km),
            ]);
        }
        Ok(result)
    }

    fn within_gap(&self, earlier: &Sighting<'_>, later: &Sighting<'_>) -> bool {
        later.time - earlier.time <= self.max_gap
    }

    fn distance_between(&self, a: &Sighting<'_>, b: &Sighting<'_>) -> Option<f64> {
        let d = haversine_km(a.latitude, a.longitude, b.latitude, b.longitude);
        (d <= self.config.max_distance_km).then_some(d)
    }

    /// Forward scan: each event against the later events still inside its
    /// gap. Emits pairs already in `(i, j)` order.
    fn linear_sweep(&self, events: &[Sighting<'_>]) -> (Vec<(usize, usize, f64)>, usize) {
        let mut pairs = Vec::new();
        let mut comparisons = 0;

        for (i, earlier) in events.iter().enumerate() {
            for (j, later) in events.iter().enumerate().skip(i + 1) {
                if !self.within_gap(earlier, later) {
                    break;
                }
                if later.time == earlier.time {
                    continue;
                }
                comparisons += 1;
                if let Some(d) = self.distance_between(earlier, later) {
                    pairs.push((i, j, d));
                }
            }
        }

        (pairs, comparisons)
    }

    /// Trailing window held in an R*-tree; each incoming event queries the
    /// window for spatial candidates before it joins the window.
    fn spatial_sweep(&self, events: &[Sighting<'_>]) -> (Vec<(usize, usize, f64)>, usize) {
        let points: Vec<WindowPoint> = events
            .iter()
            .enumerate()
            .map(|(slot, e)| WindowPoint::new(to_cartesian(e.latitude, e.longitude), slot))
            .collect();

        let mut window = WindowIndex::new();
        let mut oldest = 0;
        let mut pairs = Vec::new();
        let mut comparisons = 0;

        for (j, later) in events.iter().enumerate() {
            while oldest < j && !self.within_gap(&events[oldest], later) {
                window.remove(&points[oldest]);
                oldest += 1;
            }

            for i in window.candidates(points[j].xyz, self.config.max_distance_km) {
                let earlier = &events[i];
                if earlier.time == later.time {
                    continue;
                }
                comparisons += 1;
                if let Some(d) = self.distance_between(earlier, later) {
                    pairs.push((i, j, d));
                }
            }

            window.insert(points[j]);
        }

        pairs.sort_unstable_by_key(|&(i, j, _)| (i, j));
        (pairs, comparisons)
    }
}

/// Rows with an id, a time and valid coordinates, sorted by time with row
/// order breaking ties.
fn sightings(table: &RecordTable) -> Result<Vec<Sighting<'_>>> {
    let ids = table.ids()?;
    let times = table.times("time")?;
    let latitudes = table.floats("latitude")?;
    let longitudes = table.floats("longitude")?;

    let mut out = Vec::with_capacity(table.len());
    let mut invalid = 0usize;

    for row in 0..table.len() {
        let (Some(id), Some(time), Some(latitude), Some(longitude)) = (
            ids[row].as_deref(),
            times[row],
            latitudes[row],
            longitudes[row],
        ) else {
            continue;
        };
        if validate_coordinates(latitude, longitude).is_err() {
            invalid += 1;
            continue;
        }
        out.push(Sighting {
            row,
            id,
            time,
            latitude,
            longitude,
        });
    }

    if invalid > 0 {
        log::warn!(
            "Skipped {} events with out-of-range coordinates in proximity scan",
            invalid
        );
    }

    out.sort_by_key(|s| (s.time, s.row));
    Ok(out)
}
