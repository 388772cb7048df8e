//! Engine configuration.
use crate::compute::validation::validate_threshold;
use serde::de::Error;

/// Candidate search used by the proximity detector inside its time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProximityIndex {
    /// Window members live in an R*-tree; candidates are pruned by envelope
    /// before the exact distance check.
    #[default]
    SpatialWindow,
    /// Every window member is compared with the incoming event.
    LinearWindow,
}

/// Thresholds and strategy of the proximity detector.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProximityConfig {
    /// Great-circle distance limit, inclusive.
    #[serde(default = "ProximityConfig::default_max_distance_km")]
    pub max_distance_km: f64,

    /// Time gap limit, inclusive.
    #[serde(default = "ProximityConfig::default_max_gap_minutes")]
    pub max_gap_minutes: f64,

    #[serde(default)]
    pub index: ProximityIndex,
}

impl ProximityConfig {
    const fn default_max_distance_km() -> f64 {
        50.0
    }

    const fn default_max_gap_minutes() -> f64 {
        60.0
    }

    pub fn with_max_distance_km(mut self, km: f64) -> Self {
        self.max_distance_km = km;
        self
    }

    pub fn with_max_gap_minutes(mut self, minutes: f64) -> Self {
        if minutes > 7.0 * 24.0 * 60.0 {
            log::warn!(
                "Proximity gap of {} minutes spans more than a week; \
                the time window will hold most of the table.",
                minutes
            );
        }

        self.max_gap_minutes = minutes;
        self
    }

    pub fn with_index(mut self, index: ProximityIndex) -> Self {
        self.index = index;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        validate_threshold("max_distance_km", self.max_distance_km).map_err(|e| e.to_string())?;
        validate_threshold("max_gap_minutes", self.max_gap_minutes).map_err(|e| e.to_string())?;
        Ok(())
    }
}

impl Default for ProximityConfig {
    fn default() -> Self {
        Self {
            max_distance_km: Self::default_max_distance_km(),
            max_gap_minutes: Self::default_max_gap_minutes(),
            index: ProximityIndex::default(),
        }
    }
}

/// Engine-wide settings.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    /// Replaces the catalog's proximity settings when present.
    #[serde(default)]
    pub proximity: Option<ProximityConfig>,

    /// Tables with more rows are rejected by `run`.
    #[serde(default)]
    pub max_table_rows: Option<usize>,
}

impl EngineConfig {
    pub fn with_proximity(mut self, proximity: ProximityConfig) -> Self {
        self.proximity = Some(proximity);
        self
    }

    pub fn with_max_table_rows(mut self, rows: usize) -> Self {
        self.max_table_rows = Some(rows);
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if let Some(proximity) = &self.proximity {
            proximity.validate()?;
        }

        if let Some(rows) = self.max_table_rows
            && rows == 0
        {
            return Err("Max table rows must be greater than zero".to_string());
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: EngineConfig = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: EngineConfig = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}
