//! Configuration types for CGP evolution parameters.
//!
//! The configuration file is a flat list of `KEY=VALUE` lines:
//!
//! ```text
//! COLS=8
//! ROWS=4
//! L_BACK=2
//! POPULATION_SIZE=5
//! MAX_MUTATIONS=3
//! GENERATIONS=50000
//! RUNS=4
//! # optional
//! SEED=42
//! PARALLEL=1
//! ```
//!
//! Files with a `.json` extension are read as a JSON object with the same keys.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use super::{Geometry, PARAM_IN};

/// Keys every configuration must define.
pub const REQUIRED_KEYS: [&str; 7] = [
    "COLS",
    "ROWS",
    "L_BACK",
    "POPULATION_SIZE",
    "MAX_MUTATIONS",
    "GENERATIONS",
    "RUNS",
];

/// Top-level evolution configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CgpConfig {
    /// Columns in the CGP grid.
    #[serde(rename = "COLS")]
    pub cols: u32,
    /// Rows in the CGP grid.
    #[serde(rename = "ROWS")]
    pub rows: u32,
    /// How many preceding columns a block may connect to.
    #[serde(rename = "L_BACK")]
    pub l_back: u32,
    /// Children produced from the elite each generation.
    #[serde(rename = "POPULATION_SIZE")]
    pub population_size: usize,
    /// Upper bound of point mutations applied to one child.
    #[serde(rename = "MAX_MUTATIONS")]
    pub max_mutations: u32,
    /// Generations per run.
    #[serde(rename = "GENERATIONS")]
    pub generations: usize,
    /// Independent evolution runs.
    #[serde(rename = "RUNS")]
    pub runs: usize,
    /// Random seed for reproducibility.
    #[serde(rename = "SEED", default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    /// Evaluate the population on the rayon thread pool.
    #[serde(rename = "PARALLEL", default, deserialize_with = "deserialize_flag")]
    pub parallel: bool,
}

impl Default for CgpConfig {
    fn default() -> Self {
        Self {
            cols: 8,
            rows: 4,
            l_back: 1,
            population_size: 5,
            max_mutations: 3,
            generations: 50_000,
            runs: 1,
            seed: None,
            parallel: false,
        }
    }
}

impl CgpConfig {
    /// Grid dimensions described by this configuration.
    #[inline]
    pub fn geometry(&self) -> Geometry {
        Geometry::new(self.cols, self.rows)
    }

    /// Load configuration from a file, choosing the format by extension.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_key_value_str(&content)
        }
    }

    /// Parse `KEY=VALUE` lines.
    pub fn from_key_value_str(content: &str) -> Result<Self, ConfigError> {
        let mut map = Map::new();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            map.insert(key.trim().to_string(), scalar_value(value.trim()));
        }
        Self::from_map(map)
    }

    /// Parse a JSON object.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        match serde_json::from_str(content)? {
            Value::Object(map) => Self::from_map(map),
            _ => Err(ConfigError::NotAnObject),
        }
    }

    fn from_map(map: Map<String, Value>) -> Result<Self, ConfigError> {
        for key in REQUIRED_KEYS {
            let value = map.get(key).ok_or(ConfigError::MissingKey(key))?;
            if value.as_u64().is_none() {
                return Err(ConfigError::InvalidValue {
                    key,
                    value: value.to_string(),
                });
            }
        }
        if let Some(seed) = map.get("SEED")
            && seed.as_u64().is_none()
        {
            return Err(ConfigError::InvalidValue {
                key: "SEED",
                value: seed.to_string(),
            });
        }

        let config: Self = serde_json::from_value(Value::Object(map))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let signals = self
            .cols
            .checked_mul(self.rows)
            .and_then(|blocks| blocks.checked_add(PARAM_IN));
        if self.cols == 0 || self.rows == 0 || signals.is_none() {
            return Err(ConfigError::InvalidDimensions);
        }
        if self.population_size == 0 {
            return Err(ConfigError::EmptyPopulation);
        }
        if self.max_mutations == 0 {
            return Err(ConfigError::NoMutations);
        }
        if self.runs == 0 {
            return Err(ConfigError::NoRuns);
        }
        Ok(())
    }

    /// Render back into the `KEY=VALUE` format.
    pub fn to_key_value_string(&self) -> String {
        let mut out = format!(
            "COLS={}\nROWS={}\nL_BACK={}\nPOPULATION_SIZE={}\nMAX_MUTATIONS={}\nGENERATIONS={}\nRUNS={}\n",
            self.cols,
            self.rows,
            self.l_back,
            self.population_size,
            self.max_mutations,
            self.generations,
            self.runs
        );
        if let Some(seed) = self.seed {
            out.push_str(&format!("SEED={}\n", seed));
        }
        if self.parallel {
            out.push_str("PARALLEL=1\n");
        }
        out
    }
}

/// Interpret a raw value from a `KEY=VALUE` line.
fn scalar_value(raw: &str) -> Value {
    if let Ok(n) = raw.parse::<u64>() {
        return Value::from(n);
    }
    match raw.to_ascii_lowercase().as_str() {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(raw.to_string()),
    }
}

/// Accept `true`/`false` or `0`/`1`.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Bool(b) => Ok(b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Ok(false),
            Some(1) => Ok(true),
            _ => Err(serde::de::Error::custom(format!(
                "expected 0 or 1 for PARALLEL, got {}",
                n
            ))),
        },
        other => Err(serde::de::Error::custom(format!(
            "expected boolean for PARALLEL, got {}",
            other
        ))),
    }
}

/// Configuration loading and validation errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid configuration file: no key {0}")]
    MissingKey(&'static str),
    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: &'static str, value: String },
    #[error("Configuration must be a JSON object")]
    NotAnObject,
    #[error("Malformed configuration: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Grid dimensions (COLS, ROWS) must be non-zero and fit in u32 signal indices")]
    InvalidDimensions,
    #[error("POPULATION_SIZE must be at least 1")]
    EmptyPopulation,
    #[error("MAX_MUTATIONS must be at least 1")]
    NoMutations,
    #[error("RUNS must be at least 1")]
    NoRuns,
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "COLS=8\nROWS = 4\n L_BACK=2\n\n# comment\nPOPULATION_SIZE=5\nMAX_MUTATIONS=3\nGENERATIONS=100\nRUNS=2\n";

    #[test]
    fn test_parse_key_value() {
        let config = CgpConfig::from_key_value_str(SAMPLE).unwrap();
        assert_eq!(config.cols, 8);
        assert_eq!(config.rows, 4);
        assert_eq!(config.l_back, 2);
        assert_eq!(config.population_size, 5);
        assert_eq!(config.max_mutations, 3);
        assert_eq!(config.generations, 100);
        assert_eq!(config.runs, 2);
        assert_eq!(config.seed, None);
        assert!(!config.parallel);
        assert_eq!(config.geometry(), Geometry::new(8, 4));
    }

    #[test]
    fn test_optional_keys() {
        let content = format!("{}SEED=7\nPARALLEL=1\n", SAMPLE);
        let config = CgpConfig::from_key_value_str(&content).unwrap();
        assert_eq!(config.seed, Some(7));
        assert!(config.parallel);
    }

    #[test]
    fn test_missing_key() {
        let content = SAMPLE.replace("RUNS=2\n", "");
        let err = CgpConfig::from_key_value_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::MissingKey("RUNS")));
    }

    #[test]
    fn test_invalid_value() {
        let content = SAMPLE.replace("COLS=8", "COLS=eight");
        let err = CgpConfig::from_key_value_str(&content).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: "COLS", .. }));
    }

    #[test]
    fn test_validation() {
        let content = SAMPLE.replace("MAX_MUTATIONS=3", "MAX_MUTATIONS=0");
        assert!(matches!(
            CgpConfig::from_key_value_str(&content),
            Err(ConfigError::NoMutations)
        ));

        let content = SAMPLE.replace("ROWS = 4", "ROWS=0");
        assert!(matches!(
            CgpConfig::from_key_value_str(&content),
            Err(ConfigError::InvalidDimensions)
        ));
    }

    #[test]
    fn test_json_and_key_value_agree() {
        let config = CgpConfig {
            seed: Some(3),
            parallel: true,
            ..Default::default()
        };
        let json = serde_json::to_string(&config).unwrap();
        assert_eq!(CgpConfig::from_json_str(&json).unwrap(), config);
        assert_eq!(
            CgpConfig::from_key_value_str(&config.to_key_value_string()).unwrap(),
            config
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cgp.cfg");
        fs::write(&path, SAMPLE).unwrap();
        assert_eq!(CgpConfig::load(&path).unwrap().runs, 2);

        let missing = dir.path().join("missing.cfg");
        assert!(matches!(
            CgpConfig::load(&missing),
            Err(ConfigError::Io { .. })
        ));
    }
}
