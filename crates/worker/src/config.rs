use crate::error::{Result, WorkerError};
use opinion_cluster::{ClusterSetConfig, OovPolicy, RepresentativePolicy};
use opinion_embeddings::EmbeddingMode;
use opinion_store::RetryPolicy;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

pub const DEFAULT_DATA_DIR: &str = "./data";
pub const DEFAULT_NAMESPACE: &str = "opinion_box";
pub const DEFAULT_DIMENSION: usize = 300;
pub const DEFAULT_IDLE_MS: u64 = 1_000;

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub namespace: String,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmbeddingConfig {
    pub mode: EmbeddingMode,
    pub vectors: Option<PathBuf>,
    pub dimension: usize,
}

/// Runtime settings, read from `OPINION_*` environment variables.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerConfig {
    pub store: StoreConfig,
    pub embedding: EmbeddingConfig,
    /// Required to run the clustering loop; deployments have used 0.63 and 0.65.
    pub threshold: Option<f32>,
    pub representative: RepresentativePolicy,
    pub oov: OovPolicy,
    pub idle_interval: Duration,
    pub reset_on_start: bool,
}

impl WorkerConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mode = match get("OPINION_EMBEDDING_MODE") {
            Some(raw) => EmbeddingMode::parse(&raw)?,
            None => EmbeddingMode::Table,
        };
        let representative = match get("OPINION_REPRESENTATIVE") {
            Some(raw) => RepresentativePolicy::parse(&raw).ok_or_else(|| {
                WorkerError::Config(format!(
                    "OPINION_REPRESENTATIVE must be 'centroid' or 'majority', got '{raw}'"
                ))
            })?,
            None => RepresentativePolicy::default(),
        };
        let oov = match get("OPINION_OOV") {
            Some(raw) => OovPolicy::parse(&raw).ok_or_else(|| {
                WorkerError::Config(format!("OPINION_OOV must be 'zero' or 'drop', got '{raw}'"))
            })?,
            None => OovPolicy::default(),
        };

        let defaults = RetryPolicy::default();
        let config = Self {
            store: StoreConfig {
                data_dir: get("OPINION_DATA_DIR")
                    .map_or_else(|| PathBuf::from(DEFAULT_DATA_DIR), PathBuf::from),
                namespace: get("OPINION_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.to_string()),
                retry: RetryPolicy {
                    attempts: parse_or("OPINION_CONNECT_ATTEMPTS", get("OPINION_CONNECT_ATTEMPTS"), defaults.attempts)?,
                    delay: Duration::from_millis(parse_or(
                        "OPINION_CONNECT_DELAY_MS",
                        get("OPINION_CONNECT_DELAY_MS"),
                        u64::try_from(defaults.delay.as_millis()).unwrap_or(u64::MAX),
                    )?),
                },
            },
            embedding: EmbeddingConfig {
                mode,
                vectors: get("OPINION_VECTORS").map(PathBuf::from),
                dimension: parse_or("OPINION_DIMENSION", get("OPINION_DIMENSION"), DEFAULT_DIMENSION)?,
            },
            threshold: get("OPINION_THRESHOLD")
                .map(|raw| parse_value::<f32>("OPINION_THRESHOLD", &raw))
                .transpose()?,
            representative,
            oov,
            idle_interval: Duration::from_millis(parse_or("OPINION_IDLE_MS", get("OPINION_IDLE_MS"), DEFAULT_IDLE_MS)?),
            reset_on_start: match get("OPINION_RESET_ON_START") {
                Some(raw) => parse_bool("OPINION_RESET_ON_START", &raw)?,
                None => true,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.embedding.dimension == 0 {
            return Err(WorkerError::Config("OPINION_DIMENSION must be positive".into()));
        }
        if self.store.retry.attempts == 0 {
            return Err(WorkerError::Config(
                "OPINION_CONNECT_ATTEMPTS must be at least 1".into(),
            ));
        }
        if let Some(threshold) = self.threshold {
            ClusterSetConfig::new(threshold, self.embedding.dimension)?;
        }
        Ok(())
    }

    /// Engine settings for a provider of `dimension`. Fails when no threshold
    /// was configured; there is no default.
    pub fn cluster_config(&self, dimension: usize) -> Result<ClusterSetConfig> {
        let threshold = self.threshold.ok_or_else(|| {
            WorkerError::Config(
                "OPINION_THRESHOLD (or --threshold) is required, e.g. 0.63".to_string(),
            )
        })?;
        Ok(ClusterSetConfig::new(threshold, dimension)?
            .with_representative(self.representative)
            .with_oov(self.oov))
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>()
        .map_err(|e| WorkerError::Config(format!("{key}='{raw}' is invalid: {e}")))
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_bool(key: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(WorkerError::Config(format!(
            "{key}='{other}' is invalid: expected true or false"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> Result<WorkerConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        WorkerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_without_environment() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.store.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
        assert_eq!(config.store.namespace, DEFAULT_NAMESPACE);
        assert_eq!(config.store.retry, RetryPolicy::default());
        assert_eq!(config.embedding.mode, EmbeddingMode::Table);
        assert_eq!(config.embedding.dimension, 300);
        assert_eq!(config.threshold, None);
        assert_eq!(config.representative, RepresentativePolicy::Centroid);
        assert_eq!(config.oov, OovPolicy::ZeroVector);
        assert_eq!(config.idle_interval, Duration::from_secs(1));
        assert!(config.reset_on_start);
    }

    #[test]
    fn reads_every_variable() {
        let config = config_from(&[
            ("OPINION_DATA_DIR", "/srv/opinions"),
            ("OPINION_NAMESPACE", "db_badslido"),
            ("OPINION_THRESHOLD", "0.65"),
            ("OPINION_REPRESENTATIVE", "majority"),
            ("OPINION_OOV", "drop"),
            ("OPINION_EMBEDDING_MODE", "stub"),
            ("OPINION_VECTORS", "/models/ja.vec"),
            ("OPINION_DIMENSION", "64"),
            ("OPINION_IDLE_MS", "250"),
            ("OPINION_CONNECT_ATTEMPTS", "3"),
            ("OPINION_CONNECT_DELAY_MS", "500"),
            ("OPINION_RESET_ON_START", "false"),
        ])
        .unwrap();

        assert_eq!(config.store.data_dir, PathBuf::from("/srv/opinions"));
        assert_eq!(config.store.namespace, "db_badslido");
        assert_eq!(
            config.store.retry,
            RetryPolicy {
                attempts: 3,
                delay: Duration::from_millis(500)
            }
        );
        assert_eq!(config.threshold, Some(0.65));
        assert_eq!(config.representative, RepresentativePolicy::Majority);
        assert_eq!(config.oov, OovPolicy::Drop);
        assert_eq!(config.embedding.mode, EmbeddingMode::Stub);
        assert_eq!(config.embedding.vectors, Some(PathBuf::from("/models/ja.vec")));
        assert_eq!(config.embedding.dimension, 64);
        assert_eq!(config.idle_interval, Duration::from_millis(250));
        assert!(!config.reset_on_start);
    }

    #[test]
    fn rejects_out_of_range_threshold() {
        let err = config_from(&[("OPINION_THRESHOLD", "1.5")]).unwrap_err();
        assert!(err.to_string().contains("between 0 and 1"), "unexpected error: {err}");

        let err = config_from(&[("OPINION_THRESHOLD", "high")]).unwrap_err();
        assert!(err.to_string().contains("OPINION_THRESHOLD"), "unexpected error: {err}");
    }

    #[test]
    fn rejects_unknown_policies() {
        assert!(config_from(&[("OPINION_REPRESENTATIVE", "median")]).is_err());
        assert!(config_from(&[("OPINION_OOV", "ignore")]).is_err());
        assert!(config_from(&[("OPINION_EMBEDDING_MODE", "onnx")]).is_err());
        assert!(config_from(&[("OPINION_RESET_ON_START", "maybe")]).is_err());
        assert!(config_from(&[("OPINION_CONNECT_ATTEMPTS", "0")]).is_err());
    }

    #[test]
    fn cluster_config_requires_threshold() {
        let config = config_from(&[]).unwrap();
        let err = config.cluster_config(300).unwrap_err();
        assert!(err.to_string().contains("OPINION_THRESHOLD"));

        let config = config_from(&[("OPINION_THRESHOLD", "0.63"), ("OPINION_OOV", "drop")]).unwrap();
        let cluster = config.cluster_config(300).unwrap();
        assert_eq!(cluster.threshold(), 0.63);
        assert_eq!(cluster.dimension(), 300);
        assert_eq!(cluster.oov(), OovPolicy::Drop);
    }
}
