use std::path::{Path, PathBuf};

use config::{Config, ConfigBuilder, Environment, File};
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::object_store::canonical_key;
use crate::stage::Stage;

/// Flat settings as they appear in the config file and the environment.
///
/// Environment variables map by lowercasing, e.g. `BUCKET_NAME` sets
/// `bucket_name`.
#[derive(Debug, Deserialize)]
struct Settings {
    store_backend: String,
    bucket_name: Option<String>,
    service_endpoint: Option<String>,
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_region: String,
    local_root: Option<PathBuf>,
    log_dir: Option<PathBuf>,

    dataset_object_key: String,
    preprocessed_object_key: String,
    mapped_object_key: String,
    reduced_object_key: String,
    top_products_object_key: String,
    final_output_object_key: String,
}

const DEFAULTS: &[(&str, &str)] = &[
    ("store_backend", "s3"),
    ("aws_region", "us-standard"),
    ("dataset_object_key", "Dataset.csv"),
    ("preprocessed_object_key", "Preprocessed.csv"),
    ("mapped_object_key", "salesM.csv"),
    ("reduced_object_key", "Reduced.csv"),
    ("top_products_object_key", "Top_Products_Price.csv"),
    ("final_output_object_key", "Final_Output.csv"),
];

#[derive(Debug, Clone, PartialEq)]
pub enum Backend {
    S3 {
        endpoint: Option<String>,
        access_key_id: Option<String>,
        secret_access_key: Option<String>,
        region: String,
    },
    Local {
        root: PathBuf,
    },
    Memory,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    pub bucket: String,
    pub backend: Backend,
}

/// Object keys read and written by each stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectKeys {
    pub dataset: String,
    pub preprocessed: String,
    pub mapped: String,
    pub reduced: String,
    pub top_products: String,
    pub final_output: String,
}

impl Default for ObjectKeys {
    fn default() -> Self {
        let key = |name: &str| {
            DEFAULTS
                .iter()
                .find(|(k, _)| *k == name)
                .map(|(_, v)| v.to_string())
                .unwrap_or_default()
        };
        Self {
            dataset: key("dataset_object_key"),
            preprocessed: key("preprocessed_object_key"),
            mapped: key("mapped_object_key"),
            reduced: key("reduced_object_key"),
            top_products: key("top_products_object_key"),
            final_output: key("final_output_object_key"),
        }
    }
}

impl ObjectKeys {
    pub fn input(&self, stage: Stage) -> &str {
        match stage {
            Stage::Preprocess => &self.dataset,
            Stage::Map => &self.preprocessed,
            Stage::Reduce => &self.mapped,
            Stage::UpdatePrice => &self.top_products,
        }
    }

    pub fn outputs(&self, stage: Stage) -> Vec<&str> {
        match stage {
            Stage::Preprocess => vec![&self.preprocessed],
            Stage::Map => vec![&self.mapped],
            Stage::Reduce => vec![&self.reduced, &self.top_products],
            Stage::UpdatePrice => vec![&self.final_output],
        }
    }

    /// Rejects keys that address no object and stages that would read what
    /// they write. Keys are compared as the store addresses them, so
    /// `a.csv` and `/a.csv` collide.
    pub fn check(&self) -> Result<()> {
        for stage in Stage::ALL {
            let input = canonical_key(self.input(stage));
            let outputs: Vec<String> = self
                .outputs(stage)
                .into_iter()
                .map(canonical_key)
                .collect();
            if input.is_empty() || outputs.iter().any(|k| k.is_empty()) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{stage}: object keys must not be empty"
                )));
            }
            if outputs.contains(&input) {
                return Err(PipelineError::InvalidConfig(format!(
                    "{stage}: output key '{}' is the same as its input",
                    self.input(stage)
                )));
            }
            if outputs.len() == 2 && outputs[0] == outputs[1] {
                return Err(PipelineError::InvalidConfig(format!(
                    "{stage}: both outputs use key '{}'",
                    outputs[0]
                )));
            }
        }
        Ok(())
    }
}

/// Everything a pipeline invocation needs, resolved up front.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub store: StoreConfig,
    pub keys: ObjectKeys,
    pub log_dir: Option<PathBuf>,
}

impl PipelineConfig {
    /// Defaults, then the optional config file, then `.env` and the process
    /// environment.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        dotenvy::dotenv().ok();
        let builder = with_file(defaults()?, path).add_source(Environment::default());
        Self::from_builder(builder)
    }

    /// Defaults and the given file only, ignoring the environment.
    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_builder(with_file(defaults()?, Some(path)))
    }

    fn from_builder(builder: ConfigBuilder<config::builder::DefaultState>) -> Result<Self> {
        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.try_into()
    }
}

fn defaults() -> Result<ConfigBuilder<config::builder::DefaultState>> {
    let mut builder = Config::builder();
    for (key, value) in DEFAULTS {
        builder = builder.set_default(*key, *value)?;
    }
    Ok(builder)
}

fn with_file(
    builder: ConfigBuilder<config::builder::DefaultState>,
    path: Option<&Path>,
) -> ConfigBuilder<config::builder::DefaultState> {
    match path {
        Some(path) => builder.add_source(File::from(path)),
        None => builder.add_source(File::with_name("pipeline").required(false)),
    }
}

impl TryFrom<Settings> for PipelineConfig {
    type Error = PipelineError;

    fn try_from(s: Settings) -> Result<Self> {
        let backend = match s.store_backend.to_ascii_lowercase().as_str() {
            "s3" | "cos" => Backend::S3 {
                endpoint: s.service_endpoint,
                access_key_id: s.aws_access_key_id,
                secret_access_key: s.aws_secret_access_key,
                region: s.aws_region,
            },
            "local" => Backend::Local {
                root: s.local_root.ok_or_else(|| {
                    PipelineError::InvalidConfig("local backend requires local_root".into())
                })?,
            },
            "memory" => Backend::Memory,
            other => {
                return Err(PipelineError::InvalidConfig(format!(
                    "unknown store backend '{other}'"
                )))
            }
        };

        let bucket = match (&backend, s.bucket_name) {
            (_, Some(name)) if !name.is_empty() => name,
            (Backend::S3 { .. }, _) => {
                return Err(PipelineError::InvalidConfig(
                    "bucket_name is required for the s3 backend".into(),
                ))
            }
            _ => "local".to_string(),
        };

        let keys = ObjectKeys {
            dataset: s.dataset_object_key,
            preprocessed: s.preprocessed_object_key,
            mapped: s.mapped_object_key,
            reduced: s.reduced_object_key,
            top_products: s.top_products_object_key,
            final_output: s.final_output_object_key,
        };
        keys.check()?;

        Ok(Self {
            store: StoreConfig { bucket, backend },
            keys,
            log_dir: s.log_dir,
        })
    }
}
