//! Stage runner.
//!
//! Every stage follows the same protocol against the bucket: list keys once,
//! require the input key and the absence of every output key, fetch the
//! input, transform it in memory, then write the outputs. Any failure before
//! the first write leaves the bucket untouched.

use std::fmt;

use clap::ValueEnum;
use tracing::info;

use crate::config::ObjectKeys;
use crate::error::{PipelineError, Result};
use crate::object_store::{canonical_key, Bucket};
use crate::{mapper, price, reducer, validator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum Stage {
    /// Drop rows whose quantity or price does not parse.
    Preprocess,
    /// Keep only name, quantity and price.
    Map,
    /// Sum quantity per product and rank by volume.
    Reduce,
    /// Adjust prices of the top and bottom deciles.
    UpdatePrice,
}

impl Stage {
    pub const ALL: [Stage; 4] = [
        Stage::Preprocess,
        Stage::Map,
        Stage::Reduce,
        Stage::UpdatePrice,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Preprocess => "preprocess",
            Stage::Map => "map",
            Stage::Reduce => "reduce",
            Stage::UpdatePrice => "update-price",
        }
    }

    /// Runs the in-memory transform. Returns one body per output key, in the
    /// order of [`ObjectKeys::outputs`].
    pub fn transform(self, input: &[u8]) -> Result<Transformed> {
        let out = match self {
            Stage::Preprocess => {
                let (body, validated) = validator::validate_csv(input)?;
                Transformed {
                    rows_read: validated.rows.len() + validated.dropped,
                    rows_written: validated.rows.len(),
                    bodies: vec![body],
                }
            }
            Stage::Map => {
                let (body, mapped) = mapper::project_csv(input)?;
                Transformed {
                    rows_read: mapped.len(),
                    rows_written: mapped.len(),
                    bodies: vec![body],
                }
            }
            Stage::Reduce => {
                let reduced = reducer::reduce_csv(input)?;
                Transformed {
                    rows_read: reduced.rows_read,
                    rows_written: reduced.ranking.len(),
                    bodies: vec![reduced.volume, reduced.prices],
                }
            }
            Stage::UpdatePrice => {
                let updated = price::adjust_prices_csv(input)?;
                Transformed {
                    rows_read: updated.rows_read,
                    rows_written: updated.entries.len(),
                    bodies: vec![updated.body],
                }
            }
        };
        Ok(out)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
pub struct Transformed {
    pub rows_read: usize,
    pub rows_written: usize,
    pub bodies: Vec<Vec<u8>>,
}

/// What one successful stage invocation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StageReport {
    pub stage: Stage,
    pub input_key: String,
    pub rows_read: usize,
    pub rows_written: usize,
    pub outputs: Vec<String>,
}

pub struct StageRunner {
    bucket: Bucket,
    keys: ObjectKeys,
}

impl StageRunner {
    pub fn new(bucket: Bucket, keys: ObjectKeys) -> Self {
        Self { bucket, keys }
    }

    pub fn bucket(&self) -> &Bucket {
        &self.bucket
    }

    pub fn keys(&self) -> &ObjectKeys {
        &self.keys
    }

    /// Fails unless `input` exists and none of `outputs` does. Keys are
    /// compared in canonical form; errors carry them as given.
    pub async fn check_preconditions(
        &self,
        stage: &str,
        input: Option<&str>,
        outputs: &[&str],
    ) -> Result<()> {
        let present = self.bucket.keys().await?;

        if let Some(input) = input {
            if !present.contains(&canonical_key(input)) {
                return Err(PipelineError::MissingInput {
                    stage: stage.to_string(),
                    key: input.to_string(),
                });
            }
        }
        if let Some(existing) = outputs
            .iter()
            .find(|k| present.contains(&canonical_key(k)))
        {
            return Err(PipelineError::OutputAlreadyExists {
                stage: stage.to_string(),
                key: existing.to_string(),
            });
        }
        Ok(())
    }

    pub async fn run(&self, stage: Stage) -> Result<StageReport> {
        let input_key = self.keys.input(stage);
        let output_keys = self.keys.outputs(stage);
        info!(%stage, input = input_key, outputs = ?output_keys, "starting stage");

        self.check_preconditions(stage.as_str(), Some(input_key), &output_keys)
            .await?;

        let input = match self.bucket.get(input_key).await {
            Err(PipelineError::StoreUnavailable(object_store::Error::NotFound { .. })) => {
                return Err(PipelineError::MissingInput {
                    stage: stage.to_string(),
                    key: input_key.to_string(),
                })
            }
            other => other?,
        };

        let transformed = stage.transform(&input)?;
        info!(
            %stage,
            rows_read = transformed.rows_read,
            rows_written = transformed.rows_written,
            dropped = transformed.rows_read.saturating_sub(transformed.rows_written),
            "transform complete"
        );

        for (key, body) in output_keys.iter().zip(transformed.bodies) {
            self.bucket.put(key, body).await?;
        }

        Ok(StageReport {
            stage,
            input_key: input_key.to_string(),
            rows_read: transformed.rows_read,
            rows_written: transformed.rows_written,
            outputs: output_keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    /// Writes a raw dataset under the dataset key, refusing to replace one.
    pub async fn upload_dataset(&self, body: Vec<u8>) -> Result<()> {
        let key = self.keys.dataset.as_str();
        self.check_preconditions("generate", None, &[key]).await?;
        self.bucket.put(key, body).await
    }

    /// Runs every stage in order, stopping at the first failure.
    pub async fn run_all(&self) -> Result<Vec<StageReport>> {
        let mut reports = Vec::with_capacity(Stage::ALL.len());
        for stage in Stage::ALL {
            reports.push(self.run(stage).await?);
        }
        Ok(reports)
    }
}
