//! Batch sales analytics over CSV objects in a bucket.
//!
//! Four stages run one after another, each reading one object and writing
//! new ones: `preprocess` drops malformed rows, `map` keeps name, quantity
//! and price, `reduce` totals quantity per product and ranks products by
//! volume, and `update-price` raises or lowers prices by rank decile.

pub mod config;
pub mod error;
pub mod generate;
pub mod log;
pub mod mapper;
pub mod object_store;
pub mod price;
pub mod record;
pub mod reducer;
pub mod stage;
pub mod validator;

pub use crate::config::{ObjectKeys, PipelineConfig};
pub use crate::error::{PipelineError, Result};
pub use crate::object_store::Bucket;
pub use crate::stage::{Stage, StageReport, StageRunner};
