//! Persistence for prediction tracking.
//!
//! This crate provides:
//! - The JSONL prediction log ([`PredictionStore`])
//! - The flat on-disk row format ([`PersistedPrediction`])
//! - CSV export of the log

pub mod csv_storage;
pub mod error;
pub mod persisted;
pub mod prediction_store;

pub use csv_storage::CsvStorage;
pub use error::{StoreError, StoreResult};
pub use persisted::PersistedPrediction;
pub use prediction_store::PredictionStore;
