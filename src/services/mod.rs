// Service exports
pub mod dataset;
pub mod store;

pub use dataset::{Dataset, DatasetError};
pub use store::{ArtifactStore, StoreError};
