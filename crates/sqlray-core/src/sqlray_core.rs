//! SQLRay Core - LLM-assisted SQL query optimization
//!
//! This crate provides:
//! - [`SchemaStore`] - loading and validating a user-supplied schema description
//! - [`MetadataFilter`] - narrowing the schema to the tables a query touches
//! - [`TableExtractor`] - asking the model which tables a query references
//! - [`QueryOptimizer`] - the two-step extract/optimize workflow
//!
//! ```text
//! schema load -> extract tables -> filter metadata -> optimization prompt -> parse
//! ```

mod error;
mod extractor;
mod filter;
mod optimizer;
pub mod prompt;
pub mod response;
mod schema;

pub use error::{ErrorKind, OptimizerError, OptimizerResult};
pub use extractor::TableExtractor;
pub use filter::{FilteredMetadata, MetadataFilter};
pub use optimizer::{OptimizationRequest, OptimizationResult, QueryOptimizer};
pub use schema::{REQUIRED_SCHEMA_KEYS, SchemaDescription, SchemaRecord, SchemaStore};
