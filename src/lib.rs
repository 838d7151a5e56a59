//! Collects cafes and their reviews from a places provider across a set of
//! areas, then cleans and aggregates them into place and review datasets.
//!
//! The core stages (`collect`, `clean`, `aggregate`, wired by `pipeline`)
//! take an injected [`provider::PlacesApi`] and a parsed
//! [`config::AreaCatalog`]; they never read files or the environment.

pub mod aggregate;
pub mod clean;
pub mod collect;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod snapshot;

pub use error::{PipelineError, ProviderError, Result};
