//! BenchSight experiment configuration.
//!
//! Experiment configuration is split over many JSON fragments. This crate
//! assembles them into a single document and keeps track of the typed
//! parameters they define:
//!
//! - [`assembler`] - Fragment discovery, loading and assembly
//! - [`registry`] - Parameter descriptors and redefinition rules
//! - [`document`] - Document shapes and the merge rules
//! - [`query`] - Matching documents against field conditions
//! - [`scrape`] - Key-value extraction from benchmark logs
//! - [`error`] - Error types
//!
//! # Example
//!
//! ```ignore
//! use benchsight_config::ConfigurationAssembler;
//!
//! let mut loaded = ConfigurationAssembler::new("configs").load()?;
//! loaded.apply_user_file("my_experiment.json")?;
//!
//! println!("{:?}", loaded.parameter("exp.framework"));
//! ```

pub mod assembler;
pub mod document;
pub mod error;
pub mod query;
pub mod registry;
pub mod scrape;

pub use assembler::{ConfigurationAssembler, LoadedConfig, load};
pub use document::{Document, Shape, merge};
pub use error::{ConfigError, Result};
pub use query::{Policy, matches};
pub use registry::{
    Description, Origin, ParamType, ParameterDescriptor, ParameterRegistry, remove_info,
};
pub use scrape::{DEFAULT_PATTERN, add_key_values};
