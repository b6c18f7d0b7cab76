//! # DPE - Docker PHP Extensions
//!
//! Plans the CI build of prebuilt PHP extension images. For one extension it
//! works out which extension versions to build for which PHP versions, base
//! operating systems and platforms, and emits the job matrix a CI workflow
//! fans out over.
//!
//! The matrix engine, version comparator and fail list live in
//! [`dpe_core`]; this crate adds the domain types, data sources and the
//! `dpe` command line.
//!
//! ## Quick Start
//!
//! ```bash
//! export IMAGE_DOMAIN=ghcr.io IMAGE_NAMESPACE=my-org
//!
//! # Build matrix for redis
//! dpe matrix redis 8.2,8.3 bookworm,alpine3.20 linux/amd64,linux/arm64 \
//!     --catalog data/catalog.yaml --ipe-dir data --fail-list data/fail-list.tsv
//!
//! # Image tags of every release
//! dpe tags redis --catalog data/catalog.yaml
//!
//! # Image reference of one build
//! dpe image-ref redis-6.0.2 8.3-bookworm
//! ```
//!
//! ## Modules
//!
//! - [`builder`]: Targets, extension and image references, installer data,
//!   data sources and the matrix workflow
//! - [`infrastructure`]: Configuration and logging
//! - [`cli`]: The `dpe` commands
//!
//! ## License
//!
//! Licensed under either of
//! - Apache License, Version 2.0 ([LICENSE-APACHE](LICENSE-APACHE) or <https://www.apache.org/licenses/LICENSE-2.0>)
//! - MIT license ([LICENSE-MIT](LICENSE-MIT) or <https://opensource.org/licenses/MIT>)
//!
//! at your option.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod builder;
pub mod cli;
pub mod infrastructure;

// Prelude module for common imports
pub mod prelude;

// Re-export commonly used types
pub use builder::{
    BundledExtensions, Catalog, ExtRef, ExtensionSource, ImageRef, ImageRegistry, IpeData,
    IpeRequirement, MatrixOutput, MatrixWorkflow, OsId, PhpDependency, Target,
};
pub use infrastructure::{Config, ConfigError};

/// Version of the dpe crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
