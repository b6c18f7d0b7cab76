//! # DPE Core
//!
//! Build matrix resolution engine for DPE.
//!
//! This crate turns a declarative set of matrix variables, exclude and
//! include rules into a concrete, minimal list of build configurations, and
//! provides the version comparator that version-valued variables and
//! dependency ranges rely on.
//!
//! ## Architecture
//!
//! - `value`: Values and configurations
//! - `rules`: Exclude and include rules
//! - `product`: Lazy Cartesian product
//! - `matrix`: The build matrix and its transformations
//! - `version`: Version comparison, sorting and tagging
//! - `fail_list`: Known-failure tables applied to a matrix
//!
//! ## Example
//!
//! ```rust
//! use dpe_core::{Matrix, Value, config};
//!
//! let matrix = Matrix::builder()
//!     .var("version", [10, 12, 14])
//!     .var("os", ["ubuntu-latest", "windows-latest"])
//!     .build()?;
//! assert_eq!(matrix.count(), 6);
//!
//! let pinned = matrix.pin("version", 12)?;
//! assert!(pinned.configs().all(|c| c.get("version") == Some(&Value::Int(12))));
//!
//! let trimmed = matrix.exclude(config! { "os" => "windows-latest" })?;
//! assert_eq!(trimmed.count(), 3);
//! # Ok::<(), dpe_core::MatrixError>(())
//! ```

#![warn(missing_docs)]
#![warn(unused)]
#![warn(clippy::pedantic)]

#[macro_use]
pub mod value;

pub mod error;
pub mod fail_list;
pub mod matrix;
pub mod prelude;
pub mod product;
pub mod rules;
pub mod version;

#[cfg(any(test, feature = "testing"))]
pub mod strategies;

// Re-exports for common use
pub use error::{FailListError, MatrixError, Result, VersionError};
pub use fail_list::{FailList, FailRecord};
pub use matrix::{Configs, Matrix, MatrixBuilder, Variable};
pub use rules::{ExcludeRule, IncludeRule};
pub use value::{Configuration, Value};
pub use version::{CompareOp, VersionTags};

/// DPE Core version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
