//! prelude - Common imports for DPE
//!
//! ## Usage
//!
//! ```rust
//! use dpe_core::prelude::*;
//!
//! let m = Matrix::builder().var("php", ["8.2", "8.3"]).build()?;
//! let m = m.exclude(config! { "php" => "8.2" })?;
//! assert_eq!(m.count(), 1);
//! # Ok::<(), MatrixError>(())
//! ```

pub use crate::config;
pub use crate::error::{FailListError, MatrixError, VersionError};
pub use crate::fail_list::FailList;
pub use crate::matrix::{Matrix, Variable};
pub use crate::rules::{ExcludeRule, IncludeRule};
pub use crate::value::{Configuration, Value};
pub use crate::version::{self, CompareOp, VersionTags};
