//! Prelude module for common imports

// Re-export the matrix engine
pub use dpe_core::prelude::*;

// Re-export builder types with full paths
pub use crate::builder::catalog::{BundledExtensions, Catalog, ExtensionSource, ImageRegistry};
pub use crate::builder::errors::{RefError, RequirementError, TargetError};
pub use crate::builder::ext_ref::{BUNDLED, Channel, ExtRef};
pub use crate::builder::image_ref::ImageRef;
pub use crate::builder::ipe_data::IpeData;
pub use crate::builder::php_dep::PhpDependency;
pub use crate::builder::requirement::IpeRequirement;
pub use crate::builder::target::{OsId, Target};
pub use crate::builder::workflow::{MatrixOutput, MatrixWorkflow};

// Re-export infrastructure types
pub use crate::infrastructure::{Config, ConfigError};
