//! Matrix builder for prebuilt PHP extension images
//!
//! This module contains the boundary types the build workflow talks in
//! (targets, extension and image references, installer data) and the
//! workflow itself.

pub mod catalog;
pub mod errors;
pub mod ext_ref;
pub mod image_ref;
pub mod ipe_data;
pub mod php_dep;
pub mod requirement;
pub mod target;
pub mod workflow;

pub use catalog::{BundledExtensions, Catalog, ExtensionSource, ImageRegistry};
pub use errors::{RefError, RequirementError, TargetError};
pub use ext_ref::{BUNDLED, Channel, ExtRef};
pub use image_ref::ImageRef;
pub use ipe_data::IpeData;
pub use php_dep::PhpDependency;
pub use requirement::IpeRequirement;
pub use target::{OsId, Target, os_ref, parse_os_ref};
pub use workflow::{DEFAULT_VERSION_LEVEL, MatrixOutput, MatrixWorkflow};
