//! Error types for the builder domain

use thiserror::Error;

/// Errors raised while building or parsing a [`Target`](super::Target)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TargetError {
    /// PHP version is not of the form `X.Y`
    #[error("invalid PHP version: '{0}'")]
    InvalidPhpVersion(String),

    /// OS id is neither `debian` nor `alpine`
    #[error("invalid OS id: '{0}'")]
    InvalidOsId(String),

    /// OS version is empty
    #[error("OS version cannot be empty")]
    EmptyOsVersion,

    /// OS reference is neither `alpineX.Y` nor a Debian codename
    #[error("invalid OS ref: '{0}'")]
    InvalidOsRef(String),

    /// Target string is not `<php>-<os_ref>`
    #[error("invalid target string: '{0}'")]
    InvalidTarget(String),

    /// Matrix configuration lacks a usable `php` or `os` entry
    #[error("configuration {0} does not describe a target")]
    NotATarget(String),
}

/// Errors raised while parsing extension and image references
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefError {
    /// Extension name is empty
    #[error("extension name cannot be empty")]
    EmptyName,

    /// Version is neither `bundled` nor dotted digits
    #[error("invalid version format: '{0}'")]
    InvalidVersion(String),

    /// Version suffix could not be parsed
    #[error("invalid version spec: '{0}'")]
    InvalidSpec(String),

    /// Image reference has no repository
    #[error("invalid image ref: '{0}'")]
    InvalidImageRef(String),
}

/// Errors raised while parsing installer special requirements
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RequirementError {
    /// A requirement part is not `zts`, a PHP version or an OS ref
    #[error("can't parse requirement '{requirement}': {source}")]
    Unparseable {
        /// The full requirement
        requirement: String,
        /// Why the offending part was rejected
        #[source]
        source: TargetError,
    },

    /// The requirement constrains nothing
    #[error("requirement '{0}' sets none of OS, PHP version or zts")]
    Unconstrained(String),
}
