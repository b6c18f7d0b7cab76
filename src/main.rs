//! dpe - build matrix generator for prebuilt PHP extension images
//!
//! ## Commands
//!
//! - `dpe matrix` - Build the CI matrix for an extension
//! - `dpe configs` - Expand a matrix document
//! - `dpe tags` - Map versions to image tags
//! - `dpe compare` - Compare two versions
//! - `dpe image-name`, `dpe image-ref`, `dpe image-refs` - Resolve images
//! - `dpe list-extensions` - List buildable extensions
//! - `dpe completions` - Generate shell completions
//!
//! ## Installation
//!
//! ```bash
//! cargo install dpe
//! ```

use std::process::ExitCode;

fn main() -> ExitCode {
    match dpe::cli::run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            if std::env::var("DPE_VERBOSE").is_ok() {
                eprintln!("{e:?}");
            }
            ExitCode::FAILURE
        }
    }
}
