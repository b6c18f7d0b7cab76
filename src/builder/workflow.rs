//! Build matrix workflow for one extension.
//!
//! Starts from every PHP version, OS target and platform requested, then
//! narrows the matrix step by step using the installer data, the extension
//! index, the fail list and the registry. The result is the matrix document
//! a CI job fans out over.

use super::catalog::{BundledExtensions, ExtensionSource, ImageRegistry};
use super::ext_ref::BUNDLED;
use super::ipe_data::IpeData;
use super::target::{OsId, Target, os_ref};
use crate::infrastructure::Config;
use anyhow::{Context, Result, bail};
use dpe_core::{Configuration, FailList, Matrix, Value, Variable, config, version};
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Prefix length used to narrow extension versions unless the source
/// overrides it
pub const DEFAULT_VERSION_LEVEL: usize = 2;

/// Final document printed by the `matrix` command
#[derive(Debug, Clone, Serialize)]
pub struct MatrixOutput {
    /// The matrix document
    pub matrix: Matrix,
    /// Number of configurations
    pub count: usize,
}

/// Narrows a build matrix for one extension
pub struct MatrixWorkflow<'a> {
    config: &'a Config,
    source: &'a dyn ExtensionSource,
    bundled: &'a dyn BundledExtensions,
    registry: &'a dyn ImageRegistry,
    ipe: &'a IpeData,
    fail_list: Option<&'a FailList>,
}

fn render_os(value: &Value) -> Value {
    match value.as_tuple() {
        Some([id, version]) => match id.parse::<OsId>() {
            Ok(id) => Value::Text(os_ref(id, version)),
            Err(_) => value.clone(),
        },
        _ => value.clone(),
    }
}

fn ext_versions(matrix: &Matrix) -> Vec<String> {
    matrix
        .variable("ext_version")
        .unwrap_or_default()
        .iter()
        .filter_map(Value::as_text)
        .filter(|v| *v != BUNDLED)
        .map(ToString::to_string)
        .collect()
}

fn declared(matrix: &Matrix, config: &Configuration) -> Configuration {
    config.project(matrix.names())
}

impl<'a> MatrixWorkflow<'a> {
    /// Creates a workflow over its data sources
    pub fn new(
        config: &'a Config,
        source: &'a dyn ExtensionSource,
        bundled: &'a dyn BundledExtensions,
        registry: &'a dyn ImageRegistry,
        ipe: &'a IpeData,
    ) -> Self {
        Self {
            config,
            source,
            bundled,
            registry,
            ipe,
            fail_list: None,
        }
    }

    /// Applies `fail_list` after version narrowing
    #[must_use]
    pub fn with_fail_list(mut self, fail_list: &'a FailList) -> Self {
        self.fail_list = Some(fail_list);
        self
    }

    /// Builds the matrix for `ext`
    ///
    /// # Errors
    ///
    /// Fails if the extension is unknown to both the index and the
    /// installer, if a data source fails, or on malformed target data.
    pub fn build(
        &self,
        ext: &str,
        php_versions: &[String],
        os_targets: &[(OsId, String)],
        platforms: &[String],
    ) -> Result<MatrixOutput> {
        let php_versions: Vec<&str> = php_versions
            .iter()
            .map(String::as_str)
            .filter(|php| {
                let supported = self.ipe.is_php_version_supported(ext, php);
                if !supported {
                    warn!(ext, php, "PHP version not supported by the installer");
                }
                supported
            })
            .collect();

        let mut matrix = Matrix::new([
            Variable::new("ext_version", [BUNDLED]),
            Variable::new("php", php_versions.iter().copied()),
            Variable::new(
                "os",
                os_targets
                    .iter()
                    .map(|(id, version)| Value::tuple([id.as_str(), version.as_str()])),
            ),
            Variable::new("platform", platforms.iter().map(String::as_str)),
        ])?;
        info!(ext, count = matrix.count(), "initial matrix");

        let mut targets = Vec::new();
        for php in &php_versions {
            for (id, version) in os_targets {
                let target = Target::new(*php, *id, version.as_str())?;
                let bundled = self.bundled.is_bundled(ext, &target)?;
                debug!(ext, %target, bundled, "classified target");
                targets.push((target, bundled));
            }
        }
        let some_bundled = targets.iter().any(|(_, bundled)| *bundled);
        let all_bundled = targets.iter().all(|(_, bundled)| *bundled);

        if !all_bundled {
            matrix = self.add_indexed_versions(ext, matrix, &targets, some_bundled)?;
        }
        if some_bundled {
            let unbundled = targets
                .iter()
                .filter(|(_, bundled)| !*bundled)
                .map(|(target, _)| {
                    config! {
                        "ext_version" => BUNDLED,
                        "php" => target.php_version.as_str(),
                        "os" => target.os_value(),
                    }
                });
            matrix = matrix.exclude_many(unbundled)?;
        } else {
            matrix = matrix.exclude(config! { "ext_version" => BUNDLED })?;
        }

        matrix = self.narrow_versions(ext, &matrix)?;

        if let Some(fail_list) = self.fail_list {
            // `bundled` is not a version; only a row naming it drops bundled builds
            matrix = fail_list
                .clone()
                .with_sentinels([BUNDLED])
                .filter_matrix(&matrix)
                .context("Failed to apply fail list")?;
        }

        matrix = self.exclude_unmet_requirements(ext, &matrix)?;
        matrix = self.exclude_php_dependencies(ext, &matrix, &php_versions)?;

        if self.config.ignore_existing_images {
            debug!("keeping configurations with existing images");
        } else {
            matrix = self.exclude_existing_images(ext, &matrix)?;
        }

        let matrix = matrix
            .map_values("os", render_os)?
            .implode("platform", ",")?;
        let count = matrix.count();
        info!(ext, count, "final matrix");
        Ok(MatrixOutput { matrix, count })
    }

    fn add_indexed_versions(
        &self,
        ext: &str,
        matrix: Matrix,
        targets: &[(Target, bool)],
        some_bundled: bool,
    ) -> Result<Matrix> {
        let Some(mut versions) = self.source.stable_versions(ext)? else {
            if !self.ipe.is_extension_supported(ext) {
                bail!("Unknown or unsupported extension {ext}");
            }
            if !some_bundled {
                warn!(ext, "extension is neither indexed nor bundled");
            }
            return Ok(matrix);
        };
        let mut seen = HashSet::new();
        versions.retain(|v| v != BUNDLED && seen.insert(v.clone()));
        info!(ext, versions = versions.len(), "indexed stable versions");

        let mut domain = vec![BUNDLED.to_string()];
        domain.extend(versions.iter().cloned());
        let matrix = matrix.with_vars([Variable::new("ext_version", domain)])?;

        let on_bundled = targets
            .iter()
            .filter(|(_, bundled)| *bundled)
            .flat_map(|(target, _)| {
                versions.iter().map(move |version| {
                    config! {
                        "ext_version" => version.as_str(),
                        "php" => target.php_version.as_str(),
                        "os" => target.os_value(),
                    }
                })
            });
        Ok(matrix.exclude_many(on_bundled)?)
    }

    fn narrow_versions(&self, ext: &str, matrix: &Matrix) -> Result<Matrix> {
        let versions = ext_versions(matrix);
        if versions.is_empty() {
            return Ok(matrix.clone());
        }
        let level = self.source.version_level(ext).unwrap_or(DEFAULT_VERSION_LEVEL);
        let latest = version::latest_versions_with_level(&versions, level)
            .with_context(|| format!("Failed to narrow versions of {ext}"))?;
        info!(ext, level, before = versions.len(), after = latest.len(), "narrowed versions");

        let bundled = Value::from(BUNDLED);
        let mut domain: Vec<Value> = matrix
            .variable("ext_version")
            .unwrap_or_default()
            .iter()
            .filter(|v| **v == bundled)
            .cloned()
            .collect();
        domain.extend(latest.into_iter().map(Value::from));
        Ok(matrix
            .with_vars([Variable::new("ext_version", domain)])?
            .cleanup())
    }

    fn exclude_unmet_requirements(&self, ext: &str, matrix: &Matrix) -> Result<Matrix> {
        let requirements = self.ipe.special_requirements(ext);
        if requirements.is_empty() {
            return Ok(matrix.clone());
        }
        let mut failing = Vec::new();
        for config in matrix.configs() {
            let target = Target::from_config(&config)?;
            if let Some(req) = requirements.iter().find(|r| !r.test_target(&target)) {
                debug!(ext, %target, requirement = %req, "requirement not met");
                failing.push(declared(matrix, &config));
            }
        }
        Ok(matrix.exclude_many(failing)?)
    }

    fn exclude_php_dependencies(
        &self,
        ext: &str,
        matrix: &Matrix,
        php_versions: &[&str],
    ) -> Result<Matrix> {
        let mut unsupported = Vec::new();
        for version in ext_versions(matrix) {
            let dependency = self.source.php_dependency(ext, &version)?;
            for php in php_versions {
                if !dependency.satisfied_by(php) {
                    debug!(ext, version, php, "PHP dependency not satisfied");
                    unsupported.push(config! {
                        "ext_version" => version.as_str(),
                        "php" => *php,
                    });
                }
            }
        }
        Ok(matrix.exclude_many(unsupported)?)
    }

    fn exclude_existing_images(&self, ext: &str, matrix: &Matrix) -> Result<Matrix> {
        let mut built = Vec::new();
        for config in matrix.configs() {
            let target = Target::from_config(&config)?;
            let version = config
                .get("ext_version")
                .map(ToString::to_string)
                .unwrap_or_default();
            let name = self.config.image_name(&target, ext, &version);
            let tag = self.config.image_tag(&target, ext, &version);
            let platform = config.get("platform").and_then(Value::as_text);
            if self
                .registry
                .has_image(&self.config.image_namespace, &name, &tag, platform)?
            {
                info!(image = %format!("{name}:{tag}"), platform, "image already exists");
                built.push(declared(matrix, &config));
            }
        }
        Ok(matrix.exclude_many(built)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::catalog::Catalog;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SUPPORTED: &str = "redis 7.4 8.2 8.3\nopcache 8.2 8.3\napcu 8.3\nxdebug 8.3\n";
    const SPECIAL: &str = "redis !7.4-alpine3.20\n";

    const CATALOG: &str = r#"
extensions:
  redis:
    versions: ["6.0.2", "6.0.1", "5.3.7", "5.3.6"]
    php_dependencies:
      "6.0.2": { min: "8.2.0", max: "8.4.99" }
      "6.0.1": { min: "8.2.0", max: "8.4.99" }
  apcu:
    versions: ["5.1.22", "4.0.11", "5.1.23"]
    version_level: 1
bundled:
  "7.4-bookworm": []
  "7.4-alpine3.20": []
  "8.2-bookworm": [opcache]
  "8.2-alpine3.20": [opcache]
  "8.3-bookworm": [opcache]
  "8.3-alpine3.20": []
images:
  - namespace: mlocati
    name: php-ext-redis
    tag: 5.3.7-7.4-bookworm
    platforms: [linux/amd64]
"#;

    fn config() -> Config {
        Config {
            image_domain: "ghcr.io".to_string(),
            image_namespace: "mlocati".to_string(),
            ..Config::default()
        }
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    fn os_targets() -> Vec<(OsId, String)> {
        vec![
            (OsId::Debian, "bookworm".to_string()),
            (OsId::Alpine, "3.20".to_string()),
        ]
    }

    fn build(ext: &str, config: &Config, fail_list: Option<&FailList>) -> Result<MatrixOutput> {
        let catalog = Catalog::from_yaml(CATALOG)?;
        let ipe = IpeData::parse(SUPPORTED, SPECIAL)?;
        let mut workflow = MatrixWorkflow::new(config, &catalog, &catalog, &catalog, &ipe);
        if let Some(fail_list) = fail_list {
            workflow = workflow.with_fail_list(fail_list);
        }
        workflow.build(
            ext,
            &strings(&["7.4", "8.2", "8.3"]),
            &os_targets(),
            &strings(&["linux/amd64", "linux/arm64"]),
        )
    }

    fn configs(output: &MatrixOutput) -> Vec<String> {
        let mut configs: Vec<String> = output
            .matrix
            .configs()
            .map(|c| {
                format!(
                    "{} {} {} {}",
                    c.get("ext_version").map(ToString::to_string).unwrap_or_default(),
                    c.get("php").map(ToString::to_string).unwrap_or_default(),
                    c.get("os").map(ToString::to_string).unwrap_or_default(),
                    c.get("platform").map(ToString::to_string).unwrap_or_default(),
                )
            })
            .collect();
        configs.sort();
        configs
    }

    #[test]
    fn test_indexed_extension() {
        let output = build("redis", &config(), None).unwrap();
        assert_eq!(output.count, output.matrix.count());
        assert_eq!(
            configs(&output),
            vec![
                "5.3.7 7.4 bookworm linux/arm64",
                "5.3.7 8.2 alpine3.20 linux/amd64,linux/arm64",
                "5.3.7 8.2 bookworm linux/amd64,linux/arm64",
                "5.3.7 8.3 alpine3.20 linux/amd64,linux/arm64",
                "5.3.7 8.3 bookworm linux/amd64,linux/arm64",
                "6.0.2 8.2 alpine3.20 linux/amd64,linux/arm64",
                "6.0.2 8.2 bookworm linux/amd64,linux/arm64",
                "6.0.2 8.3 alpine3.20 linux/amd64,linux/arm64",
                "6.0.2 8.3 bookworm linux/amd64,linux/arm64",
            ]
        );
    }

    #[test]
    fn test_ignore_existing_images() {
        let config = Config {
            ignore_existing_images: true,
            ..config()
        };
        let output = build("redis", &config, None).unwrap();
        let expected = "5.3.7 7.4 bookworm linux/amd64,linux/arm64".to_string();
        assert!(configs(&output).contains(&expected));
        assert_eq!(output.count, 9);
    }

    #[test]
    fn test_bundled_only_extension() {
        let output = build("opcache", &config(), None).unwrap();
        assert_eq!(
            configs(&output),
            vec![
                "bundled 8.2 alpine3.20 linux/amd64,linux/arm64",
                "bundled 8.2 bookworm linux/amd64,linux/arm64",
                "bundled 8.3 bookworm linux/amd64,linux/arm64",
            ]
        );
    }

    #[test]
    fn test_unknown_extension() {
        let err = build("nope", &config(), None).unwrap_err();
        assert!(err.to_string().contains("Unknown or unsupported extension nope"));
    }

    #[test]
    fn test_unindexed_supported_extension_is_empty() {
        let output = build("xdebug", &config(), None).unwrap();
        assert_eq!(output.count, 0);
    }

    #[test]
    fn test_version_level_override() {
        let output = build("apcu", &config(), None).unwrap();
        assert_eq!(
            output.matrix.variable("ext_version").unwrap(),
            &[Value::from("5.1.23"), Value::from("4.0.11")]
        );
        assert_eq!(output.count, 4);
    }

    #[test]
    fn test_fail_list() {
        let fail_list = FailList::parse(
            "ext\text_version\tphp\tos\tplatform\nredis\t5.3.7\t8.3\t\t\n",
            Some("redis"),
        )
        .unwrap();
        let output = build("redis", &config(), Some(&fail_list)).unwrap();
        assert!(configs(&output).iter().all(|c| !c.starts_with("5.3.7 8.3")));
        assert_eq!(output.count, 7);
    }

    #[test]
    fn test_fail_list_ranges_spare_bundled_builds() {
        let fail_list =
            FailList::parse("ext\text_version\nopcache\t>=1.0\n", Some("opcache")).unwrap();
        let output = build("opcache", &config(), Some(&fail_list)).unwrap();
        assert_eq!(output.count, 3);

        let fail_list =
            FailList::parse("ext\text_version\tphp\nopcache\tbundled\t8.2\n", Some("opcache"))
                .unwrap();
        let output = build("opcache", &config(), Some(&fail_list)).unwrap();
        assert_eq!(configs(&output), vec!["bundled 8.3 bookworm linux/amd64,linux/arm64"]);
    }

    #[test]
    fn test_output_document() {
        let output = build("opcache", &config(), None).unwrap();
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["count"], json!(3));
        assert_eq!(json["matrix"]["ext_version"], json!(["bundled"]));
        assert_eq!(json["matrix"]["php"], json!(["8.2", "8.3"]));
    }
}
