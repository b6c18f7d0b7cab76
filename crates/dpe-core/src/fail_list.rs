//! Known-failure filtering.
//!
//! A fail list is a tab-separated table. The header names the columns; each
//! following row describes configurations known not to build. Version
//! columns accept an operator prefix (`<`, `<=`, `>`, `>=`, `=`, `~`) and
//! default to `~`; every other column is matched literally. Cells may list
//! several comma-separated alternatives.
//!
//! ```text
//! ext	php	os	ext_version
//! # comment rows start with '#'
//! redis	<7.4		>=6.0
//! ```

use crate::error::FailListError;
use crate::matrix::Matrix;
use crate::value::{Configuration, Value};
use crate::version::{CompareOp, satisfies};
use std::path::Path;
use tracing::{debug, info};

/// Columns compared with version semantics unless reconfigured
pub const DEFAULT_VERSION_COLUMNS: [&str; 2] = ["php", "ext_version"];

/// Column naming the extension a row applies to
const EXT_COLUMN: &str = "ext";

/// One row of a fail list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailRecord {
    /// 1-based line number in the source table
    pub line: usize,
    /// Column/cell pairs in header order, padded to the header width
    pub cells: Vec<(String, String)>,
}

impl FailRecord {
    /// Cell for `column`
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&str> {
        self.cells
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug)]
enum Alternative<'a> {
    Version(CompareOp, &'a str),
    Literal(&'a str),
}

impl Alternative<'_> {
    fn matches(&self, value: &Value, sentinels: &[String]) -> bool {
        let text = value.to_string();
        match self {
            Self::Version(_, bound) if sentinels.contains(&text) => text == *bound,
            Self::Version(op, bound) => satisfies(&text, *op, bound),
            Self::Literal(expected) => text == *expected,
        }
    }
}

/// A parsed fail list
#[derive(Debug, Clone)]
pub struct FailList {
    records: Vec<FailRecord>,
    version_columns: Vec<String>,
    sentinels: Vec<String>,
}

impl FailList {
    /// Parses a tab-separated table.
    ///
    /// With `ext_filter`, only rows whose `ext` cell equals it are kept.
    ///
    /// # Errors
    ///
    /// [`FailListError::MissingHeader`] if the table is empty.
    pub fn parse(tsv: &str, ext_filter: Option<&str>) -> Result<Self, FailListError> {
        let mut lines = tsv
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim_end_matches('\r')))
            .filter(|(_, line)| !line.trim().is_empty());

        let (_, header) = lines.next().ok_or(FailListError::MissingHeader)?;
        let header: Vec<String> = header.split('\t').map(|c| c.trim().to_string()).collect();

        let mut records = Vec::new();
        for (line, row) in lines {
            if row.starts_with('#') {
                continue;
            }
            let mut cells = row.split('\t').map(str::trim);
            let record = FailRecord {
                line,
                cells: header
                    .iter()
                    .map(|column| (column.clone(), cells.next().unwrap_or_default().to_string()))
                    .collect(),
            };
            if let Some(ext) = ext_filter {
                if record.get(EXT_COLUMN) != Some(ext) {
                    continue;
                }
            }
            records.push(record);
        }

        debug!(records = records.len(), ext = ?ext_filter, "parsed fail list");
        Ok(Self {
            records,
            version_columns: DEFAULT_VERSION_COLUMNS.iter().map(ToString::to_string).collect(),
            sentinels: Vec::new(),
        })
    }

    /// Reads and parses a fail list file
    ///
    /// # Errors
    ///
    /// IO failures and the errors of [`FailList::parse`].
    pub fn from_file(
        path: impl AsRef<Path>,
        ext_filter: Option<&str>,
    ) -> Result<Self, FailListError> {
        let path = path.as_ref();
        let tsv = std::fs::read_to_string(path).map_err(|source| FailListError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::parse(&tsv, ext_filter)
    }

    /// Replaces the set of version-valued columns
    #[must_use]
    pub fn with_version_columns<S: Into<String>>(
        mut self,
        columns: impl IntoIterator<Item = S>,
    ) -> Self {
        self.version_columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Marks values of version columns that are not versions, such as
    /// `bundled`.
    ///
    /// A sentinel never satisfies a version range; it only matches a cell
    /// that names it exactly.
    #[must_use]
    pub fn with_sentinels<S: Into<String>>(mut self, values: impl IntoIterator<Item = S>) -> Self {
        self.sentinels = values.into_iter().map(Into::into).collect();
        self
    }

    /// Parsed rows
    #[must_use]
    pub fn records(&self) -> &[FailRecord] {
        &self.records
    }

    /// Number of rows
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True if no rows survived parsing
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn predicates<'a>(
        &self,
        record: &'a FailRecord,
    ) -> Result<Vec<(&'a str, Vec<Alternative<'a>>)>, FailListError> {
        let mut predicates = Vec::new();
        for (column, cell) in &record.cells {
            if column == EXT_COLUMN || cell.is_empty() {
                continue;
            }
            let is_version = self.version_columns.iter().any(|c| c == column);
            let mut alternatives = Vec::new();
            for item in cell.split(',').map(str::trim) {
                if is_version {
                    let (op, bound) =
                        CompareOp::strip_prefix(item).unwrap_or((CompareOp::Approx, item));
                    alternatives.push(Alternative::Version(op, bound));
                } else if item.starts_with(['<', '>', '=', '~', '!']) {
                    return Err(FailListError::OperatorOnLiteral {
                        line: record.line,
                        column: column.clone(),
                        value: cell.clone(),
                    });
                } else {
                    alternatives.push(Alternative::Literal(item));
                }
            }
            predicates.push((column.as_str(), alternatives));
        }
        Ok(predicates)
    }

    /// Excludes every configuration of `matrix` that a row describes.
    ///
    /// Rows apply in order, each against the matrix left by the previous
    /// one. Excluded configurations are projected onto the declared
    /// variables first.
    ///
    /// # Errors
    ///
    /// [`FailListError::OperatorOnLiteral`] for an operator on a literal
    /// column; matrix errors are propagated.
    pub fn filter_matrix(&self, matrix: &Matrix) -> Result<Matrix, FailListError> {
        let mut matrix = matrix.clone();
        let before = matrix.count();

        for record in &self.records {
            let predicates = self.predicates(record)?;
            let names: Vec<String> = matrix.names().map(ToString::to_string).collect();
            let matching: Vec<Configuration> = matrix
                .configs()
                .filter(|config| {
                    predicates.iter().all(|(column, alternatives)| {
                        config
                            .get(column)
                            .is_some_and(|value| {
                                alternatives.iter().any(|a| a.matches(value, &self.sentinels))
                            })
                    })
                })
                .map(|config| config.project(names.iter().map(String::as_str)))
                .collect();

            if matching.is_empty() {
                continue;
            }
            debug!(line = record.line, excluded = matching.len(), "fail list row matched");
            matrix = matrix.exclude_many(matching)?;
        }

        info!(before, after = matrix.count(), "applied fail list");
        Ok(matrix)
    }
}
