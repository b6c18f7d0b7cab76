//! Configuration enumeration.

use super::{Entry, Layout, Matrix};
use crate::product::{Product, product};
use crate::value::{Configuration, Value};

/// Lazy sequence of the configurations a [`Matrix`] produces.
///
/// For a cross-product matrix this is every non-excluded tuple of the
/// product, with matching include rules merged in, followed by each include
/// rule that matched no tuple. A materialized matrix yields its stored
/// entries with their merged includes applied. Every call to
/// [`Matrix::configs`] starts a fresh, identical sequence.
#[derive(Debug, Clone)]
pub struct Configs<'a> {
    matrix: &'a Matrix,
    state: State<'a>,
    include_used: Vec<bool>,
}

#[derive(Debug, Clone)]
enum State<'a> {
    Product(Product<'a, Value>),
    Stored(std::slice::Iter<'a, Entry>),
    Leftover(usize),
}

impl<'a> Configs<'a> {
    pub(super) fn new(matrix: &'a Matrix) -> Self {
        let state = match &matrix.layout {
            Layout::Product => State::Product(product(
                matrix.variables.iter().map(|v| v.values.as_slice()),
            )),
            Layout::Materialized(stored) => State::Stored(stored.iter()),
        };
        Self {
            matrix,
            state,
            include_used: vec![false; matrix.includes.len()],
        }
    }

    fn expand(&mut self, tuple: Vec<&Value>) -> Option<Entry> {
        let base: Configuration = self
            .matrix
            .variables
            .iter()
            .zip(tuple)
            .map(|(var, value)| (var.name.clone(), value.clone()))
            .collect();
        if self.matrix.is_excluded(&base) {
            return None;
        }

        // Matching is decided against the bare tuple, before any merge
        let mut merged = Vec::new();
        for (i, include) in self.matrix.includes.iter().enumerate() {
            if include.matches(&base) {
                merged.push(include.clone());
                self.include_used[i] = true;
            }
        }
        Some(Entry::tuple(base, merged))
    }

    /// Next configuration, still split into its tuple and merged includes
    pub(super) fn next_entry(&mut self) -> Option<Entry> {
        loop {
            match &mut self.state {
                State::Stored(stored) => return stored.next().cloned(),
                State::Product(tuples) => {
                    let Some(tuple) = tuples.next() else {
                        self.state = State::Leftover(0);
                        continue;
                    };
                    if let Some(entry) = self.expand(tuple) {
                        return Some(entry);
                    }
                }
                State::Leftover(index) => {
                    let i = *index;
                    let include = self.matrix.includes.get(i)?;
                    *index += 1;
                    if !self.include_used[i] {
                        return Some(Entry::standalone(include.clone()));
                    }
                }
            }
        }
    }
}

impl Iterator for Configs<'_> {
    type Item = Configuration;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_entry().map(|entry| entry.render())
    }
}
