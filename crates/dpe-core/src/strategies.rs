//! Proptest strategies for matrices and versions.
//!
//! Enabled for this crate's tests and, for dependents, through the
//! `testing` feature.

use crate::matrix::{Matrix, Variable};
use crate::rules::{ExcludeRule, IncludeRule};
use crate::value::Configuration;
use proptest::prelude::*;

const NAMES: [&str; 3] = ["a", "b", "c"];

/// Matrices of one to three variables with up to four random exclude rules
/// and up to two include rules, imploded on the last variable about half the
/// time.
///
/// Values are `<name><index>` strings, so rules always reference declared
/// keys and may or may not hit live values. Include rules always set the
/// first variable and may pick a value outside its domain, which makes them
/// standalone.
pub fn arb_matrix() -> impl Strategy<Value = Matrix> {
    (
        1usize..=3,
        prop::collection::vec(1usize..=3, 3),
        prop::collection::vec(arb_partial(), 0..5),
        prop::collection::vec((arb_partial(), 0usize..4, any::<bool>()), 0..3),
        any::<bool>(),
    )
        .prop_map(|(count, sizes, raw_excludes, raw_includes, implode)| {
            let value = |i: usize, pick: usize| format!("{}{pick}", NAMES[i]);
            let variables: Vec<Variable> = (0..count)
                .map(|i| Variable::new(NAMES[i], (0..sizes[i]).map(|j| value(i, j))))
                .collect();
            let partial = |(mask, picks): &(Vec<bool>, Vec<usize>)| {
                (0..count)
                    .filter(|&i| mask[i])
                    .map(|i| (NAMES[i], value(i, picks[i] % sizes[i])))
                    .collect::<Configuration>()
            };
            let excludes = raw_excludes.iter().map(partial).map(ExcludeRule::new).collect();
            let includes = raw_includes
                .iter()
                .map(|(raw, first, flag)| {
                    let mut config = partial(raw);
                    config.insert(NAMES[0], value(0, *first));
                    config.insert("flag", *flag);
                    IncludeRule::new(config)
                })
                .collect();

            let matrix = Matrix::with_rules(variables, excludes, includes)
                .unwrap_or_else(|e| panic!("generated matrix is invalid: {e}"));
            if implode && count > 1 {
                matrix
                    .implode(NAMES[count - 1], ",")
                    .unwrap_or_else(|e| panic!("generated matrix cannot implode: {e}"))
            } else {
                matrix
            }
        })
}

fn arb_partial() -> impl Strategy<Value = (Vec<bool>, Vec<usize>)> {
    (
        prop::collection::vec(any::<bool>(), 3),
        prop::collection::vec(0usize..3, 3),
    )
}

/// Dotted numeric versions with an optional release-stage suffix
pub fn arb_version() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(0u16..20, 1..4),
        prop::option::of((prop::sample::select(vec!["dev", "alpha", "beta", "RC"]), 0u8..5)),
    )
        .prop_map(|(numbers, suffix)| {
            let mut version = numbers
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(".");
            if let Some((stage, n)) = suffix {
                version.push_str(&format!("-{stage}{n}"));
            }
            version
        })
}
