//! Diff computation between two environments.
//!
//! Variables are compared by name and value; secrets can only be compared
//! by name because the platform never returns their values.
//!
//! Iteration order is deterministic: buckets follow the order in which
//! names first appear in the fetched lists, so the rendered remediation
//! file is stable for the same remote state.

use crate::backend::Backend;
use crate::error::Result;
use crate::types::{RepoRef, SecretMeta, Variable};
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A variable present on both sides with different values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedVariable {
    /// Variable name.
    pub name: String,
    /// Value in the source environment.
    pub source_value: String,
    /// Value in the compare environment.
    pub compare_value: String,
}

/// Variable buckets of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VariableDiff {
    /// Present only in the source environment.
    pub source_only: Vec<Variable>,
    /// Present only in the compare environment.
    pub compare_only: Vec<Variable>,
    /// Present in both with different values.
    pub value_changed: Vec<ChangedVariable>,
}

impl VariableDiff {
    /// Whether both sides hold the same variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_only.is_empty() && self.compare_only.is_empty() && self.value_changed.is_empty()
    }
}

/// Secret-name buckets of a diff.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SecretDiff {
    /// Secret names only in the source environment.
    pub source_only_names: Vec<String>,
    /// Secret names only in the compare environment.
    pub compare_only_names: Vec<String>,
}

impl SecretDiff {
    /// Whether both sides hold the same secret names.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.source_only_names.is_empty() && self.compare_only_names.is_empty()
    }
}

/// Full difference between a source and a compare environment.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DiffResults {
    /// Variable differences.
    pub variables: VariableDiff,
    /// Secret-name differences.
    pub secrets: SecretDiff,
    /// Name of the source environment.
    pub source_env: String,
    /// Name of the compare environment.
    pub compare_env: String,
}

impl DiffResults {
    /// Whether no bucket holds an entry.
    #[must_use]
    pub fn is_identical(&self) -> bool {
        self.variables.is_empty() && self.secrets.is_empty()
    }

    /// Number of entries across all buckets.
    #[must_use]
    pub fn total(&self) -> usize {
        self.variables.source_only.len()
            + self.variables.compare_only.len()
            + self.variables.value_changed.len()
            + self.secrets.source_only_names.len()
            + self.secrets.compare_only_names.len()
    }
}

/// Name to value mapping that remembers first-insertion order.
///
/// A repeated name keeps its first position and takes the last value.
struct OrderedVars<'a> {
    order: Vec<&'a str>,
    values: HashMap<&'a str, &'a str>,
}

impl<'a> OrderedVars<'a> {
    fn new(vars: &'a [Variable]) -> Self {
        let mut order = Vec::with_capacity(vars.len());
        let mut values = HashMap::with_capacity(vars.len());
        for var in vars {
            if values.insert(var.name.as_str(), var.value.as_str()).is_none() {
                order.push(var.name.as_str());
            }
        }
        Self { order, values }
    }

    fn iter(&self) -> impl Iterator<Item = (&'a str, &'a str)> + '_ {
        self.order.iter().map(|name| (*name, self.values[name]))
    }

    fn get(&self, name: &str) -> Option<&'a str> {
        self.values.get(name).copied()
    }
}

/// Classify variables into source-only, compare-only and changed buckets.
pub fn diff_variables(source: &[Variable], compare: &[Variable]) -> VariableDiff {
    let source = OrderedVars::new(source);
    let compare = OrderedVars::new(compare);
    let mut diff = VariableDiff::default();

    for (name, source_value) in source.iter() {
        match compare.get(name) {
            Some(compare_value) if compare_value == source_value => {}
            Some(compare_value) => diff.value_changed.push(ChangedVariable {
                name: name.to_string(),
                source_value: source_value.to_string(),
                compare_value: compare_value.to_string(),
            }),
            None => diff.source_only.push(Variable::new(name, source_value)),
        }
    }

    for (name, compare_value) in compare.iter() {
        if source.get(name).is_none() {
            diff.compare_only.push(Variable::new(name, compare_value));
        }
    }

    diff
}

/// Names in `left` missing from `right`, first occurrence order, no repeats.
fn missing_names<'a>(left: &'a [SecretMeta], right: &HashSet<&str>) -> Vec<String> {
    let mut seen = HashSet::new();
    left.iter()
        .map(|s| s.name.as_str())
        .filter(|name| !right.contains(name) && seen.insert(*name))
        .map(str::to_string)
        .collect()
}

/// Classify secret names. Only names are read, never any value.
pub fn diff_secret_names(source: &[SecretMeta], compare: &[SecretMeta]) -> SecretDiff {
    let source_set: HashSet<&str> = source.iter().map(|s| s.name.as_str()).collect();
    let compare_set: HashSet<&str> = compare.iter().map(|s| s.name.as_str()).collect();

    SecretDiff {
        source_only_names: missing_names(source, &compare_set),
        compare_only_names: missing_names(compare, &source_set),
    }
}

/// Fetch both environments and compute their difference.
///
/// The four reads run concurrently. If any of them fails the whole diff
/// fails with that error; no partial result is produced.
pub fn compare_environments(
    backend: &dyn Backend,
    repo: &RepoRef,
    source_env: &str,
    compare_env: &str,
) -> Result<DiffResults> {
    log::info!("diffing '{source_env}' against '{compare_env}' in {repo}");

    let ((source_vars, compare_vars), (source_secrets, compare_secrets)) = rayon::join(
        || {
            rayon::join(
                || backend.list_variables(repo, source_env),
                || backend.list_variables(repo, compare_env),
            )
        },
        || {
            rayon::join(
                || backend.list_secret_names(repo, source_env),
                || backend.list_secret_names(repo, compare_env),
            )
        },
    );
    let (source_vars, compare_vars) = (source_vars?, compare_vars?);
    let (source_secrets, compare_secrets) = (source_secrets?, compare_secrets?);

    Ok(DiffResults {
        variables: diff_variables(&source_vars, &compare_vars),
        secrets: diff_secret_names(&source_secrets, &compare_secrets),
        source_env: source_env.to_string(),
        compare_env: compare_env.to_string(),
    })
}
