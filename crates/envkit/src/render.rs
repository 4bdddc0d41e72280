//! Remediation content generated from a diff.
//!
//! The output is a dotenv snippet that, once applied to the compare
//! environment, brings it in line with the source. Nothing here writes to
//! disk; callers print the returned string.

use crate::diff::DiffResults;
use crate::dotenv::{format_entry, quote_value};
use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt::Write;

/// Format a timestamp the way every generated file header does.
#[must_use]
pub fn timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Render the remediation dotenv content for a diff.
///
/// Output is byte-identical for identical `results` and `generated_at`.
///
/// # Example
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use envkit::diff::DiffResults;
/// use envkit::render::remediation;
///
/// let results = DiffResults {
///     source_env: "prod".into(),
///     compare_env: "staging".into(),
///     ..DiffResults::default()
/// };
/// let ts = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
/// let content = remediation(&results, ts);
/// assert!(content.starts_with("# .env content to help align 'staging' with 'prod'\n"));
/// assert!(content.ends_with("# End of generated .env content.\n"));
/// ```
#[must_use]
pub fn remediation(results: &DiffResults, generated_at: DateTime<Utc>) -> String {
    let source = &results.source_env;
    let compare = &results.compare_env;
    let vars = &results.variables;
    let secrets = &results.secrets;

    let mut out = String::new();
    writeln!(out, "# .env content to help align '{compare}' with '{source}'").unwrap();
    writeln!(out, "# Generated on {}", timestamp(generated_at)).unwrap();
    writeln!(out).unwrap();

    let mut emitted = false;

    if !vars.source_only.is_empty() || !vars.value_changed.is_empty() {
        writeln!(
            out,
            "## Variables to Add or Update in '{compare}' (from '{source}') ##"
        )
        .unwrap();
        for var in &vars.source_only {
            writeln!(out, "{}", format_entry(&var.name, &var.value)).unwrap();
        }
        for changed in &vars.value_changed {
            writeln!(
                out,
                "{} # Previous value in '{compare}': {}",
                format_entry(&changed.name, &changed.source_value),
                quote_value(&changed.compare_value)
            )
            .unwrap();
        }
        writeln!(out).unwrap();
        emitted = true;
    }

    if !secrets.source_only_names.is_empty() {
        writeln!(
            out,
            "## Secrets to Add in '{compare}' (names from '{source}', values must be set manually) ##"
        )
        .unwrap();
        for name in &secrets.source_only_names {
            writeln!(out, "{name}= # Add value manually").unwrap();
        }
        writeln!(out).unwrap();
        emitted = true;
    }

    if !vars.compare_only.is_empty() {
        writeln!(
            out,
            "## Variables present ONLY in '{compare}' (not in '{source}') ##"
        )
        .unwrap();
        for var in &vars.compare_only {
            writeln!(
                out,
                "# {} # Only in '{compare}'",
                format_entry(&var.name, &var.value)
            )
            .unwrap();
        }
        writeln!(out).unwrap();
        emitted = true;
    }

    if !secrets.compare_only_names.is_empty() {
        writeln!(
            out,
            "## Secret names present ONLY in '{compare}' (not in '{source}') ##"
        )
        .unwrap();
        for name in &secrets.compare_only_names {
            writeln!(out, "# {name}= # Only in '{compare}'").unwrap();
        }
        writeln!(out).unwrap();
        emitted = true;
    }

    if !emitted {
        writeln!(
            out,
            "# No differences found that require updating '{compare}' based on '{source}', or items only in '{compare}'."
        )
        .unwrap();
    }
    out.push_str("# End of generated .env content.\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{ChangedVariable, SecretDiff, VariableDiff};
    use crate::dotenv::parse_str;
    use crate::types::Variable;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 17, 9, 30, 0).unwrap()
    }

    fn scenario() -> DiffResults {
        DiffResults {
            variables: VariableDiff {
                source_only: vec![Variable::new("NEW_FLAG", "on")],
                compare_only: vec![Variable::new("C", "4")],
                value_changed: vec![ChangedVariable {
                    name: "B".into(),
                    source_value: "1".into(),
                    compare_value: "3".into(),
                }],
            },
            secrets: SecretDiff {
                source_only_names: vec!["S1".into()],
                compare_only_names: vec!["S2".into()],
            },
            source_env: "prod".into(),
            compare_env: "staging".into(),
        }
    }

    #[test]
    fn test_timestamp_format() {
        assert_eq!(timestamp(ts()), "2024-05-17T09:30:00.000Z");
    }

    #[test]
    fn test_remediation_full() {
        let expected = "\
# .env content to help align 'staging' with 'prod'
# Generated on 2024-05-17T09:30:00.000Z

## Variables to Add or Update in 'staging' (from 'prod') ##
NEW_FLAG=on
B=1 # Previous value in 'staging': 3

## Secrets to Add in 'staging' (names from 'prod', values must be set manually) ##
S1= # Add value manually

## Variables present ONLY in 'staging' (not in 'prod') ##
# C=4 # Only in 'staging'

## Secret names present ONLY in 'staging' (not in 'prod') ##
# S2= # Only in 'staging'

# End of generated .env content.
";
        assert_eq!(remediation(&scenario(), ts()), expected);
    }

    #[test]
    fn test_remediation_is_stable() {
        let results = scenario();
        assert_eq!(remediation(&results, ts()), remediation(&results, ts()));
    }

    #[test]
    fn test_remediation_no_differences() {
        let results = DiffResults {
            source_env: "a".into(),
            compare_env: "b".into(),
            ..DiffResults::default()
        };
        let expected = "\
# .env content to help align 'b' with 'a'
# Generated on 2024-05-17T09:30:00.000Z

# No differences found that require updating 'b' based on 'a', or items only in 'b'.
# End of generated .env content.
";
        assert_eq!(remediation(&results, ts()), expected);
    }

    #[test]
    fn test_remediation_only_compare_side() {
        let mut results = DiffResults {
            source_env: "a".into(),
            compare_env: "b".into(),
            ..DiffResults::default()
        };
        results.secrets.compare_only_names.push("LEGACY".into());

        let content = remediation(&results, ts());
        assert!(content.contains("# LEGACY= # Only in 'b'\n"));
        assert!(!content.contains("Variables to Add"));
        assert!(!content.contains("No differences found"));
    }

    #[test]
    fn test_multiline_previous_value_stays_in_comment() {
        let results = DiffResults {
            variables: VariableDiff {
                value_changed: vec![ChangedVariable {
                    name: "K".into(),
                    source_value: "new".into(),
                    compare_value: "old\nINJECTED=1".into(),
                }],
                ..VariableDiff::default()
            },
            source_env: "a".into(),
            compare_env: "b".into(),
            ..DiffResults::default()
        };

        let content = remediation(&results, ts());

        assert!(content.contains("K=new # Previous value in 'b': \"old\\nINJECTED=1\"\n"));
        assert_eq!(parse_str(&content).unwrap(), vec![Variable::new("K", "new")]);
    }

    #[test]
    fn test_remediation_quotes_values() {
        let mut results = scenario();
        results.variables.source_only = vec![Variable::new("MOTD", "hello world")];

        let content = remediation(&results, ts());
        assert!(content.contains("MOTD=\"hello world\"\n"));
    }
}
