//! Output formatting

use std::io::Write;

use anyhow::Result;
use keyshift_credential::platform::SyncInstance;
use keyshift_credential::rotation::{AccountOutcome, ConvergenceOutcome, ScopedChecks};
use keyshift_credential::{RunReport, Secret};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

/// Output format for operation results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Aligned columns
    #[default]
    Table,
    /// Pretty-printed JSON
    Json,
}

fn print_json(out: &mut impl Write, value: &Value) -> Result<()> {
    writeln!(out, "{}", serde_json::to_string_pretty(value)?)?;
    Ok(())
}

fn print_table(out: &mut impl Write, header: &[&str], rows: &[Vec<String>]) -> Result<()> {
    let mut widths: Vec<usize> = header.iter().map(|h| h.len()).collect();
    for row in rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let line = |cells: Vec<&str>| {
        cells
            .iter()
            .zip(&widths)
            .map(|(cell, &width)| format!("{cell:<width$}"))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };
    writeln!(out, "{}", line(header.to_vec()))?;
    for row in rows {
        writeln!(out, "{}", line(row.iter().map(String::as_str).collect()))?;
    }
    Ok(())
}

fn convergence_label(outcome: &ConvergenceOutcome) -> String {
    match outcome {
        ConvergenceOutcome::Converged { polls } => format!("converged ({polls} polls)"),
        ConvergenceOutcome::TimedOut { waited } => format!("timed out after {}s", waited.as_secs()),
        ConvergenceOutcome::Unobservable { reason } => format!("unobservable: {reason}"),
    }
}

fn outcome_json(outcome: &AccountOutcome) -> Value {
    json!({
        "identity": outcome.identity,
        "position": outcome.position,
        "role": outcome.role.map(|r| r.as_str()),
        "state": outcome.state.to_string(),
        "store_writes": outcome.store_writes,
        "converged": outcome.is_converged(),
        "convergence": outcome.convergence.iter().map(convergence_label).collect::<Vec<_>>(),
        "updated": outcome.updated.iter().map(ToString::to_string).collect::<Vec<_>>(),
        "failures": outcome.failures.iter().map(|f| json!({
            "target": f.target.to_string(),
            "error": f.error.to_string(),
        })).collect::<Vec<_>>(),
        "error": outcome.error.as_ref().map(ToString::to_string),
        "errors": outcome.errors().iter().map(ToString::to_string).collect::<Vec<_>>(),
    })
}

/// Print the result of a rotate or propagate-only run
pub fn run_report(out: &mut impl Write, report: &RunReport, format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(
            out,
            &json!({
                "run_id": report.run_id.to_string(),
                "scope": report.scope.to_string(),
                "propagate_only": report.propagate_only,
                "started_at": report.started_at.to_rfc3339(),
                "finished_at": report.finished_at.to_rfc3339(),
                "processed": report.processed,
                "not_found": report.not_found,
                "unconverged": report.unconverged(),
                "clean": report.is_clean(),
                "accounts": report.outcomes.iter().map(outcome_json).collect::<Vec<_>>(),
            }),
        );
    }

    if report.not_found {
        writeln!(out, "Account not found: {}", report.scope)?;
        return Ok(());
    }

    let rows: Vec<Vec<String>> = report
        .outcomes
        .iter()
        .map(|o| {
            vec![
                o.position.to_string(),
                o.identity.clone(),
                o.role.map_or_else(|| "-".to_string(), |r| r.to_string()),
                o.state.to_string(),
                o.store_writes.to_string(),
                if o.is_converged() { "yes" } else { "no" }.to_string(),
                o.updated.len().to_string(),
                o.failures.len().to_string(),
            ]
        })
        .collect();
    print_table(
        out,
        &["#", "IDENTITY", "ROLE", "STATE", "WRITES", "CONVERGED", "UPDATED", "FAILED"],
        &rows,
    )?;

    let failed: Vec<_> = report.failed_targets().collect();
    if !failed.is_empty() {
        writeln!(out)?;
        writeln!(out, "Failed targets:")?;
        for (identity, failure) in failed {
            writeln!(out, "  {identity}  {}  {}", failure.target, failure.error)?;
        }
    }
    for outcome in &report.outcomes {
        if let Some(error) = &outcome.error {
            writeln!(out, "  {}  {error}", outcome.identity)?;
        }
        for convergence in outcome.convergence.iter().filter(|c| !c.is_converged()) {
            writeln!(
                out,
                "  {}  convergence {}",
                outcome.identity,
                convergence_label(convergence)
            )?;
        }
    }
    writeln!(
        out,
        "\nProcessed {} account(s) in {}s",
        report.processed,
        (report.finished_at - report.started_at).num_seconds()
    )?;
    Ok(())
}

/// Print stored secrets, masked unless `reveal`
pub fn secrets(
    out: &mut impl Write,
    checks: &ScopedChecks<Secret>,
    reveal: bool,
    format: OutputFormat,
) -> Result<()> {
    let render = |secret: &Secret| {
        if reveal {
            secret.expose().to_string()
        } else {
            secret.masked()
        }
    };
    scoped(out, checks, format, &["IDENTITY", "SECRET"], |result| match result {
        Ok(secret) => json!(render(secret)),
        Err(error) => json!({ "error": error.to_string() }),
    })
}

/// Print login probe results
pub fn probes(out: &mut impl Write, checks: &ScopedChecks<bool>, format: OutputFormat) -> Result<()> {
    scoped(out, checks, format, &["IDENTITY", "LOGIN"], |result| match result {
        Ok(true) => json!("pass"),
        Ok(false) => json!("fail"),
        Err(error) => json!({ "error": error.to_string() }),
    })
}

/// Print repair-deployment results
pub fn repairs(out: &mut impl Write, checks: &ScopedChecks<()>, format: OutputFormat) -> Result<()> {
    scoped(out, checks, format, &["IDENTITY", "REPAIR"], |result| match result {
        Ok(()) => json!("repaired"),
        Err(error) => json!({ "error": error.to_string() }),
    })
}

fn scoped<T>(
    out: &mut impl Write,
    checks: &ScopedChecks<T>,
    format: OutputFormat,
    header: &[&str],
    cell: impl Fn(&keyshift_credential::PlatformResult<T>) -> Value,
) -> Result<()> {
    if format == OutputFormat::Json {
        let accounts: Vec<Value> = checks
            .checks
            .iter()
            .map(|c| json!({ "identity": c.identity, "result": cell(&c.result) }))
            .collect();
        return print_json(out, &json!({ "not_found": checks.not_found, "accounts": accounts }));
    }

    if checks.not_found {
        writeln!(out, "Account not found")?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = checks
        .checks
        .iter()
        .map(|c| {
            let value = match cell(&c.result) {
                Value::String(s) => s,
                Value::Object(map) => format!(
                    "error: {}",
                    map.get("error").and_then(Value::as_str).unwrap_or_default()
                ),
                other => other.to_string(),
            };
            vec![c.identity.clone(), value]
        })
        .collect();
    print_table(out, header, &rows)
}

/// Print directory-sync instances
pub fn instances(out: &mut impl Write, instances: &[SyncInstance], format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json {
        return print_json(out, &serde_json::to_value(instances)?);
    }
    if instances.is_empty() {
        writeln!(out, "No directory-sync instances")?;
        return Ok(());
    }
    let rows: Vec<Vec<String>> = instances
        .iter()
        .map(|i| vec![i.host.clone(), i.status.to_string()])
        .collect();
    print_table(out, &["HOST", "STATUS"], &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_columns_align() {
        let mut out = Vec::new();
        print_table(
            &mut out,
            &["HOST", "STATUS"],
            &[
                vec!["app01".to_string(), "online".to_string()],
                vec!["search-host".to_string(), "disabled".to_string()],
            ],
        )
        .unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "HOST         STATUS\napp01        online\nsearch-host  disabled\n"
        );
    }
}
