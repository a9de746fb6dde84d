//! Statistics reporting.

use console::style;

use crate::audit::{AuditReport, CompletenessReport, ConsistencyReport};
use crate::download::BatchReport;

fn rule() {
    println!("{}", style("═".repeat(50)).dim());
}

/// Print the totals of a download run.
pub fn print_batch_report(report: &BatchReport) {
    println!();
    rule();
    println!("{}", style("Download Statistics:").bold());
    println!("  Tasks:       {}", report.total_tasks);
    println!("  Downloaded:  {}", style(report.downloaded).green());
    println!("  Skipped:     {} (already present)", report.skipped);
    if !report.abandoned.is_empty() {
        println!(
            "  Abandoned:   {}",
            style(report.abandoned.len()).yellow()
        );
    }
    if !report.failed.is_empty() {
        println!("  Failed:      {}", style(report.failed.len()).red());
    }
    println!("  Attempts:    {}", report.attempts);
    println!("  Rate limits: {}", report.rate_limited);
    println!("  Bytes:       {}", report.bytes);

    if let Some(finished) = report.finished_at {
        let elapsed = finished - report.started_at;
        println!("  Elapsed:     {}s", elapsed.num_seconds());
    }

    for task in &report.abandoned {
        println!(
            "    {} {} (HTTP {})",
            style("abandoned").yellow(),
            task.file_name,
            task.status
        );
    }
    for task in &report.failed {
        println!("    {} {}: {}", style("failed").red(), task.file_name, task.error);
    }
    if let Some(reason) = &report.aborted {
        println!("  {} {}", style("Run stopped:").red().bold(), reason);
    }
    rule();
}

/// Print the totals of an integrity audit.
pub fn print_audit_report(report: &AuditReport) {
    println!();
    rule();
    println!("{}", style("Audit Results:").bold());
    println!("  Total files:  {}", report.total());
    println!("  Valid:        {}", style(report.valid).green());
    println!("  Empty:        {}", report.empty);
    println!("  Corrupt:      {}", report.corrupt);
    println!("  Unrecognized: {}", report.unrecognized);

    if report.removed.is_empty() && report.undeleted.is_empty() {
        println!("  {}", style("No corrupted or empty files found.").green());
    } else {
        let verb = if report.dry_run {
            "Would delete"
        } else {
            "Deleted"
        };
        println!("  {} {} bad files:", verb, report.removed.len());
        for path in &report.removed {
            println!("    {}", path.display());
        }
        for path in &report.undeleted {
            println!("    {} {}", style("could not delete").red(), path.display());
        }
        if !report.dry_run {
            println!(
                "  {}",
                style("Run `hms-mirror download` again to fetch them.").yellow()
            );
        }
    }
    rule();
}

/// Print folder/label conflicts, at most `limit` unique pairs.
pub fn print_consistency_report(report: &ConsistencyReport, limit: usize) {
    println!();
    rule();
    println!("{}", style("Consistency Check:").bold());
    println!("  Files checked: {}", report.total_checked);
    println!("  Inconsistent:  {}", report.mismatches.len());

    let conflicts = report.unique_conflicts(limit);
    if !conflicts.is_empty() {
        println!("  Unique conflicts (label -> folder):");
        for (label, folder) in conflicts {
            println!("    {} -> {}", style(label).yellow(), folder);
        }
    }
    rule();
}

/// Print manifest coverage with the first `limit` missing names.
pub fn print_completeness_report(report: &CompletenessReport, limit: usize) {
    println!();
    rule();
    println!("{}", style("Completeness Check:").bold());
    println!("  Expected: {}", report.expected);
    println!("  On disk:  {}", report.actual);

    if report.is_complete() {
        println!("  {}", style("All files from links are present.").green());
    } else {
        println!("  Missing:  {}", style(report.missing.len()).red());
        for name in report.missing.iter().take(limit) {
            println!("    {}", name);
        }
    }
    rule();
}
