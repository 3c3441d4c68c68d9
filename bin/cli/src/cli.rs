use colored::Colorize;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets};
use executor::ExecutionResult;

/// Prints the human-readable execution report: a one-line summary
/// followed by a table of every change that was applied or failed.
/// Validation-only (dry-run) results get their own table since they
/// carry a `status` instead of a `resource_id`.
pub fn report(result: &ExecutionResult) {
  if result.dry_run {
    report_dry_run(result);
  } else {
    report_applied(result);
  }

  println!(
    "\n{} {}, {} {}, {} {}",
    result.success_count.to_string().green().bold(),
    if result.dry_run { "would succeed" } else { "succeeded" },
    result.failure_count.to_string().red().bold(),
    if result.dry_run { "would fail" } else { "failed" },
    result.skipped_count.to_string().yellow().bold(),
    "skipped",
  );
}

fn report_applied(result: &ExecutionResult) {
  if !result.changes_applied.is_empty() {
    let mut table = Table::new();
    table
      .load_preset(presets::UTF8_FULL_CONDENSED)
      .set_content_arrangement(ContentArrangement::Dynamic)
      .set_header(vec!["ACTION", "RESOURCE", "REF", "ID"]);
    for change in &result.changes_applied {
      table.add_row(vec![
        Cell::new(change.action.to_string()),
        Cell::new(&change.resource_type),
        Cell::new(&change.resource_ref),
        Cell::new(&change.resource_id),
      ]);
    }
    println!("{table}");
  }

  if !result.errors.is_empty() {
    let mut table = Table::new();
    table
      .load_preset(presets::UTF8_FULL_CONDENSED)
      .set_content_arrangement(ContentArrangement::Dynamic)
      .set_header(vec!["ACTION", "RESOURCE", "REF", "ERROR"]);
    for err in &result.errors {
      table.add_row(vec![
        Cell::new(err.action.to_string()).fg(Color::Red),
        Cell::new(&err.resource_type),
        Cell::new(&err.resource_ref),
        Cell::new(&err.error),
      ]);
    }
    println!("{table}");
  }
}

fn report_dry_run(result: &ExecutionResult) {
  if result.validation_results.is_empty() {
    return;
  }
  let mut table = Table::new();
  table
    .load_preset(presets::UTF8_FULL_CONDENSED)
    .set_content_arrangement(ContentArrangement::Dynamic)
    .set_header(vec!["ACTION", "RESOURCE", "REF", "STATUS", "MESSAGE"]);
  for v in &result.validation_results {
    let status_cell = match v.status {
      executor::ValidationStatus::WouldSucceed => {
        Cell::new("would succeed").fg(Color::Green)
      }
      executor::ValidationStatus::WouldFail => {
        Cell::new("would fail").fg(Color::Red)
      }
    };
    table.add_row(vec![
      Cell::new(v.action.to_string()),
      Cell::new(&v.resource_type),
      Cell::new(&v.resource_ref),
      status_cell,
      Cell::new(v.message.as_deref().unwrap_or("")),
    ]);
  }
  println!("{table}");
}
