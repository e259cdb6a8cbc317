// ABOUTME: Interactive terminal prompts for table selection and destructive confirmations
// ABOUTME: Provides a multi-select of tables to export and a confirmation before clearing a target

use crate::serializers::TableSerializer;
use anyhow::{Context, Result};
use dialoguer::{theme::ColorfulTheme, Confirm, MultiSelect};

/// Label shown for one serializer in the selection list
fn item_label(serializer: &TableSerializer) -> String {
    let mode = if serializer.is_batched() { "batched" } else { "bulk" };
    format!("{} [{}, {}]", serializer.name, serializer.group, mode)
}

/// Interactive table selection for an export
///
/// Every table starts selected; the user deselects what to leave out.
/// Returns the chosen serializers in their original (dependency) order, or
/// an empty list if everything was deselected.
pub fn select_serializers(serializers: &[TableSerializer]) -> Result<Vec<TableSerializer>> {
    println!("Select tables to export:");
    println!("(Use arrow keys to navigate, Space to select, Enter to confirm)");
    println!();

    let labels: Vec<String> = serializers.iter().map(item_label).collect();
    let defaults = vec![true; labels.len()];

    let selections = MultiSelect::with_theme(&ColorfulTheme::default())
        .items(&labels)
        .defaults(&defaults)
        .interact()
        .context("Failed to get table selection")?;

    if selections.is_empty() {
        tracing::warn!("⚠ No tables selected");
        return Ok(Vec::new());
    }

    let selected: Vec<TableSerializer> = selections
        .iter()
        .map(|&idx| serializers[idx].clone())
        .collect();

    tracing::info!("✓ Selected {} table(s)", selected.len());
    Ok(selected)
}

/// Ask before deleting existing rows in the target
///
/// Defaults to "no", so pressing Enter cancels.
pub fn confirm_clear(target: &str, tables: usize) -> Result<bool> {
    println!();
    println!(
        "Existing rows in {} table(s) of {} will be DELETED before import.",
        tables, target
    );

    Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt("Proceed?")
        .default(false)
        .interact()
        .context("Failed to get confirmation")
}
