// ABOUTME: List command printing every registered table serializer
// ABOUTME: Includes custom tables from the config file when one is given

use crate::config;
use crate::serializers::{TableSerializer, WriteMode};
use anyhow::Result;
use std::path::Path;

fn describe(serializer: &TableSerializer) -> String {
    let mode = match serializer.mode {
        WriteMode::Bulk => "bulk",
        WriteMode::Batched { .. } => "batched",
    };
    format!(
        "{:<28} {:<11} {:<8} {}",
        serializer.name,
        serializer.group.as_str(),
        mode,
        serializer.file_name()
    )
}

pub fn list(config_path: Option<&Path>) -> Result<()> {
    let config = config_path.map(config::load_config_from_file).transpose()?;
    let serializers = config::registry(config.as_ref())?;

    println!("{:<28} {:<11} {:<8} FILE", "NAME", "GROUP", "MODE");
    for serializer in &serializers {
        println!("{}", describe(serializer));
    }
    println!();
    println!("{} table(s)", serializers.len());
    Ok(())
}
