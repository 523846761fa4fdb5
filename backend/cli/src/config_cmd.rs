use std::path::Path;

use anyhow::{Context, Result};

use parley_config::{apply_all_defaults, load_and_prepare, redact, write_config, ParleyConfig};

use crate::terminal_output::{note_success, note_warn};

/// Print the effective config with secrets masked.
pub async fn show(path: &Path) -> Result<()> {
    let config = load_and_prepare(path).await?;
    let value = serde_json::to_value(&config).context("Failed to serialize config")?;
    print!("{}", serde_yaml::to_string(&redact(&value))?);
    Ok(())
}

pub fn print_path(path: &Path) {
    println!("{}", path.display());
}

/// Write a fully defaulted config file. Refuses to overwrite unless `force`.
pub async fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        note_warn(&format!(
            "{} already exists; pass --force to overwrite (a backup is kept)",
            path.display()
        ));
        return Ok(());
    }
    write_config(&apply_all_defaults(ParleyConfig::default()), path).await?;
    note_success(&format!("Wrote {}", path.display()));
    Ok(())
}
