use anyhow::{Context, Result};
use std::process::Command;

use crate::constants::CHIP;

/// Stream RTT output from the firmware at `elf_path` until interrupted.
pub fn run(elf_path: &str) -> Result<()> {
    let mut cmd = Command::new("probe-rs");
    cmd.args(["attach", "--chip", CHIP, elf_path]);

    let status = cmd.status().context("Failed to attach probe-rs")?;

    if !status.success() {
        anyhow::bail!("probe-rs attach failed");
    }

    Ok(())
}
