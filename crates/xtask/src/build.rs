use crate::constants::{APP_MANIFEST, HAL_MANIFEST, TARGET};
use anyhow::{Context, Result};
use std::process::Command;

pub fn build_firmware(features: Option<&str>, release: bool) -> Result<()> {
    let mut cargo_build = Command::new("cargo");
    cargo_build
        .arg("build")
        .arg("--no-default-features")
        .arg("--manifest-path")
        .arg(APP_MANIFEST)
        .arg("--target")
        .arg(TARGET);

    if release {
        cargo_build.arg("--release");
    }

    if let Some(features) = features {
        cargo_build.args(["--features", features]);
    }

    let status = cargo_build
        .status()
        .with_context(|| format!("Failed to build {}", APP_MANIFEST))?;

    if !status.success() {
        anyhow::bail!("Build failed for {}", APP_MANIFEST);
    }

    Ok(())
}

/// Run the transport tests on the host, where the mocks live.
pub fn test_host(features: Option<&str>) -> Result<()> {
    let mut cargo_test = Command::new("cargo");
    cargo_test.arg("test").arg("--manifest-path").arg(HAL_MANIFEST);

    if let Some(features) = features {
        cargo_test.args(["--features", features]);
    }

    let status = cargo_test
        .status()
        .with_context(|| format!("Failed to test {}", HAL_MANIFEST))?;

    if !status.success() {
        anyhow::bail!("Tests failed for {}", HAL_MANIFEST);
    }

    Ok(())
}
