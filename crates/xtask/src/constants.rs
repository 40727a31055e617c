pub const TARGET: &str = "thumbv7em-none-eabihf";
pub const CHIP: &str = "nRF52840_xxAA";

pub const APP_MANIFEST: &str = "crates/bmlite-app/Cargo.toml";
pub const HAL_MANIFEST: &str = "crates/bmlite-hal/Cargo.toml";

pub fn app_elf(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/bmlite-app")
}
