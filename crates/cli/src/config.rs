use std::fs;
use std::path::Path;

use rainbow_smooth_core::derainbow::domain::rainbow_smooth::RainbowSmoothParams;

/// Per-field overrides from the command line. `None` keeps the preset value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ParamOverrides {
    pub radius: Option<i32>,
    pub lthresh: Option<i32>,
    pub hthresh: Option<i32>,
}

/// Reads a JSON preset. Missing fields take their defaults.
pub fn load_preset(path: &Path) -> Result<RainbowSmoothParams, Box<dyn std::error::Error>> {
    let json = fs::read_to_string(path)
        .map_err(|e| format!("Cannot read config {}: {e}", path.display()))?;
    let params = serde_json::from_str(&json)
        .map_err(|e| format!("Invalid config {}: {e}", path.display()))?;
    Ok(params)
}

pub fn save_preset(
    path: &Path,
    params: &RainbowSmoothParams,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(params)?)?;
    Ok(())
}

pub fn resolve_params(
    preset: Option<RainbowSmoothParams>,
    overrides: ParamOverrides,
) -> RainbowSmoothParams {
    let base = preset.unwrap_or_default();
    RainbowSmoothParams {
        radius: overrides.radius.unwrap_or(base.radius),
        lthresh: overrides.lthresh.unwrap_or(base.lthresh),
        hthresh: overrides.hthresh.unwrap_or(base.hthresh),
    }
}
