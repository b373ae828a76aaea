//! Launch-parameter profile persistence.

use crate::model::LaunchParams;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Location of the saved parameter profile under the user config dir.
pub fn params_path() -> Result<PathBuf> {
    let base = dirs::config_dir().context("no user config directory")?;
    Ok(base.join("redis-console").join("params.json"))
}

/// Load the saved profile; `None` when no profile has been written yet.
pub fn load_params() -> Result<Option<LaunchParams>> {
    load_params_from(&params_path()?)
}

/// Save the given parameters as the profile, returning the written path.
pub fn save_params(params: &LaunchParams) -> Result<PathBuf> {
    let path = params_path()?;
    save_params_to(&path, params)?;
    Ok(path)
}

fn load_params_from(path: &Path) -> Result<Option<LaunchParams>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read_to_string(path)
        .with_context(|| format!("read profile {}", path.display()))?;
    let params: LaunchParams = serde_json::from_str(&data)
        .with_context(|| format!("parse profile {}", path.display()))?;
    Ok(Some(params.normalized()))
}

fn save_params_to(path: &Path, params: &LaunchParams) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create {}", parent.display()))?;
    }
    let data = serde_json::to_string_pretty(params)?;
    std::fs::write(path, data).with_context(|| format!("write profile {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_profile_path(tag: &str) -> PathBuf {
        std::env::temp_dir().join(format!(
            "redis-console-test-{}-{}.json",
            tag,
            std::process::id()
        ))
    }

    #[test]
    fn profile_round_trips() {
        let path = temp_profile_path("roundtrip");
        let params = LaunchParams {
            host: "0.0.0.0".into(),
            port: "7000".into(),
            timeout: "30".into(),
            databases: 4,
            dbfilename: "other.rdb".into(),
        };

        save_params_to(&path, &params).unwrap();
        let loaded = load_params_from(&path).unwrap().unwrap();
        assert_eq!(loaded, params);

        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_profile_loads_as_none() {
        let path = temp_profile_path("missing");
        std::fs::remove_file(&path).ok();
        assert!(load_params_from(&path).unwrap().is_none());
    }

    #[test]
    fn loaded_profile_is_normalized() {
        let path = temp_profile_path("normalize");
        std::fs::write(
            &path,
            r#"{"host":"127.0.0.1","port":"6379","timeout":"0","databases":500,"dbfilename":"dump.rdb"}"#,
        )
        .unwrap();

        let loaded = load_params_from(&path).unwrap().unwrap();
        assert_eq!(loaded.databases, 99);

        std::fs::remove_file(&path).ok();
    }
}
