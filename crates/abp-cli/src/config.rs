//! Optional JSON configuration file (`--config path.json`), merged under
//! whatever the user passed on the command line - CLI flags always win.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Default input filter-list files, used when `--input` is omitted.
    pub inputs: Vec<PathBuf>,
    /// Default output snapshot path, used when `--output` is omitted.
    pub output: Option<PathBuf>,
    /// Tags to enable immediately after compiling (see `$tag=`).
    pub enabled_tags: Vec<String>,
    /// Turn on bad-fingerprint diagnostics on the compiled index.
    #[serde(default)]
    pub bad_fingerprint_detection: bool,
}

impl CliConfig {
    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read config '{}': {e}", path.display()))?;
        serde_json::from_str(&text)
            .map_err(|e| format!("failed to parse config '{}': {e}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_partial_config() {
        let cfg: CliConfig = serde_json::from_str(r#"{"enabled_tags": ["analytics"]}"#).unwrap();
        assert_eq!(cfg.enabled_tags, vec!["analytics".to_string()]);
        assert!(cfg.inputs.is_empty());
        assert!(!cfg.bad_fingerprint_detection);
    }
}
