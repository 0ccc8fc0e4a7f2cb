use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GhostError, Result};

/// User-configurable settings, read from `Ghostfile.toml`. Every field has a
/// default; a missing file simply means running with defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhostConfig {
    /// Package id of the app being protected (default: com.example.vault)
    #[serde(default = "default_app")]
    pub app: String,

    /// Country that triggers the safety gate (default: United States)
    #[serde(default = "default_deny_country")]
    pub deny_country: String,

    /// Timezone identifier restore resets the device to (default: UTC)
    #[serde(default = "default_baseline_timezone")]
    pub baseline_timezone: String,

    /// IP-geolocation endpoint returning at least ip/country/timezone
    #[serde(default = "default_identity_url")]
    pub identity_url: String,

    /// Bridge command the privileged calls are appended to
    #[serde(default = "default_bridge")]
    pub bridge: String,

    /// Fixed SDK level; unset means detect through the bridge
    #[serde(default)]
    pub sdk: Option<u32>,
}

fn default_app() -> String {
    "com.example.vault".to_string()
}

fn default_deny_country() -> String {
    "United States".to_string()
}

fn default_baseline_timezone() -> String {
    "UTC".to_string()
}

fn default_identity_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_bridge() -> String {
    "adb shell su -c".to_string()
}

impl Default for GhostConfig {
    fn default() -> Self {
        Self {
            app: default_app(),
            deny_country: default_deny_country(),
            baseline_timezone: default_baseline_timezone(),
            identity_url: default_identity_url(),
            bridge: default_bridge(),
            sdk: None,
        }
    }
}

impl GhostConfig {
    /// Load configuration from `path`, falling back to defaults when the file
    /// does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| GhostError::Config(format!("read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| GhostError::Config(format!("parse {}: {e}", path.display())))
    }

    /// Write the starter template for `ghostmode init`, refusing to clobber
    /// an existing file.
    pub fn write_template(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(GhostError::Config(format!(
                "{} already exists — delete it first or use a different path",
                path.display()
            )));
        }
        std::fs::write(path, INIT_TEMPLATE)
            .map_err(|e| GhostError::Config(format!("write {}: {e}", path.display())))
    }
}

const INIT_TEMPLATE: &str = r#"# Ghostfile.toml — generated by `ghostmode init`
# Run `ghostmode run` to start a hardened session.

# Package id of the app being protected
app = "com.example.vault"

# Country that triggers the safety gate
deny_country = "United States"

# Timezone identifier restore resets the device to
baseline_timezone = "UTC"

# Geolocation lookup endpoint (must return ip/country/timezone JSON)
identity_url = "http://ip-api.com/json"

# Privileged bridge the commands are appended to
bridge = "adb shell su -c"

# Pin the SDK level instead of detecting it through the bridge
# sdk = 33
"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_defaults() {
        let cfg = GhostConfig::load(Path::new("/nonexistent/Ghostfile.toml")).unwrap();
        assert_eq!(cfg.app, "com.example.vault");
        assert_eq!(cfg.deny_country, "United States");
        assert_eq!(cfg.baseline_timezone, "UTC");
        assert_eq!(cfg.bridge, "adb shell su -c");
        assert_eq!(cfg.sdk, None);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ghostfile.toml");
        std::fs::write(&path, "app = \"org.secure.wallet\"\nsdk = 33\n").unwrap();

        let cfg = GhostConfig::load(&path).unwrap();
        assert_eq!(cfg.app, "org.secure.wallet");
        assert_eq!(cfg.sdk, Some(33));
        assert_eq!(cfg.baseline_timezone, "UTC");
    }

    #[test]
    fn test_bad_toml_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ghostfile.toml");
        std::fs::write(&path, "app = [broken").unwrap();

        let err = GhostConfig::load(&path).unwrap_err();
        assert!(matches!(err, GhostError::Config(_)));
    }

    #[test]
    fn test_template_round_trips_through_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ghostfile.toml");

        GhostConfig::write_template(&path).unwrap();
        let cfg = GhostConfig::load(&path).unwrap();
        assert_eq!(cfg.app, default_app());
        assert_eq!(cfg.identity_url, default_identity_url());
    }

    #[test]
    fn test_template_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Ghostfile.toml");
        std::fs::write(&path, "app = \"keep.me\"\n").unwrap();

        let err = GhostConfig::write_template(&path).unwrap_err();
        assert!(matches!(err, GhostError::Config(_)));
        assert_eq!(GhostConfig::load(&path).unwrap().app, "keep.me");
    }
}
