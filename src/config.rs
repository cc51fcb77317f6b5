use crate::rules::RuleOverride;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub devices: DevicesConfig,

    #[serde(default)]
    pub rules: RulesConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// smartctl binary (name on $PATH or absolute path)
    pub smartctl_path: String,
    /// Give up on a device if smartctl has not finished after this many seconds
    pub smartctl_timeout_sec: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DevicesConfig {
    /// Device names to skip; a trailing `*` matches a prefix (e.g. "sdz", "nvme1*")
    pub exclude: Vec<String>,
    /// Friendly names shown in reports: { "sda" = "boot-ssd", "sdb" = "backup-hdd" }
    pub aliases: HashMap<String, String>,
}

/// Per-attribute adjustments to the built-in rule table.
///
/// ```toml
/// [[rules.overrides]]
/// id             = 188   # Command_Timeout
/// value_critical = 5
/// value_warning  = 60
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub overrides: Vec<RuleOverride>,
}

// ── Defaults ─────────────────────────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { smartctl_path: "smartctl".into(), smartctl_timeout_sec: 10 }
    }
}

impl GeneralConfig {
    pub fn smartctl_timeout(&self) -> Duration {
        Duration::from_secs(self.smartctl_timeout_sec.max(1))
    }
}

impl DevicesConfig {
    /// Alias for a device path or bare name, if one is configured.
    pub fn alias(&self, device: &str) -> Option<&str> {
        let name = device.strip_prefix("/dev/").unwrap_or(device);
        self.aliases.get(name).map(String::as_str)
    }
}

// ── Load / Save ───────────────────────────────────────────────────────

impl Config {
    /// Load the user config, falling back to defaults. A missing file is
    /// created with the defaults on first run (best-effort).
    pub fn load() -> Self {
        let path = match Config::config_path() {
            Some(p) => p,
            None    => return Config::default(),
        };
        match Config::load_from(&path) {
            Ok(c)  => c,
            Err(e) => {
                if path.exists() {
                    tracing::warn!("ignoring {}: {:#}", path.display(), e);
                } else {
                    let _ = try_write_defaults(&path);
                }
                Config::default()
            }
        }
    }

    /// Load an explicitly named config file. Errors are not swallowed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let cfg: Config = toml::from_str(&text)
            .with_context(|| format!("parsing {}", path.display()))?;
        Ok(cfg)
    }

    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("diskdoctor").join("diskdoctor.toml"))
    }
}

fn try_write_defaults(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let text = toml::to_string_pretty(&Config::default())?;
    fs::write(path, format!("# diskdoctor configuration\n# Generated on first run - edit freely\n\n{}", text))?;
    Ok(())
}
