use crate::domain::device::DevAddr;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub identity: IdentitySettings,
    pub graph: GraphSettings,
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub dashboard: DashboardSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentitySettings {
    /// Hosted UI domain, e.g. `https://example.auth.ap-southeast-2.amazoncognito.com`
    pub domain: String,
    pub client_id: String,
    #[serde(default)]
    pub client_secret: Option<String>,
    pub redirect_uri: String,
    pub logout_uri: String,
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct GraphSettings {
    pub endpoint: String,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct StorageSettings {
    /// Slots live in memory only when unset.
    #[serde(default)]
    pub dir: Option<PathBuf>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DashboardSettings {
    #[serde(default = "default_devices")]
    pub default_devices: Vec<u32>,
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            default_devices: default_devices(),
            refresh_interval_secs: default_refresh_interval_secs(),
        }
    }
}

impl DashboardSettings {
    pub fn default_devices(&self) -> anyhow::Result<Vec<DevAddr>> {
        let mut devices = Vec::with_capacity(self.default_devices.len());
        for &n in &self.default_devices {
            let addr = DevAddr::try_from(i64::from(n))?;
            if !devices.contains(&addr) {
                devices.push(addr);
            }
        }
        if devices.is_empty() {
            anyhow::bail!("dashboard.default_devices must name at least one device");
        }
        Ok(devices)
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_scopes() -> Vec<String> {
    vec!["email".to_string(), "openid".to_string(), "profile".to_string()]
}

fn default_devices() -> Vec<u32> {
    vec![1]
}

fn default_refresh_interval_secs() -> u64 {
    10
}

/// `config/dashboard.{toml,yaml,json}` overridden by `WILDFIRE__SECTION__KEY`
/// environment variables.
pub fn load_app_config() -> anyhow::Result<AppConfig> {
    load_app_config_from("config/dashboard")
}

pub fn load_app_config_from(path: &str) -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name(path).required(false))
        .add_source(
            config::Environment::with_prefix("WILDFIRE")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.toml");
        std::fs::write(
            &path,
            r#"
[identity]
domain = "https://auth.example.org"
client_id = "client"
redirect_uri = "http://localhost:8080/"
logout_uri = "http://localhost:8080/"

[graph]
endpoint = "https://graph.example.org/graphql"

[dashboard]
default_devices = [3, 1, 3]
"#,
        )
        .unwrap();

        let base = path.with_extension("");
        let config = load_app_config_from(base.to_str().unwrap()).unwrap();
        assert_eq!(config.server.bind, "0.0.0.0:8080");
        assert_eq!(config.identity.scopes, vec!["email", "openid", "profile"]);
        assert_eq!(config.identity.client_secret, None);
        assert!(config.storage.dir.is_none());
        assert_eq!(config.dashboard.refresh_interval(), Duration::from_secs(10));

        let devices: Vec<u32> = config
            .dashboard
            .default_devices()
            .unwrap()
            .into_iter()
            .map(DevAddr::get)
            .collect();
        assert_eq!(devices, vec![3, 1]);
    }

    #[test]
    fn test_default_devices_must_be_positive() {
        let settings = DashboardSettings {
            default_devices: vec![0],
            refresh_interval_secs: 10,
        };
        assert!(settings.default_devices().is_err());

        let settings = DashboardSettings {
            default_devices: vec![],
            refresh_interval_secs: 0,
        };
        assert!(settings.default_devices().is_err());
        assert_eq!(settings.refresh_interval(), Duration::from_secs(1));
    }
}
