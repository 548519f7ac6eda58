//! Configuration for agentauthd

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use agentauth_demo::ScenarioConfig;

fn expand_env_refs(value: &str) -> anyhow::Result<String> {
    let mut out = String::new();
    let mut rest = value;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let end = after
            .find('}')
            .ok_or_else(|| anyhow::anyhow!("Unclosed env var reference in value: {}", value))?;
        let name = &after[..end];
        if name.is_empty() {
            return Err(anyhow::anyhow!(
                "Empty env var reference in value: {}",
                value
            ));
        }
        let resolved = std::env::var(name)
            .map_err(|_| anyhow::anyhow!("Missing environment variable: {}", name))?;
        out.push_str(&resolved);
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    Ok(out)
}

/// Daemon configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Listen address (e.g., "0.0.0.0:8000")
    #[serde(default = "default_listen")]
    pub listen: String,

    /// Base URL of the AgentAuth authorize/purchase service
    #[serde(default = "default_agentauth_api")]
    pub agentauth_api: String,

    /// Host of the agent messaging network (reported only)
    #[serde(default = "default_network_host")]
    pub network_host: String,

    /// Port of the agent messaging network (reported only)
    #[serde(default = "default_network_port")]
    pub network_port: u16,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable CORS for browser access
    #[serde(default = "default_cors")]
    pub cors_enabled: bool,

    /// Deadline for each call to the AgentAuth service
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Agents, amounts and timing of the demo
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

fn default_listen() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_agentauth_api() -> String {
    "http://127.0.0.1:3000".to_string()
}

fn default_network_host() -> String {
    "localhost".to_string()
}

fn default_network_port() -> u16 {
    8700
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_cors() -> bool {
    true
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            agentauth_api: default_agentauth_api(),
            network_host: default_network_host(),
            network_port: default_network_port(),
            log_level: default_log_level(),
            cors_enabled: default_cors(),
            request_timeout_secs: default_request_timeout_secs(),
            scenario: ScenarioConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;

        let mut config: Config = if path
            .as_ref()
            .extension()
            .is_some_and(|e| e == "yaml" || e == "yml")
        {
            serde_yaml::from_str(&content)?
        } else {
            toml::from_str(&content)?
        };

        config.expand_env_refs()?;
        Ok(config)
    }

    /// Expand `${VAR}` references in string values that commonly carry
    /// deployment-specific endpoints.
    pub fn expand_env_refs(&mut self) -> anyhow::Result<()> {
        self.agentauth_api = expand_env_refs(&self.agentauth_api)?;
        self.network_host = expand_env_refs(&self.network_host)?;
        Ok(())
    }

    /// Apply the environment variables the demo has always honoured.
    pub fn apply_env_overrides(&mut self) -> anyhow::Result<()> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<()> {
        if let Some(api) = lookup("AGENTAUTH_API") {
            self.agentauth_api = api;
        }
        if let Some(host) = lookup("NETWORK_HOST") {
            self.network_host = host;
        }
        if let Some(port) = lookup("NETWORK_PORT") {
            self.network_port = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid NETWORK_PORT {port:?}: {e}"))?;
        }
        if let Some(port) = lookup("PORT") {
            let port: u16 = port
                .trim()
                .parse()
                .map_err(|e| anyhow::anyhow!("Invalid PORT {port:?}: {e}"))?;
            let addr = self.listen_addr()?;
            self.listen = SocketAddr::new(addr.ip(), port).to_string();
        }
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.listen_addr()?;

        let api = self.agentauth_api.trim();
        if !(api.starts_with("http://") || api.starts_with("https://")) {
            return Err(anyhow::anyhow!(
                "agentauth_api must be an http(s) URL, got {:?}",
                self.agentauth_api
            ));
        }

        if self.request_timeout_secs == 0 {
            return Err(anyhow::anyhow!("request_timeout_secs must be > 0"));
        }

        self.scenario.validate()?;
        Ok(())
    }

    pub fn listen_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listen
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid listen address {:?}: {e}", self.listen))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Load from default locations
    pub fn load_default() -> anyhow::Result<Self> {
        let paths = [
            PathBuf::from("/etc/agentauthd/config.yaml"),
            PathBuf::from("/etc/agentauthd/config.toml"),
            dirs::config_dir()
                .map(|d| d.join("agentauthd/config.yaml"))
                .unwrap_or_default(),
            dirs::config_dir()
                .map(|d| d.join("agentauthd/config.toml"))
                .unwrap_or_default(),
            PathBuf::from("./agentauthd.yaml"),
            PathBuf::from("./agentauthd.toml"),
        ];

        let mut errors: Vec<(PathBuf, anyhow::Error)> = Vec::new();
        for path in paths {
            if path.as_os_str().is_empty() || !path.exists() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(config) => {
                    if let Err(err) = config.validate() {
                        errors.push((path, err));
                    } else {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return Ok(config);
                    }
                }
                Err(err) => {
                    errors.push((path, err));
                }
            }
        }

        if !errors.is_empty() {
            let mut msg = String::from("Failed to load agentauthd config from existing file(s):\n");
            for (path, err) in errors {
                msg.push_str(&format!("  - {}: {err}\n", path.display()));
            }
            return Err(anyhow::anyhow!(msg));
        }

        Ok(Self::default())
    }

    /// Get tracing level from config
    pub fn tracing_level(&self) -> tracing::Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => tracing::Level::TRACE,
            "debug" => tracing::Level::DEBUG,
            "info" => tracing::Level::INFO,
            "warn" | "warning" => tracing::Level::WARN,
            "error" => tracing::Level::ERROR,
            _ => tracing::Level::INFO,
        }
    }
}
