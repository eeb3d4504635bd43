use serde::Deserialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Global configuration for the panel
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Locations of the Nginx configuration managed by the panel
    #[serde(default)]
    pub nginx: NginxConfig,

    /// Container runtime connection settings
    #[serde(default)]
    pub runtime: RuntimeConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Bind address (default: 0.0.0.0)
    #[serde(default = "default_bind_address")]
    pub bind: String,

    /// HTTP port (default: 8080)
    #[serde(default = "default_listen_port")]
    pub port: u16,
}

impl ServerConfig {
    /// Parse the bind address and port into a socket address
    pub fn socket_addr(&self) -> anyhow::Result<SocketAddr> {
        format!("{}:{}", self.bind, self.port)
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind address '{}:{}': {}", self.bind, self.port, e))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind_address(),
            port: default_listen_port(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NginxConfig {
    /// Directory holding the top-level Nginx configuration files
    #[serde(default = "default_config_dir")]
    pub config_dir: PathBuf,

    /// Directory holding one file per site (`<name>.conf` / `<name>.conf.disabled`)
    #[serde(default = "default_sites_dir")]
    pub sites_dir: PathBuf,

    /// Name of the Nginx container to restart and query
    #[serde(default = "default_container_name")]
    pub container: String,
}

impl Default for NginxConfig {
    fn default() -> Self {
        Self {
            config_dir: default_config_dir(),
            sites_dir: default_sites_dir(),
            container: default_container_name(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct RuntimeConfig {
    /// Explicit runtime endpoint, e.g. "unix:///var/run/docker.sock" or "tcp://host:2375".
    /// When unset, DOCKER_HOST is consulted and then the host is probed.
    pub host: Option<String>,

    /// Timeout for runtime API requests in seconds (default: 120)
    #[serde(default = "default_runtime_timeout")]
    pub timeout_secs: u64,
}

impl RuntimeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: None,
            timeout_secs: default_runtime_timeout(),
        }
    }
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_listen_port() -> u16 {
    8080
}

fn default_config_dir() -> PathBuf {
    PathBuf::from("/etc/nginx")
}

fn default_sites_dir() -> PathBuf {
    PathBuf::from("/etc/nginx/conf.d")
}

fn default_container_name() -> String {
    "nginx".to_string()
}

fn default_runtime_timeout() -> u64 {
    120
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate all configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        let mut errors = Vec::new();

        if let Err(e) = self.server.socket_addr() {
            errors.push(e.to_string());
        }
        if self.nginx.config_dir.as_os_str().is_empty() {
            errors.push("nginx.config_dir must not be empty".to_string());
        }
        if self.nginx.sites_dir.as_os_str().is_empty() {
            errors.push("nginx.sites_dir must not be empty".to_string());
        }
        if self.nginx.container.trim().is_empty() {
            errors.push("nginx.container must not be empty".to_string());
        }
        if self.runtime.timeout_secs == 0 {
            errors.push("runtime.timeout_secs must be greater than 0".to_string());
        }
        if let Some(ref host) = self.runtime.host {
            if host.trim().is_empty() {
                errors.push("runtime.host must not be empty when set".to_string());
            }
        }

        if !errors.is_empty() {
            anyhow::bail!("Configuration errors:\n  - {}", errors.join("\n  - "));
        }

        Ok(())
    }
}
