//! Container runtime access for restarting and inspecting the Nginx container
//!
//! Endpoint resolution priority:
//! 1. Explicit `runtime.host` from the configuration file
//! 2. DOCKER_HOST environment variable
//! 3. Host detection: rootless Podman on RHEL, the Docker named pipe on
//!    Windows, otherwise the default Docker socket

use crate::error::{PanelError, Result};
use async_trait::async_trait;
use bollard::container::{InspectContainerOptions, RestartContainerOptions};
use bollard::Docker;
use parking_lot::Mutex;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_DOCKER_SOCKET: &str = "/var/run/docker.sock";
const WINDOWS_DOCKER_PIPE: &str = "//./pipe/docker_engine";
const OS_RELEASE_PATH: &str = "/etc/os-release";

/// Where the container runtime API is served
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuntimeEndpoint {
    /// Unix domain socket (Docker or Podman)
    UnixSocket(PathBuf),
    /// Windows named pipe
    NamedPipe(String),
    /// Plain HTTP, e.g. "tcp://127.0.0.1:2375"
    Http(String),
}

impl RuntimeEndpoint {
    /// Parse a DOCKER_HOST style address
    pub fn from_host(host: &str) -> anyhow::Result<Self> {
        if let Some(path) = host.strip_prefix("unix://") {
            Ok(RuntimeEndpoint::UnixSocket(PathBuf::from(path)))
        } else if let Some(pipe) = host.strip_prefix("npipe://") {
            Ok(RuntimeEndpoint::NamedPipe(pipe.to_string()))
        } else if host.starts_with("tcp://") || host.starts_with("http://") {
            Ok(RuntimeEndpoint::Http(host.to_string()))
        } else {
            anyhow::bail!(
                "Invalid runtime host format: '{}'. Expected 'unix:///path/to/socket', \
                 'npipe:////./pipe/name' or 'tcp://host:port'",
                host
            )
        }
    }

    /// Pick an endpoint from what is known about the host
    pub fn detect(os_release: Option<&str>, platform: &str, uid: u32) -> Self {
        let is_rhel = os_release
            .map(|content| content.to_lowercase().contains("rhel"))
            .unwrap_or(false);

        if is_rhel {
            RuntimeEndpoint::UnixSocket(PathBuf::from(format!(
                "/run/user/{}/podman/podman.sock",
                uid
            )))
        } else if platform == "windows" {
            RuntimeEndpoint::NamedPipe(WINDOWS_DOCKER_PIPE.to_string())
        } else {
            RuntimeEndpoint::UnixSocket(PathBuf::from(DEFAULT_DOCKER_SOCKET))
        }
    }

    /// Resolve the endpoint for this process
    pub fn resolve(configured: Option<&str>) -> anyhow::Result<Self> {
        if let Some(host) = configured {
            debug!(host, "Using configured runtime host");
            return Self::from_host(host);
        }
        if let Ok(host) = std::env::var("DOCKER_HOST") {
            debug!(host = %host, "Using DOCKER_HOST");
            return Self::from_host(&host);
        }

        let os_release = std::fs::read_to_string(OS_RELEASE_PATH).ok();
        let endpoint = Self::detect(os_release.as_deref(), std::env::consts::OS, current_uid());
        debug!(platform = std::env::consts::OS, endpoint = %endpoint, "Detected runtime endpoint");
        Ok(endpoint)
    }
}

impl fmt::Display for RuntimeEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuntimeEndpoint::UnixSocket(path) => write!(f, "unix://{}", path.display()),
            RuntimeEndpoint::NamedPipe(pipe) => write!(f, "npipe://{}", pipe),
            RuntimeEndpoint::Http(host) => write!(f, "{}", host),
        }
    }
}

#[cfg(unix)]
fn current_uid() -> u32 {
    unsafe { libc::getuid() }
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    0
}

/// Operations the panel performs against the container runtime
#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    /// Human-readable endpoint description
    fn endpoint(&self) -> String;

    /// Restart a container by name
    async fn restart(&self, container: &str) -> Result<()>;

    /// Current status of a container, e.g. "running" or "exited"
    async fn status(&self, container: &str) -> Result<String>;
}

/// Shared runtime trait object
pub type DynContainerRuntime = Arc<dyn ContainerRuntime>;

/// Docker Engine API client (also serves Podman's compatible API).
///
/// The client is created on first use and cached. A transport failure drops
/// the cached client so the next call connects again. Calls are never retried.
pub struct DockerRuntime {
    endpoint: RuntimeEndpoint,
    timeout: Duration,
    client: Mutex<Option<Docker>>,
}

impl DockerRuntime {
    pub fn new(endpoint: RuntimeEndpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            client: Mutex::new(None),
        }
    }

    fn connect(&self) -> Result<Docker> {
        let timeout = self.timeout.as_secs();
        let result = match &self.endpoint {
            RuntimeEndpoint::UnixSocket(path) => Docker::connect_with_socket(
                &path.to_string_lossy(),
                timeout,
                bollard::API_DEFAULT_VERSION,
            ),
            #[cfg(windows)]
            RuntimeEndpoint::NamedPipe(pipe) => {
                Docker::connect_with_socket(pipe, timeout, bollard::API_DEFAULT_VERSION)
            }
            #[cfg(not(windows))]
            RuntimeEndpoint::NamedPipe(pipe) => {
                return Err(PanelError::RuntimeUnreachable(format!(
                    "named pipe '{}' is only available on Windows",
                    pipe
                )));
            }
            RuntimeEndpoint::Http(host) => {
                Docker::connect_with_http(host, timeout, bollard::API_DEFAULT_VERSION)
            }
        };

        result.map_err(|e| {
            PanelError::RuntimeUnreachable(format!("cannot connect to {}: {}", self.endpoint, e))
        })
    }

    fn client(&self) -> Result<Docker> {
        let mut cached = self.client.lock();
        if let Some(ref client) = *cached {
            return Ok(client.clone());
        }

        let client = self.connect()?;
        info!(endpoint = %self.endpoint, "Connected to container runtime");
        *cached = Some(client.clone());
        Ok(client)
    }

    fn map_error(&self, container: &str, err: bollard::errors::Error) -> PanelError {
        match err {
            bollard::errors::Error::DockerResponseServerError {
                status_code: 404, ..
            } => PanelError::NotFound(format!("container {}", container)),
            bollard::errors::Error::DockerResponseServerError { message, .. } => {
                PanelError::Runtime(message)
            }
            other => {
                warn!(endpoint = %self.endpoint, error = %other, "Container runtime unreachable, dropping client");
                self.client.lock().take();
                PanelError::RuntimeUnreachable(other.to_string())
            }
        }
    }
}

#[async_trait]
impl ContainerRuntime for DockerRuntime {
    fn endpoint(&self) -> String {
        self.endpoint.to_string()
    }

    async fn restart(&self, container: &str) -> Result<()> {
        let client = self.client()?;
        client
            .restart_container(container, None::<RestartContainerOptions>)
            .await
            .map_err(|e| self.map_error(container, e))?;

        info!(container, "Container restarted");
        Ok(())
    }

    async fn status(&self, container: &str) -> Result<String> {
        let client = self.client()?;
        let info = client
            .inspect_container(container, None::<InspectContainerOptions>)
            .await
            .map_err(|e| self.map_error(container, e))?;

        let status = info
            .state
            .and_then(|s| s.status)
            .map(|s| s.to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| "unknown".to_string());

        debug!(container, status = %status, "Container status");
        Ok(status)
    }
}
