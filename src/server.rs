//! HTTP API and dashboard server

use crate::config::Config;
use crate::dashboard;
use crate::error::{json_error_response, json_response, ApiResponse, PanelError, PanelErrorCode, Result};
use crate::main_config::MainConfig;
use crate::runtime::DynContainerRuntime;
use crate::sites::SiteManager;
use crate::store::FileStore;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as AutoBuilder;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Version information for the panel
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");

/// Body of `POST /api/config/{name}` and `PUT /api/domain/{name}`
#[derive(Debug, Deserialize)]
pub struct FileRequest {
    pub file: String,
}

/// Body of `POST /api/domain/{name}/enable`
#[derive(Debug, Deserialize)]
pub struct EnableRequest {
    pub enable: bool,
}

/// A main configuration file
#[derive(Debug, Serialize)]
pub struct ConfigFileView {
    pub name: String,
    pub file: String,
}

/// A site as returned by `GET /api/domain/{name}`
#[derive(Debug, Serialize)]
pub struct DomainView {
    pub name: String,
    pub file: String,
    pub enabled: bool,
    pub exists: bool,
}

/// Status of the managed container
#[derive(Debug, Serialize)]
pub struct ContainerStatusView {
    pub container: String,
    pub status: String,
    /// Engine endpoint the status was read from
    pub endpoint: String,
}

/// Routes understood by the panel
#[derive(Debug, Clone, PartialEq, Eq)]
enum Route {
    Index,
    Health,
    Version,
    Css,
    Js,
    ConfigList,
    Config(String),
    Domains,
    Domain(String),
    DomainEnable(String),
    RestartNginx,
    StatusNginx,
}

impl Route {
    /// Match a request path, percent-decoding name segments
    fn parse(path: &str) -> Result<Option<Self>> {
        let trimmed = path.trim_start_matches('/');
        let segments: Vec<&str> = if trimmed.is_empty() {
            Vec::new()
        } else {
            trimmed.split('/').collect()
        };

        let route = match segments.as_slice() {
            [] => Route::Index,
            ["health"] => Route::Health,
            ["version"] => Route::Version,
            ["static", "panel.css"] => Route::Css,
            ["static", "panel.js"] => Route::Js,
            ["api", "config"] => Route::ConfigList,
            ["api", "config", name] => Route::Config(decode_segment(name)?),
            ["api", "domains"] => Route::Domains,
            ["api", "domain", name] => Route::Domain(decode_segment(name)?),
            ["api", "domain", name, "enable"] => Route::DomainEnable(decode_segment(name)?),
            ["api", "restart-nginx"] => Route::RestartNginx,
            ["api", "status-nginx"] => Route::StatusNginx,
            _ => return Ok(None),
        };
        Ok(Some(route))
    }
}

fn decode_segment(segment: &str) -> Result<String> {
    urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .map_err(|e| PanelError::BadRequest(format!("invalid path segment '{}': {}", segment, e)))
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T> {
    serde_json::from_slice(body).map_err(|e| PanelError::BadRequest(format!("Invalid JSON: {}", e)))
}

fn ok_json<T: Serialize>(status: StatusCode, data: T) -> Result<Response<Full<Bytes>>> {
    match serde_json::to_string(&ApiResponse::ok(data)) {
        Ok(body) => Ok(json_response(status, body)),
        Err(e) => {
            error!(error = %e, "Failed to encode response");
            Ok(json_error_response(
                PanelErrorCode::InternalError,
                format!("cannot encode response: {}", e),
            ))
        }
    }
}

/// The panel's operations, one per request
pub struct Panel {
    sites: SiteManager,
    main_config: MainConfig,
    runtime: DynContainerRuntime,
    container: String,
}

impl Panel {
    pub fn new(
        sites: SiteManager,
        main_config: MainConfig,
        runtime: DynContainerRuntime,
        container: impl Into<String>,
    ) -> Self {
        Self {
            sites,
            main_config,
            runtime,
            container: container.into(),
        }
    }

    /// Build the panel from loaded configuration and a runtime handle
    pub fn from_config(config: &Config, runtime: DynContainerRuntime) -> Self {
        Self::new(
            SiteManager::new(FileStore::new(&config.nginx.sites_dir)),
            MainConfig::new(FileStore::new(&config.nginx.config_dir)),
            runtime,
            config.nginx.container.clone(),
        )
    }

    /// Handle one request and always produce a response
    pub async fn handle(&self, method: &Method, path: &str, body: Bytes) -> Response<Full<Bytes>> {
        let route = match Route::parse(path) {
            Ok(Some(route)) => route,
            Ok(None) => return json_error_response(PanelErrorCode::NotFound, "Not found"),
            Err(e) => return e.to_response(),
        };

        match self.dispatch(method, route, body).await {
            Ok(response) => response,
            Err(e) => {
                let status = e.code().status_code();
                if status.is_server_error() {
                    error!(%method, path, error = %e, "Request failed");
                } else {
                    warn!(%method, path, error = %e, "Request rejected");
                }
                e.to_response()
            }
        }
    }

    async fn dispatch(&self, method: &Method, route: Route, body: Bytes) -> Result<Response<Full<Bytes>>> {
        match (method, route) {
            (&Method::GET, Route::Index) => self.index().await,
            (&Method::GET, Route::Health) => Ok(Response::builder()
                .status(StatusCode::OK)
                .body(Full::new(Bytes::from_static(b"ok")))
                .expect("valid response with StatusCode enum")),
            (&Method::GET, Route::Version) => {
                let version_info = serde_json::json!({
                    "name": PKG_NAME,
                    "version": VERSION,
                });
                Ok(json_response(StatusCode::OK, version_info.to_string()))
            }
            (&Method::GET, Route::Css) => Ok(dashboard::serve_css()),
            (&Method::GET, Route::Js) => Ok(dashboard::serve_js()),

            // Main configuration
            (&Method::GET, Route::ConfigList) => ok_json(StatusCode::OK, self.main_config.list().await?),
            (&Method::GET, Route::Config(name)) => self.get_config(name).await,
            (&Method::POST, Route::Config(name)) => self.post_config(&name, &body).await,

            // Sites
            (&Method::GET, Route::Domains) => ok_json(StatusCode::OK, self.sites.list().await?),
            (&Method::GET, Route::Domain(name)) => self.get_domain(name).await,
            (&Method::POST, Route::Domain(name)) => self.create_domain(name).await,
            (&Method::PUT, Route::Domain(name)) => self.update_domain(&name, &body).await,
            (&Method::DELETE, Route::Domain(name)) => self.delete_domain(&name).await,
            (&Method::POST, Route::DomainEnable(name)) => self.enable_domain(&name, &body).await,

            // Container
            (&Method::POST, Route::RestartNginx) => self.restart_nginx().await,
            (&Method::GET, Route::StatusNginx) => self.status_nginx().await,

            (method, route) => {
                debug!(%method, ?route, "Method not allowed");
                Ok(json_error_response(
                    PanelErrorCode::MethodNotAllowed,
                    format!("Method {} not allowed", method),
                ))
            }
        }
    }

    async fn index(&self) -> Result<Response<Full<Bytes>>> {
        let files = self.main_config.list().await?;
        Ok(dashboard::serve_index(&files))
    }

    // ==================== Main Configuration ====================

    async fn get_config(&self, name: String) -> Result<Response<Full<Bytes>>> {
        let file = self.main_config.read(&name).await?;
        ok_json(StatusCode::OK, ConfigFileView { name, file })
    }

    async fn post_config(&self, name: &str, body: &Bytes) -> Result<Response<Full<Bytes>>> {
        let request: FileRequest = parse_json(body)?;
        self.main_config.write(name, &request.file).await?;
        ok_json(StatusCode::OK, ())
    }

    // ==================== Sites ====================

    async fn get_domain(&self, name: String) -> Result<Response<Full<Bytes>>> {
        let view = match self.sites.get(&name).await? {
            Some(site) => DomainView {
                name: site.name,
                file: site.content,
                enabled: site.state.is_enabled(),
                exists: true,
            },
            None => DomainView {
                name,
                file: String::new(),
                enabled: false,
                exists: false,
            },
        };
        ok_json(StatusCode::OK, view)
    }

    async fn create_domain(&self, name: String) -> Result<Response<Full<Bytes>>> {
        let site = self.sites.create(&name).await?;
        ok_json(
            StatusCode::CREATED,
            serde_json::json!({
                "name": site.name,
                "file": site.file_name(),
                "enabled": false,
            }),
        )
    }

    async fn update_domain(&self, name: &str, body: &Bytes) -> Result<Response<Full<Bytes>>> {
        let request: FileRequest = parse_json(body)?;
        let updated = self.sites.update(name, &request.file).await?;
        ok_json(StatusCode::OK, serde_json::json!({ "updated": updated }))
    }

    async fn delete_domain(&self, name: &str) -> Result<Response<Full<Bytes>>> {
        if self.sites.delete(name).await? {
            ok_json(StatusCode::OK, ())
        } else {
            Ok(json_error_response(
                PanelErrorCode::BadRequest,
                format!("site {} was not found or could not be removed", name),
            ))
        }
    }

    async fn enable_domain(&self, name: &str, body: &Bytes) -> Result<Response<Full<Bytes>>> {
        let request: EnableRequest = parse_json(body)?;
        let changed = self.sites.set_enabled(name, request.enable).await?;
        ok_json(
            StatusCode::OK,
            serde_json::json!({ "changed": changed, "enabled": request.enable }),
        )
    }

    // ==================== Container ====================

    async fn restart_nginx(&self) -> Result<Response<Full<Bytes>>> {
        info!(container = %self.container, endpoint = %self.runtime.endpoint(), "Restarting container");
        self.runtime.restart(&self.container).await?;
        ok_json(
            StatusCode::OK,
            serde_json::json!({ "message": format!("{} container restarted", self.container) }),
        )
    }

    async fn status_nginx(&self) -> Result<Response<Full<Bytes>>> {
        let status = self.runtime.status(&self.container).await?;
        ok_json(
            StatusCode::OK,
            ContainerStatusView {
                container: self.container.clone(),
                status,
                endpoint: self.runtime.endpoint(),
            },
        )
    }
}

/// HTTP server exposing the panel
pub struct PanelServer {
    bind_addr: SocketAddr,
    panel: Arc<Panel>,
    shutdown_rx: watch::Receiver<bool>,
}

impl PanelServer {
    pub fn new(bind_addr: SocketAddr, panel: Arc<Panel>, shutdown_rx: watch::Receiver<bool>) -> Self {
        Self {
            bind_addr,
            panel,
            shutdown_rx,
        }
    }

    /// Bind the configured address and serve until shutdown
    pub async fn run(self) -> anyhow::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        self.serve(listener).await
    }

    /// Serve on an already bound listener until shutdown
    pub async fn serve(self, listener: TcpListener) -> anyhow::Result<()> {
        let addr = listener.local_addr()?;
        info!(addr = %addr, "Panel server listening (HTTP/1.1 and HTTP/2)");

        let mut shutdown_rx = self.shutdown_rx.clone();

        loop {
            tokio::select! {
                result = listener.accept() => {
                    match result {
                        Ok((stream, addr)) => {
                            let panel = Arc::clone(&self.panel);
                            tokio::spawn(async move {
                                if let Err(e) = serve_connection(stream, addr, panel).await {
                                    debug!(addr = %addr, error = %e, "Connection error");
                                }
                            });
                        }
                        Err(e) => {
                            error!(error = %e, "Failed to accept connection");
                        }
                    }
                }
                _ = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        info!("Panel server shutting down");
                        break;
                    }
                }
            }
        }

        Ok(())
    }
}

async fn serve_connection<S>(stream: S, _addr: SocketAddr, panel: Arc<Panel>) -> anyhow::Result<()>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let io = TokioIo::new(stream);
    let service = service_fn(move |req| {
        let panel = Arc::clone(&panel);
        async move { handle_request(req, panel).await }
    });

    AutoBuilder::new(TokioExecutor::new())
        .serve_connection(io, service)
        .await
        .map_err(|e| anyhow::anyhow!("Connection error: {}", e))?;

    Ok(())
}

async fn handle_request(
    req: Request<hyper::body::Incoming>,
    panel: Arc<Panel>,
) -> std::result::Result<Response<Full<Bytes>>, hyper::Error> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    debug!(%method, %path, "Panel request");

    let body = req.into_body().collect().await?.to_bytes();
    let response = panel.handle(&method, &path, body).await;

    debug!(%method, %path, status = response.status().as_u16(), "Panel response");
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::ContainerRuntime;
    use async_trait::async_trait;
    use tempfile::TempDir;

    struct FakeRuntime {
        status: std::result::Result<String, &'static str>,
    }

    #[async_trait]
    impl ContainerRuntime for FakeRuntime {
        fn endpoint(&self) -> String {
            "fake://".to_string()
        }

        async fn restart(&self, container: &str) -> Result<()> {
            match self.status {
                Ok(_) => Ok(()),
                Err(msg) => Err(PanelError::RuntimeUnreachable(format!("{}: {}", container, msg))),
            }
        }

        async fn status(&self, container: &str) -> Result<String> {
            match self.status {
                Ok(ref status) => Ok(status.clone()),
                Err(_) => Err(PanelError::NotFound(format!("container {}", container))),
            }
        }
    }

    struct Fixture {
        _config_dir: TempDir,
        sites_dir: TempDir,
        panel: Panel,
    }

    fn fixture(status: std::result::Result<String, &'static str>) -> Fixture {
        let config_dir = tempfile::tempdir().unwrap();
        let sites_dir = tempfile::tempdir().unwrap();
        std::fs::write(config_dir.path().join("nginx.conf"), "events {}\n").unwrap();

        let panel = Panel::new(
            SiteManager::new(FileStore::new(sites_dir.path())),
            MainConfig::new(FileStore::new(config_dir.path())),
            Arc::new(FakeRuntime { status }),
            "nginx",
        );
        Fixture {
            _config_dir: config_dir,
            sites_dir,
            panel,
        }
    }

    async fn body_json(response: Response<Full<Bytes>>) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_route_parse() {
        assert_eq!(Route::parse("/").unwrap(), Some(Route::Index));
        assert_eq!(Route::parse("/api/domains").unwrap(), Some(Route::Domains));
        assert_eq!(
            Route::parse("/api/domain/example.com").unwrap(),
            Some(Route::Domain("example.com".to_string()))
        );
        assert_eq!(
            Route::parse("/api/domain/example.com/enable").unwrap(),
            Some(Route::DomainEnable("example.com".to_string()))
        );
        assert_eq!(
            Route::parse("/api/config/nginx.conf").unwrap(),
            Some(Route::Config("nginx.conf".to_string()))
        );
        assert_eq!(
            Route::parse("/api/config/..%2Fsecret").unwrap(),
            Some(Route::Config("../secret".to_string()))
        );
        assert_eq!(Route::parse("/api/unknown").unwrap(), None);
        assert!(Route::parse("/api/domain/%FF").is_err());
    }

    #[tokio::test]
    async fn test_domain_lifecycle() {
        let fx = fixture(Ok("running".to_string()));

        let response = fx.panel.handle(&Method::POST, "/api/domain/test", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::CREATED);
        assert!(fx.sites_dir.path().join("test.conf.disabled").is_file());

        let response = fx.panel.handle(&Method::GET, "/api/domains", Bytes::new()).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["sites_available"][0]["name"], "test");
        assert_eq!(json["data"]["sites_enabled"].as_array().unwrap().len(), 0);

        let response = fx
            .panel
            .handle(&Method::POST, "/api/domain/test/enable", Bytes::from(r#"{"enable":true}"#))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["changed"], true);

        let response = fx
            .panel
            .handle(&Method::PUT, "/api/domain/test", Bytes::from(r#"{"file":"server {}"}"#))
            .await;
        assert_eq!(body_json(response).await["data"]["updated"], true);

        let response = fx.panel.handle(&Method::GET, "/api/domain/test", Bytes::new()).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["file"], "server {}");
        assert_eq!(json["data"]["enabled"], true);
        assert_eq!(json["data"]["exists"], true);

        let response = fx.panel.handle(&Method::DELETE, "/api/domain/test", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = fx.panel.handle(&Method::DELETE, "/api/domain/test", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = fx.panel.handle(&Method::GET, "/api/domain/test", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["data"]["file"], "");
        assert_eq!(json["data"]["exists"], false);
    }

    #[tokio::test]
    async fn test_create_existing_domain_conflicts() {
        let fx = fixture(Ok("running".to_string()));

        fx.panel.handle(&Method::POST, "/api/domain/a", Bytes::new()).await;
        let response = fx.panel.handle(&Method::POST, "/api/domain/a", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "ALREADY_EXISTS");
    }

    #[tokio::test]
    async fn test_main_config_read_write() {
        let fx = fixture(Ok("running".to_string()));

        let response = fx.panel.handle(&Method::GET, "/api/config/nginx.conf", Bytes::new()).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["name"], "nginx.conf");
        assert_eq!(json["data"]["file"], "events {}\n");

        let response = fx
            .panel
            .handle(
                &Method::POST,
                "/api/config/nginx.conf",
                Bytes::from(r#"{"file":"worker_processes 1;"}"#),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = fx.panel.handle(&Method::GET, "/api/config/nginx.conf", Bytes::new()).await;
        assert_eq!(body_json(response).await["data"]["file"], "worker_processes 1;");

        let response = fx.panel.handle(&Method::GET, "/api/config/missing.conf", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_rejects_traversal_and_bad_json() {
        let fx = fixture(Ok("running".to_string()));

        let response = fx.panel.handle(&Method::GET, "/api/config/..%2Fpasswd", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get("X-Panel-Error").unwrap(), "INVALID_NAME");

        let response = fx
            .panel
            .handle(&Method::PUT, "/api/domain/a", Bytes::from("not json"))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(response.headers().get("X-Panel-Error").unwrap(), "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_container_status_and_restart() {
        let fx = fixture(Ok("running".to_string()));

        let response = fx.panel.handle(&Method::GET, "/api/status-nginx", Bytes::new()).await;
        let json = body_json(response).await;
        assert_eq!(json["data"]["container"], "nginx");
        assert_eq!(json["data"]["status"], "running");
        assert_eq!(json["data"]["endpoint"], "fake://");

        let response = fx.panel.handle(&Method::POST, "/api/restart-nginx", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["message"], "nginx container restarted");
    }

    #[tokio::test]
    async fn test_container_failures_are_structured() {
        let fx = fixture(Err("socket missing"));

        let response = fx.panel.handle(&Method::POST, "/api/restart-nginx", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert!(json["error"].as_str().unwrap().contains("socket missing"));

        let response = fx.panel.handle(&Method::GET, "/api/status-nginx", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_unknown_route_and_method() {
        let fx = fixture(Ok("running".to_string()));

        let response = fx.panel.handle(&Method::GET, "/nope", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = fx.panel.handle(&Method::DELETE, "/api/domains", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_index_lists_config_files() {
        let fx = fixture(Ok("running".to_string()));

        let response = fx.panel.handle(&Method::GET, "/", Bytes::new()).await;
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let html = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(html.contains("nginx.conf"));
    }
}
