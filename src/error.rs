//! Error taxonomy and JSON error responses for the panel

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::CONTENT_TYPE;
use hyper::{Response, StatusCode};
use serde::Serialize;
use std::path::PathBuf;

/// Result alias used by the site, config and runtime layers
pub type Result<T> = std::result::Result<T, PanelError>;

/// Errors produced by panel operations
#[derive(Debug, thiserror::Error)]
pub enum PanelError {
    /// File or container is absent
    #[error("{0} not found")]
    NotFound(String),

    /// Target of a create or rename already exists
    #[error("{0} already exists")]
    AlreadyExists(String),

    /// Name cannot be used as a file name inside a managed directory
    #[error("invalid name '{name}': {reason}")]
    InvalidName { name: String, reason: &'static str },

    /// Disk read, write, rename or delete failed
    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Container runtime could not be reached
    #[error("container runtime unreachable: {0}")]
    RuntimeUnreachable(String),

    /// Container runtime answered with an error
    #[error("container runtime error: {0}")]
    Runtime(String),

    /// Request body could not be understood
    #[error("bad request: {0}")]
    BadRequest(String),
}

impl PanelError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        PanelError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_name(name: impl Into<String>, reason: &'static str) -> Self {
        PanelError::InvalidName {
            name: name.into(),
            reason,
        }
    }

    /// Error code reported to API clients
    pub fn code(&self) -> PanelErrorCode {
        match self {
            PanelError::NotFound(_) => PanelErrorCode::NotFound,
            PanelError::AlreadyExists(_) => PanelErrorCode::AlreadyExists,
            PanelError::InvalidName { .. } => PanelErrorCode::InvalidName,
            PanelError::Io { .. } => PanelErrorCode::IoFailure,
            PanelError::RuntimeUnreachable(_) => PanelErrorCode::RuntimeUnreachable,
            PanelError::Runtime(_) => PanelErrorCode::RuntimeError,
            PanelError::BadRequest(_) => PanelErrorCode::BadRequest,
        }
    }
}

/// Error codes for API errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PanelErrorCode {
    /// File or container is absent
    NotFound,
    /// Create or rename target already exists
    AlreadyExists,
    /// Name rejected by validation
    InvalidName,
    /// Disk operation failed
    IoFailure,
    /// Container runtime unreachable
    RuntimeUnreachable,
    /// Container runtime returned an error
    RuntimeError,
    /// Malformed request
    BadRequest,
    /// Known path, unsupported method
    MethodNotAllowed,
    /// Anything else
    InternalError,
}

impl PanelErrorCode {
    /// Get the default HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            PanelErrorCode::NotFound => StatusCode::NOT_FOUND,
            PanelErrorCode::AlreadyExists => StatusCode::CONFLICT,
            PanelErrorCode::InvalidName => StatusCode::BAD_REQUEST,
            PanelErrorCode::IoFailure => StatusCode::INTERNAL_SERVER_ERROR,
            PanelErrorCode::RuntimeUnreachable => StatusCode::SERVICE_UNAVAILABLE,
            PanelErrorCode::RuntimeError => StatusCode::INTERNAL_SERVER_ERROR,
            PanelErrorCode::BadRequest => StatusCode::BAD_REQUEST,
            PanelErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            PanelErrorCode::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code as a string for the X-Panel-Error header
    pub fn as_header_value(&self) -> &'static str {
        match self {
            PanelErrorCode::NotFound => "NOT_FOUND",
            PanelErrorCode::AlreadyExists => "ALREADY_EXISTS",
            PanelErrorCode::InvalidName => "INVALID_NAME",
            PanelErrorCode::IoFailure => "IO_FAILURE",
            PanelErrorCode::RuntimeUnreachable => "RUNTIME_UNREACHABLE",
            PanelErrorCode::RuntimeError => "RUNTIME_ERROR",
            PanelErrorCode::BadRequest => "BAD_REQUEST",
            PanelErrorCode::MethodNotAllowed => "METHOD_NOT_ALLOWED",
            PanelErrorCode::InternalError => "INTERNAL_ERROR",
        }
    }
}

/// JSON envelope shared by every API response
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<PanelErrorCode>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            code: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(code: PanelErrorCode, msg: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(msg.into()),
            code: Some(code),
        }
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(
                r#"{{"success":false,"error":"{}"}}"#,
                self.error.as_deref().unwrap_or("").replace('"', "\\\"")
            )
        })
    }
}

/// Create a JSON response with the given status
pub fn json_response(status: StatusCode, body: impl Into<Bytes>) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header(CONTENT_TYPE, "application/json")
        .body(Full::new(body.into()))
        .expect("valid response with StatusCode enum and static header")
}

/// Create a JSON error response with X-Panel-Error header
pub fn json_error_response(code: PanelErrorCode, message: impl Into<String>) -> Response<Full<Bytes>> {
    let body = ApiResponse::<()>::error(code, message).to_json();

    Response::builder()
        .status(code.status_code())
        .header(CONTENT_TYPE, "application/json")
        .header("X-Panel-Error", code.as_header_value())
        .body(Full::new(Bytes::from(body)))
        .expect("valid response with StatusCode enum and static headers")
}

impl PanelError {
    /// Render this error as a JSON error response
    pub fn to_response(&self) -> Response<Full<Bytes>> {
        json_error_response(self.code(), self.to_string())
    }
}
