//! nginx-panel - A small web panel for an Nginx reverse proxy
//!
//! This library provides:
//! - Site management: create, edit, enable/disable and delete per-site
//!   configuration files, with the state encoded in the file suffix
//! - Editing of the top-level Nginx configuration files
//! - Restart and status of the Nginx container through the Docker or
//!   Podman Engine API
//! - An HTTP API and a minimal dashboard over all of the above

pub mod config;
pub mod dashboard;
pub mod error;
pub mod main_config;
pub mod runtime;
pub mod server;
pub mod sites;
pub mod store;
pub mod template;
