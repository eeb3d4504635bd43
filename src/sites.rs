//! Site lifecycle on top of the site directory
//!
//! A site named `example.com` lives in exactly one file:
//! - `example.com.conf` while enabled
//! - `example.com.conf.disabled` while disabled
//!
//! Enabling and disabling are renames. New sites start disabled.

use crate::error::{PanelError, Result};
use crate::store::{validate_name, FileEntry, FileStore};
use crate::template::render_new_site;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeSet;
use tracing::{debug, info, warn};

const ENABLED_SUFFIX: &str = "conf";
const DISABLED_SUFFIX: &str = "disabled";

/// Whether a site's configuration is active
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteState {
    Enabled,
    Disabled,
}

impl SiteState {
    pub fn is_enabled(&self) -> bool {
        matches!(self, SiteState::Enabled)
    }
}

/// A site name and state decoded from a file name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiteFile {
    pub name: String,
    pub state: SiteState,
}

impl SiteFile {
    pub fn new(name: &str, state: SiteState) -> Self {
        Self {
            name: name.to_string(),
            state,
        }
    }

    /// Decode a file name, returning `None` for files that are not site files
    pub fn parse(file_name: &str) -> Option<Self> {
        let (stem, suffix) = file_name.rsplit_once('.')?;
        let (name, state) = match suffix {
            ENABLED_SUFFIX => (stem, SiteState::Enabled),
            DISABLED_SUFFIX => (stem.strip_suffix(".conf")?, SiteState::Disabled),
            _ => return None,
        };
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, state))
    }

    /// File name that stores this site in this state
    pub fn file_name(&self) -> String {
        match self.state {
            SiteState::Enabled => format!("{}.{}", self.name, ENABLED_SUFFIX),
            SiteState::Disabled => format!("{}.{}.{}", self.name, ENABLED_SUFFIX, DISABLED_SUFFIX),
        }
    }

    /// The same site in another state
    pub fn with_state(&self, state: SiteState) -> Self {
        Self::new(&self.name, state)
    }
}

/// A site with its configuration
#[derive(Debug, Clone)]
pub struct Site {
    pub name: String,
    pub state: SiteState,
    pub content: String,
    pub modified_at: DateTime<Utc>,
}

/// A site as shown in listings
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteSummary {
    pub name: String,
    #[serde(rename = "time")]
    pub modified_at: DateTime<Utc>,
}

/// Result of scanning the site directory
#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteListing {
    /// Every site, sorted by name
    #[serde(rename = "sites_available")]
    pub available: Vec<SiteSummary>,
    /// Names of the sites that are enabled
    #[serde(rename = "sites_enabled")]
    pub enabled: BTreeSet<String>,
}

/// Creates, edits, toggles and removes site files
#[derive(Debug, Clone)]
pub struct SiteManager {
    store: FileStore,
}

impl SiteManager {
    pub fn new(store: FileStore) -> Self {
        Self { store }
    }

    /// Scan the site directory
    pub async fn list(&self) -> Result<SiteListing> {
        let mut listing = SiteListing::default();

        for entry in self.store.list().await? {
            let Some(site) = SiteFile::parse(&entry.name) else {
                debug!(file = %entry.name, "Ignoring non-site file");
                continue;
            };
            if site.state.is_enabled() {
                listing.enabled.insert(site.name.clone());
            }
            listing.available.push(SiteSummary {
                name: site.name,
                modified_at: entry.modified_at,
            });
        }

        listing.available.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(listing)
    }

    /// Every file whose decoded site name is exactly `name`, enabled first
    async fn variants(&self, name: &str) -> Result<Vec<(SiteFile, FileEntry)>> {
        validate_name(name)?;

        let mut found = Vec::new();
        for entry in self.store.list().await? {
            let Some(site) = SiteFile::parse(&entry.name) else {
                continue;
            };
            if site.name == name {
                found.push((site, entry));
            }
        }
        found.sort_by_key(|(site, _)| !site.state.is_enabled());
        Ok(found)
    }

    /// Find the file backing `name`.
    ///
    /// Matches on the decoded site name, never on a file name prefix. If both
    /// state variants exist the enabled one wins.
    async fn locate(&self, name: &str) -> Result<Option<(SiteFile, FileEntry)>> {
        let mut found = self.variants(name).await?.into_iter();
        let first = found.next();
        if let (Some((existing, _)), Some((_, other))) = (&first, found.next()) {
            warn!(
                site = name,
                existing = %existing.file_name(),
                other = %other.name,
                "Both enabled and disabled files exist for site, using the enabled one"
            );
        }
        Ok(first)
    }

    /// Read a site, or `None` if no file backs it
    pub async fn get(&self, name: &str) -> Result<Option<Site>> {
        let Some((site, entry)) = self.locate(name).await? else {
            return Ok(None);
        };

        let content = self.store.read(&entry.name).await?;
        Ok(Some(Site {
            name: site.name,
            state: site.state,
            content,
            modified_at: entry.modified_at,
        }))
    }

    /// Create a disabled site from the default template
    pub async fn create(&self, name: &str) -> Result<SiteFile> {
        if let Some((existing, _)) = self.locate(name).await? {
            return Err(PanelError::AlreadyExists(format!(
                "site {} ({})",
                name,
                existing.file_name()
            )));
        }

        let site = SiteFile::new(name, SiteState::Disabled);
        self.store
            .write(&site.file_name(), &render_new_site(name))
            .await?;

        info!(site = name, file = %site.file_name(), "Site created");
        Ok(site)
    }

    /// Replace a site's configuration, keeping its state.
    ///
    /// Returns `false` without touching anything when the site does not exist.
    pub async fn update(&self, name: &str, content: &str) -> Result<bool> {
        let Some((_, entry)) = self.locate(name).await? else {
            debug!(site = name, "Update skipped, no such site");
            return Ok(false);
        };

        self.store.write(&entry.name, content).await?;
        info!(site = name, file = %entry.name, "Site updated");
        Ok(true)
    }

    /// Remove every file backing a site, returning whether none is left.
    ///
    /// Returns `false` when no file backs the site.
    pub async fn delete(&self, name: &str) -> Result<bool> {
        let variants = self.variants(name).await?;
        if variants.is_empty() {
            debug!(site = name, "Delete skipped, no such site");
            return Ok(false);
        }

        let mut removed = true;
        for (_, entry) in variants {
            match self.store.delete(&entry.name).await {
                Ok(()) | Err(PanelError::NotFound(_)) => {}
                Err(e) => return Err(e),
            }

            if self.store.exists(&entry.name).await {
                warn!(site = name, file = %entry.name, "Site file still present after delete");
                removed = false;
            } else {
                info!(site = name, file = %entry.name, "Site deleted");
            }
        }
        Ok(removed)
    }

    /// Enable or disable a site by renaming its file.
    ///
    /// Returns whether a rename happened. Missing sites and sites already in
    /// the requested state are left alone.
    pub async fn set_enabled(&self, name: &str, enable: bool) -> Result<bool> {
        let Some((site, entry)) = self.locate(name).await? else {
            debug!(site = name, enable, "Toggle skipped, no such site");
            return Ok(false);
        };

        let target_state = if enable {
            SiteState::Enabled
        } else {
            SiteState::Disabled
        };
        if site.state == target_state {
            return Ok(false);
        }

        let target = site.with_state(target_state).file_name();
        if self.store.exists(&target).await {
            return Err(PanelError::AlreadyExists(format!("file {}", target)));
        }

        self.store.rename(&entry.name, &target).await?;
        info!(site = name, from = %entry.name, to = %target, "Site state changed");
        Ok(true)
    }
}
