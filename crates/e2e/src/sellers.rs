//! Seller registry (`sellers.json`): label -> credentials, last write wins

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{E2eError, E2eResult};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// In-memory view of the registry file
#[derive(Debug, Clone)]
pub struct SellerRegistry {
    path: PathBuf,
    sellers: BTreeMap<String, Credentials>,
}

impl SellerRegistry {
    /// Load the registry; a missing file is an empty registry
    pub fn load(path: impl Into<PathBuf>) -> E2eResult<Self> {
        let path = path.into();
        let sellers = if path.exists() {
            let content = std::fs::read_to_string(&path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };
        Ok(Self { path, sellers })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Credentials for `label`; never substitutes another entry
    pub fn get(&self, label: &str) -> E2eResult<&Credentials> {
        self.sellers
            .get(label)
            .ok_or_else(|| E2eError::SellerNotFound {
                label: label.to_string(),
                path: self.path.clone(),
            })
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.sellers.keys().map(String::as_str)
    }

    pub fn insert(&mut self, label: impl Into<String>, credentials: Credentials) {
        self.sellers.insert(label.into(), credentials);
    }

    /// Rewrite the whole file
    pub fn save(&self) -> E2eResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(&self.sellers)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Insert and persist in one go
    pub fn record(&mut self, label: &str, credentials: Credentials) -> E2eResult<()> {
        info!("Recording seller '{}' ({}) in {}", label, credentials.email, self.path.display());
        self.insert(label, credentials);
        self.save()
    }
}
