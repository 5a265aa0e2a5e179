//! User profiles: which account to look up on each platform, and with which token.
//!
//! A profile is a YAML (or JSON) document named after the user id:
//!
//! ```yaml
//! id: jane
//! azure:
//!   email: jane@example.com
//!   organization: acme
//!   token: ...
//! github:
//!   username: janedoe
//! gitlab:
//!   username: jane.doe
//! ```
//!
//! Tokens may also be kept apart from the profile in `<user id>.tokens`, holding
//! `provider:token` pairs separated by `;`. Those fill in any token the profile leaves empty.

use crate::errors::{HubError, Result};
use async_trait::async_trait;
use contributions::{Platform, ProviderAccount};
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// A credential that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Secret(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("<redacted>")
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AzureProfile {
    pub email: String,
    pub organization: String,
    #[serde(default)]
    pub token: Secret,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GitHubProfile {
    pub username: String,
    #[serde(default)]
    pub token: Secret,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct GitLabProfile {
    pub username: String,
    #[serde(default)]
    pub token: Secret,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct UserData {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub azure: Option<AzureProfile>,
    #[serde(default)]
    pub github: Option<GitHubProfile>,
    #[serde(default)]
    pub gitlab: Option<GitLabProfile>,
}

impl UserData {
    /// The account to query on `platform`, or `None` when the profile has no such section.
    pub fn account(&self, platform: Platform) -> Option<ProviderAccount> {
        match platform {
            Platform::AzureDevOps => self.azure.as_ref().map(|azure| ProviderAccount {
                user: azure.email.clone(),
                organization: Some(azure.organization.clone()),
                token: azure.token.expose().to_string(),
            }),
            Platform::GitHub => self.github.as_ref().map(|github| ProviderAccount {
                user: github.username.clone(),
                organization: None,
                token: github.token.expose().to_string(),
            }),
            Platform::GitLab => self.gitlab.as_ref().map(|gitlab| ProviderAccount {
                user: gitlab.username.clone(),
                organization: None,
                token: gitlab.token.expose().to_string(),
            }),
        }
    }

    /// Fills empty tokens from `tokens`, keyed by lower-case provider name.
    ///
    /// Sections missing from the profile are not created.
    pub fn apply_tokens(&mut self, tokens: &HashMap<String, String>) {
        let fill = |slot: &mut Secret, platform: Platform| {
            if slot.is_blank() {
                if let Some(token) = tokens.get(platform.as_str()) {
                    *slot = Secret::new(token.clone());
                }
            }
        };

        if let Some(azure) = self.azure.as_mut() {
            fill(&mut azure.token, Platform::AzureDevOps);
        }
        if let Some(github) = self.github.as_mut() {
            fill(&mut github.token, Platform::GitHub);
        }
        if let Some(gitlab) = self.gitlab.as_mut() {
            fill(&mut gitlab.token, Platform::GitLab);
        }
    }
}

/// Parses `azure:abc;github:def` into a provider to token map.
///
/// Pairs with an empty provider or token are skipped. Tokens may contain `:`.
pub fn parse_tokens(raw: &str) -> HashMap<String, String> {
    raw.split(';')
        .filter_map(|pair| pair.split_once(':'))
        .map(|(provider, token)| (provider.trim().to_lowercase(), token.trim().to_string()))
        .filter(|(provider, token)| !provider.is_empty() && !token.is_empty())
        .collect()
}

#[async_trait]
pub trait UserDataRepository: Send + Sync {
    /// The profile of `user_id`, or `None` when there is none.
    async fn user_data(&self, user_id: &str) -> Result<Option<UserData>>;
}

const PROFILE_EXTENSIONS: [&str; 3] = ["yaml", "yml", "json"];

/// Profiles stored as files in one directory.
#[derive(Clone, Debug)]
pub struct FileUserDataRepository {
    dir: PathBuf,
}

impl FileUserDataRepository {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        FileUserDataRepository { dir: dir.into() }
    }

    async fn tokens(&self, user_id: &str) -> HashMap<String, String> {
        let path = self.dir.join(format!("{user_id}.tokens"));
        match tokio::fs::read_to_string(&path).await {
            Ok(raw) => parse_tokens(&raw),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                tracing::error!(user_id, error = %e, "Failed to read user tokens");
                HashMap::new()
            }
        }
    }
}

#[async_trait]
impl UserDataRepository for FileUserDataRepository {
    async fn user_data(&self, user_id: &str) -> Result<Option<UserData>> {
        if !is_valid_user_id(user_id) {
            return Err(HubError::InvalidUserId(user_id.to_string()));
        }

        for extension in PROFILE_EXTENSIONS {
            let path = self.dir.join(format!("{user_id}.{extension}"));
            let raw = match tokio::fs::read_to_string(&path).await {
                Ok(raw) => raw,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(source) => return Err(HubError::ProfileRead { path, source }),
            };

            let mut user = parse_profile(&path, &raw)?;
            user.id = user_id.to_string();
            user.apply_tokens(&self.tokens(user_id).await);
            return Ok(Some(user));
        }

        Ok(None)
    }
}

/// Reads a single profile file. The id falls back to the file stem.
pub async fn load_profile(path: &Path) -> Result<UserData> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| HubError::ProfileRead {
            path: path.to_path_buf(),
            source,
        })?;

    let mut user = parse_profile(path, &raw)?;
    if user.id.is_empty() {
        if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
            user.id = stem.to_string();
        }
    }
    Ok(user)
}

fn parse_profile(path: &Path, raw: &str) -> Result<UserData> {
    let parsed = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(raw).map_err(|e| e.to_string())
    } else {
        serde_yaml::from_str(raw).map_err(|e| e.to_string())
    };

    parsed.map_err(|message| HubError::ProfileParse {
        path: path.to_path_buf(),
        message,
    })
}

// Ids become file names.
fn is_valid_user_id(user_id: &str) -> bool {
    !user_id.is_empty()
        && !user_id.starts_with('.')
        && user_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}
