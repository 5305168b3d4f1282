//! Connection options and their resolution
//!
//! Options given explicitly always win. When any of the core settings
//! (access key, secret key, region, bucket) is missing, the rest are read from
//! the environment:
//! - `AWS_ACCESS_KEY_ID` (required)
//! - `AWS_SECRET_ACCESS_KEY` (required)
//! - `AWS_REGION` (defaults to `eu-west-1`)
//! - `AWS_BUCKET` (required)
//! - `AWS_TOKEN` (optional session token)
//! - `AWS_ENDPOINT_URL` (optional, for S3-compatible stores)
//! - `AWS_S3_FORCE_PATH_STYLE` (optional, `true`/`false`)

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

pub const ENV_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const ENV_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const ENV_REGION: &str = "AWS_REGION";
pub const ENV_BUCKET: &str = "AWS_BUCKET";
pub const ENV_TOKEN: &str = "AWS_TOKEN";
pub const ENV_ENDPOINT_URL: &str = "AWS_ENDPOINT_URL";
pub const ENV_FORCE_PATH_STYLE: &str = "AWS_S3_FORCE_PATH_STYLE";

pub const DEFAULT_REGION: &str = "eu-west-1";

/// Explicitly supplied connection options
///
/// Every field is optional; an empty string counts as unset.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Options {
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub secret_access_key: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub bucket: Option<String>,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub endpoint_url: Option<String>,
    #[serde(default)]
    pub force_path_style: Option<bool>,
}

impl Options {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn access_key_id(mut self, access_key_id: impl Into<String>) -> Self {
        self.access_key_id = Some(access_key_id.into());
        self
    }

    pub fn secret_access_key(mut self, secret_access_key: impl Into<String>) -> Self {
        self.secret_access_key = Some(secret_access_key.into());
        self
    }

    pub fn region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn bucket(mut self, bucket: impl Into<String>) -> Self {
        self.bucket = Some(bucket.into());
        self
    }

    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn endpoint_url(mut self, endpoint_url: impl Into<String>) -> Self {
        self.endpoint_url = Some(endpoint_url.into());
        self
    }

    pub fn force_path_style(mut self, force_path_style: bool) -> Self {
        self.force_path_style = Some(force_path_style);
        self
    }

    /// True when any of the core settings is unset, which means the
    /// environment has to be consulted
    pub fn has_empty_settings(&self) -> bool {
        non_empty(&self.access_key_id).is_none()
            || non_empty(&self.secret_access_key).is_none()
            || non_empty(&self.region).is_none()
            || non_empty(&self.bucket).is_none()
    }

    /// Fill `other`'s unset fields from `self`; values already set in `other` are kept
    pub fn merge_into(&self, other: Options) -> Options {
        Options {
            access_key_id: pick(other.access_key_id, &self.access_key_id),
            secret_access_key: pick(other.secret_access_key, &self.secret_access_key),
            region: pick(other.region, &self.region),
            bucket: pick(other.bucket, &self.bucket),
            token: pick(other.token, &self.token),
            endpoint_url: pick(other.endpoint_url, &self.endpoint_url),
            force_path_style: other.force_path_style.or(self.force_path_style),
        }
    }

    /// Resolve against the process environment
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        self.resolve_with(|name| std::env::var(name).ok())
    }

    /// Resolve against an arbitrary variable lookup
    pub fn resolve_with<F>(&self, lookup: F) -> Result<ResolvedOptions>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut resolved = if self.has_empty_settings() {
            tracing::debug!("explicit options incomplete, reading environment");
            ResolvedOptions::from_lookup(&lookup)?
        } else {
            ResolvedOptions {
                region: DEFAULT_REGION.to_string(),
                ..Default::default()
            }
        };

        if let Some(v) = non_empty(&self.access_key_id) {
            resolved.access_key_id = v.to_string();
        }
        if let Some(v) = non_empty(&self.secret_access_key) {
            resolved.secret_access_key = v.to_string();
        }
        if let Some(v) = non_empty(&self.region) {
            resolved.region = v.to_string();
        }
        if let Some(v) = non_empty(&self.bucket) {
            resolved.bucket = v.to_string();
        }
        if let Some(v) = non_empty(&self.token) {
            resolved.token = Some(v.to_string());
        }
        if let Some(v) = non_empty(&self.endpoint_url) {
            resolved.endpoint_url = Some(v.to_string());
        }
        if let Some(v) = self.force_path_style {
            resolved.force_path_style = v;
        }

        tracing::debug!(?resolved, "resolved connection options");
        Ok(resolved)
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &self.secret_access_key.as_ref().map(|_| REDACTED))
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

/// Fully resolved settings used to build the SDK client
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ResolvedOptions {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub region: String,
    pub bucket: String,
    pub token: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

impl ResolvedOptions {
    fn from_lookup<F>(lookup: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        let required = |name: &'static str| var(name).ok_or(Error::MissingSetting { var: name });

        let force_path_style = match var(ENV_FORCE_PATH_STYLE) {
            Some(value) => parse_bool(&value).ok_or(Error::InvalidSetting {
                var: ENV_FORCE_PATH_STYLE,
                value,
            })?,
            None => false,
        };

        Ok(Self {
            access_key_id: required(ENV_ACCESS_KEY_ID)?,
            secret_access_key: required(ENV_SECRET_ACCESS_KEY)?,
            region: var(ENV_REGION).unwrap_or_else(|| DEFAULT_REGION.to_string()),
            bucket: required(ENV_BUCKET)?,
            token: var(ENV_TOKEN),
            endpoint_url: var(ENV_ENDPOINT_URL),
            force_path_style,
        })
    }
}

impl fmt::Debug for ResolvedOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResolvedOptions")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &REDACTED)
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("token", &self.token.as_ref().map(|_| REDACTED))
            .field("endpoint_url", &self.endpoint_url)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

const REDACTED: &str = "***";

/// Treat `Some("")` the same as `None`
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

fn pick(preferred: Option<String>, fallback: &Option<String>) -> Option<String> {
    match preferred {
        Some(v) if !v.is_empty() => Some(v),
        _ => fallback.clone(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Some(true),
        "false" | "0" | "no" => Some(false),
        _ => None,
    }
}
