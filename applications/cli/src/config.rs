/// CLI configuration
use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use sharepath_core::{ClientOptions, ConflictPolicy, DeleteMode};
use sharepath_graph::{Credential, GraphSettings};
use std::path::{Path, PathBuf};

/// Read from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "sharepath.toml";

/// Prefix of the environment overrides, e.g. `SHAREPATH_CLIENT_SECRET`
pub const ENV_PREFIX: &str = "SHAREPATH";

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CliConfig {
    #[serde(default)]
    pub tenant_id: String,

    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub site_hostname: String,

    #[serde(default)]
    pub site_path: String,

    #[serde(default)]
    pub library: String,

    /// Pre-issued bearer token; wins over every other credential
    #[serde(default)]
    pub access_token: Option<String>,

    #[serde(default)]
    pub client_secret: Option<String>,

    /// PEM private key of the app certificate
    #[serde(default)]
    pub certificate_key_path: Option<PathBuf>,

    #[serde(default)]
    pub certificate_thumbprint: Option<String>,

    #[serde(default)]
    pub graph_base_url: Option<String>,

    #[serde(default)]
    pub login_base_url: Option<String>,

    #[serde(default)]
    pub timeout_secs: Option<u64>,

    #[serde(default)]
    pub upload_chunk_size: Option<usize>,

    #[serde(default)]
    pub connect_attempts: Option<u32>,

    #[serde(default)]
    pub conflict_policy: ConflictPolicy,

    #[serde(default)]
    pub delete_mode: DeleteMode,
}

impl CliConfig {
    /// Load configuration from file and environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with(
            path,
            config::Environment::with_prefix(ENV_PREFIX).try_parsing(true),
        )
    }

    fn load_with(path: Option<&Path>, environment: config::Environment) -> Result<Self> {
        let mut settings = config::Config::builder();

        let config_path = path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        if config_path.exists() {
            settings = settings.add_source(config::File::from(config_path));
        } else if path.is_some() {
            return Err(CliError::Config(format!(
                "Config file not found: {}",
                config_path.display()
            )));
        }

        // Override with environment variables (prefixed with SHAREPATH_)
        settings = settings.add_source(environment);

        Ok(settings.build()?.try_deserialize()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        for (value, key) in [
            (&self.site_hostname, "site_hostname"),
            (&self.site_path, "site_path"),
            (&self.library, "library"),
        ] {
            if value.trim().is_empty() {
                return Err(CliError::Config(format!(
                    "{key} is required (set {ENV_PREFIX}_{})",
                    key.to_uppercase()
                )));
            }
        }

        if self.certificate_key_path.is_some() && self.certificate_thumbprint.is_none() {
            return Err(CliError::Config(
                "certificate_thumbprint is required with certificate_key_path".to_string(),
            ));
        }

        if self.access_token.is_none()
            && self.client_secret.is_none()
            && self.certificate_key_path.is_none()
        {
            return Err(CliError::Config(
                "No credential configured: set access_token, client_secret or certificate_key_path"
                    .to_string(),
            ));
        }

        Ok(())
    }

    /// The credential to authenticate with.
    ///
    /// An access token wins, then a certificate, then a client secret.
    pub fn credential(&self) -> Result<Credential> {
        if let Some(token) = &self.access_token {
            return Ok(Credential::AccessToken {
                token: token.clone(),
            });
        }

        if let Some(key_path) = &self.certificate_key_path {
            let private_key_pem = std::fs::read_to_string(key_path).map_err(|e| {
                CliError::Config(format!(
                    "Failed to read certificate key {}: {e}",
                    key_path.display()
                ))
            })?;
            return Ok(Credential::Certificate {
                private_key_pem,
                thumbprint: self.certificate_thumbprint.clone().unwrap_or_default(),
            });
        }

        self.client_secret
            .as_ref()
            .map(|secret| Credential::ClientSecret {
                secret: secret.clone(),
            })
            .ok_or_else(|| CliError::Config("No credential configured".to_string()))
    }

    pub fn graph_settings(&self) -> Result<GraphSettings> {
        let mut settings = GraphSettings::new(
            self.tenant_id.clone(),
            self.client_id.clone(),
            self.credential()?,
            self.site_hostname.clone(),
            self.site_path.clone(),
            self.library.clone(),
        );

        if let Some(url) = &self.graph_base_url {
            settings.graph_base_url.clone_from(url);
        }
        if let Some(url) = &self.login_base_url {
            settings.login_base_url.clone_from(url);
        }
        if let Some(secs) = self.timeout_secs {
            settings.timeout_secs = secs;
        }
        if let Some(size) = self.upload_chunk_size {
            settings.upload_chunk_size = size;
        }
        if let Some(attempts) = self.connect_attempts {
            settings.connect_attempts = attempts;
        }

        settings
            .validate()
            .map_err(|e| CliError::Config(e.to_string()))?;
        Ok(settings)
    }

    pub fn client_options(&self) -> ClientOptions {
        ClientOptions::default()
            .with_conflict_policy(self.conflict_policy)
            .with_delete_mode(self.delete_mode)
    }
}
