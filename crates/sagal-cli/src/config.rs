use std::path::{Path, PathBuf};
use std::time::Duration;

use sagal_core::intake::DEFAULT_MAX_IMAGE_BYTES;
use serde::{Deserialize, Serialize};

/// Current config version. Bump this when adding fields or changing shape.
/// Each bump requires a corresponding entry in [`migrate`].
const CURRENT_VERSION: u32 = 1;

const DEFAULT_INFERENCE_URL: &str = "http://localhost:5000";
const DEFAULT_REGION: &str = "us-east-1";
const DEFAULT_INFERENCE_TIMEOUT_SECS: u64 = 30;
const DEFAULT_UPLOAD_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SagalConfig {
    /// Schema version. Missing or 0 = pre-versioned config.
    #[serde(default)]
    pub config_version: u32,
    pub region: String,
    /// Bucket holding smear images and patient records.
    pub bucket: String,
    /// Base for stored-image URLs; the bucket endpoint when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_base_url: Option<String>,
    pub inference_url: String,
    pub max_upload_bytes: u64,
    pub inference_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub max_attempts: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_dir: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub handoff_ttl_secs: Option<u64>,
    pub credentials: CredentialSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialSource {
    Inline {
        access_key_id: String,
        secret_access_key: String,
        #[serde(skip_serializing_if = "Option::is_none", default)]
        session_token: Option<String>,
    },
    Profile {
        profile_name: String,
    },
    DefaultChain,
}

impl Default for SagalConfig {
    fn default() -> Self {
        Self {
            config_version: CURRENT_VERSION,
            region: DEFAULT_REGION.to_string(),
            bucket: String::new(),
            public_base_url: None,
            inference_url: DEFAULT_INFERENCE_URL.to_string(),
            max_upload_bytes: DEFAULT_MAX_IMAGE_BYTES,
            inference_timeout_secs: DEFAULT_INFERENCE_TIMEOUT_SECS,
            upload_timeout_secs: DEFAULT_UPLOAD_TIMEOUT_SECS,
            max_attempts: 1,
            handoff_dir: None,
            handoff_ttl_secs: None,
            credentials: CredentialSource::DefaultChain,
        }
    }
}

impl SagalConfig {
    pub fn inference_timeout(&self) -> Duration {
        Duration::from_secs(self.inference_timeout_secs)
    }

    pub fn upload_timeout(&self) -> Duration {
        Duration::from_secs(self.upload_timeout_secs)
    }

    pub fn handoff_ttl(&self) -> Option<Duration> {
        self.handoff_ttl_secs.map(Duration::from_secs)
    }

    /// Directory backing the hand-off slot.
    pub fn handoff_dir(&self) -> eyre::Result<PathBuf> {
        match &self.handoff_dir {
            Some(dir) => Ok(dir.clone()),
            None => {
                let base = dirs::data_local_dir()
                    .ok_or_else(|| eyre::eyre!("no local data directory found"))?;
                Ok(base.join("com.sagal.lab").join("handoff"))
            }
        }
    }
}

/// Redacted config info safe to print.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigInfo {
    pub config_version: u32,
    pub region: String,
    pub bucket: String,
    pub public_base_url: Option<String>,
    pub inference_url: String,
    pub max_upload_bytes: u64,
    pub inference_timeout_secs: u64,
    pub upload_timeout_secs: u64,
    pub max_attempts: u32,
    pub handoff_dir: Option<String>,
    pub handoff_ttl_secs: Option<u64>,
    pub credential_type: String,
    pub profile_name: Option<String>,
    pub access_key_hint: Option<String>,
}

pub fn default_config_path() -> eyre::Result<PathBuf> {
    let base = dirs::config_dir().ok_or_else(|| eyre::eyre!("no config directory found"))?;
    Ok(base.join("com.sagal.lab").join("config.json"))
}

/// Load the config at `path`, or defaults when no file exists yet.
pub fn load_or_default(path: &Path) -> eyre::Result<SagalConfig> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(SagalConfig::default());
    }
    load_config(path)
}

pub fn load_config(path: &Path) -> eyre::Result<SagalConfig> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read config at {}: {e}", path.display()))?;

    // Parse as raw JSON so we can run migrations before deserializing.
    let json: serde_json::Value = serde_json::from_str(&contents)?;
    let on_disk_version = json
        .get("config_version")
        .and_then(|v| v.as_u64())
        .unwrap_or(0) as u32;

    let migrated = migrate(json, on_disk_version)?;
    let config: SagalConfig = serde_json::from_value(migrated)?;
    Ok(config)
}

/// Run sequential migrations from `from_version` up to [`CURRENT_VERSION`].
fn migrate(mut json: serde_json::Value, from_version: u32) -> eyre::Result<serde_json::Value> {
    if from_version > CURRENT_VERSION {
        return Err(eyre::eyre!(
            "config_version {from_version} is newer than this build supports ({CURRENT_VERSION}). \
             Please update sagal."
        ));
    }

    // v0 → v1: the single `timeout_secs` became per-step timeouts, and the
    // upload ceiling and retry count became configurable.
    if from_version < 1 {
        let obj = json
            .as_object_mut()
            .ok_or_else(|| eyre::eyre!("config is not a JSON object"))?;
        let inference_timeout = obj
            .remove("timeout_secs")
            .unwrap_or_else(|| DEFAULT_INFERENCE_TIMEOUT_SECS.into());
        obj.entry("inference_timeout_secs")
            .or_insert(inference_timeout);
        obj.entry("upload_timeout_secs")
            .or_insert(DEFAULT_UPLOAD_TIMEOUT_SECS.into());
        obj.entry("max_upload_bytes")
            .or_insert(DEFAULT_MAX_IMAGE_BYTES.into());
        obj.entry("max_attempts").or_insert(1.into());
        obj.insert(
            "config_version".to_string(),
            serde_json::Value::Number(1.into()),
        );
        tracing::info!("migrated config v0 → v1 (split timeouts, added upload and retry limits)");
    }

    Ok(json)
}

pub fn save_config(path: &Path, config: &SagalConfig) -> eyre::Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| eyre::eyre!("config path {} has no parent", path.display()))?;
    std::fs::create_dir_all(dir)?;

    // Always write the current version, regardless of what was loaded.
    let mut stamped = config.clone();
    stamped.config_version = CURRENT_VERSION;

    let json = serde_json::to_string_pretty(&stamped)?;

    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json.as_bytes())?;

    // Set restrictive permissions on Unix before renaming
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&tmp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), "config saved");
    Ok(())
}

pub fn config_info(config: &SagalConfig) -> ConfigInfo {
    let (credential_type, profile_name, access_key_hint) = match &config.credentials {
        CredentialSource::Inline {
            access_key_id,
            session_token,
            ..
        } => {
            let cred_type = if session_token.is_some() {
                "temporary"
            } else {
                "inline"
            };
            (
                cred_type.to_string(),
                None,
                Some(redact_access_key(access_key_id)),
            )
        }
        CredentialSource::Profile { profile_name } => {
            ("profile".to_string(), Some(profile_name.clone()), None)
        }
        CredentialSource::DefaultChain => ("default_chain".to_string(), None, None),
    };

    ConfigInfo {
        config_version: config.config_version,
        region: config.region.clone(),
        bucket: config.bucket.clone(),
        public_base_url: config.public_base_url.clone(),
        inference_url: config.inference_url.clone(),
        max_upload_bytes: config.max_upload_bytes,
        inference_timeout_secs: config.inference_timeout_secs,
        upload_timeout_secs: config.upload_timeout_secs,
        max_attempts: config.max_attempts,
        handoff_dir: config.handoff_dir.as_ref().map(|d| d.display().to_string()),
        handoff_ttl_secs: config.handoff_ttl_secs,
        credential_type,
        profile_name,
        access_key_hint,
    }
}

fn redact_access_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
