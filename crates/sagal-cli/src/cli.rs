use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use sagal_core::models::{Gender, PatientRecordDraft};
use uuid::Uuid;

use crate::config::SagalConfig;

#[derive(Debug, Parser)]
#[command(name = "sagal", version, about = "Blood smear analysis for the Sagal lab")]
pub struct Cli {
    /// Config file; defaults to the platform config directory.
    #[arg(long, global = true, env = "SAGAL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true, env = "SAGAL_LOG_JSON")]
    pub json: bool,

    #[command(flatten)]
    pub overrides: Overrides,

    #[command(subcommand)]
    pub command: Command,
}

/// Per-invocation overrides of config file values.
#[derive(Debug, Default, Args)]
pub struct Overrides {
    #[arg(long, global = true, env = "SAGAL_REGION")]
    pub region: Option<String>,
    #[arg(long, global = true, env = "SAGAL_BUCKET")]
    pub bucket: Option<String>,
    #[arg(long, global = true, env = "SAGAL_PUBLIC_BASE_URL")]
    pub public_base_url: Option<String>,
    #[arg(long, global = true, env = "SAGAL_INFERENCE_URL")]
    pub inference_url: Option<String>,
    #[arg(long, global = true, env = "SAGAL_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<u64>,
    #[arg(long, global = true, env = "SAGAL_INFERENCE_TIMEOUT_SECS")]
    pub inference_timeout_secs: Option<u64>,
    #[arg(long, global = true, env = "SAGAL_UPLOAD_TIMEOUT_SECS")]
    pub upload_timeout_secs: Option<u64>,
    #[arg(long, global = true, env = "SAGAL_MAX_ATTEMPTS")]
    pub max_attempts: Option<u32>,
    #[arg(long, global = true, env = "SAGAL_HANDOFF_DIR")]
    pub handoff_dir: Option<PathBuf>,
    #[arg(long, global = true, env = "SAGAL_HANDOFF_TTL_SECS")]
    pub handoff_ttl_secs: Option<u64>,
    #[arg(long, global = true, env = "SAGAL_AWS_PROFILE")]
    pub profile: Option<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut SagalConfig) {
        if let Some(region) = &self.region {
            config.region = region.clone();
        }
        if let Some(bucket) = &self.bucket {
            config.bucket = bucket.clone();
        }
        if let Some(url) = &self.public_base_url {
            config.public_base_url = Some(url.clone());
        }
        if let Some(url) = &self.inference_url {
            config.inference_url = url.clone();
        }
        if let Some(max) = self.max_upload_bytes {
            config.max_upload_bytes = max;
        }
        if let Some(secs) = self.inference_timeout_secs {
            config.inference_timeout_secs = secs;
        }
        if let Some(secs) = self.upload_timeout_secs {
            config.upload_timeout_secs = secs;
        }
        if let Some(attempts) = self.max_attempts {
            config.max_attempts = attempts;
        }
        if let Some(dir) = &self.handoff_dir {
            config.handoff_dir = Some(dir.clone());
        }
        if let Some(ttl) = self.handoff_ttl_secs {
            config.handoff_ttl_secs = Some(ttl);
        }
        if let Some(profile_name) = &self.profile {
            config.credentials = crate::config::CredentialSource::Profile {
                profile_name: profile_name.clone(),
            };
        }
    }
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Classify a smear image and stage the accepted result.
    Analyze {
        file: PathBuf,
    },
    /// Fetch the original/pre-processed comparison image.
    Preview {
        file: PathBuf,
        /// Output JPEG; defaults to `<file stem>-preview.jpg`.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
    #[command(subcommand)]
    Handoff(HandoffCommand),
    #[command(subcommand)]
    Record(RecordCommand),
    #[command(subcommand)]
    Config(ConfigCommand),
}

#[derive(Debug, Subcommand)]
pub enum HandoffCommand {
    /// Print the staged lab result, or `null`.
    Show,
    /// Discard the staged lab result.
    Clear,
}

#[derive(Debug, Subcommand)]
pub enum RecordCommand {
    /// Create a patient record from the staged lab result.
    Create(DraftArgs),
    Update {
        id: Uuid,
        #[command(flatten)]
        draft: DraftArgs,
    },
    Show {
        id: Uuid,
    },
    List,
}

#[derive(Debug, Args)]
pub struct DraftArgs {
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub age: u32,
    /// `male` or `female`.
    #[arg(long, value_parser = parse_gender)]
    pub gender: Gender,
    #[arg(long = "verdict")]
    pub doctors_verdict: String,
}

impl From<DraftArgs> for PatientRecordDraft {
    fn from(args: DraftArgs) -> Self {
        PatientRecordDraft {
            name: args.name,
            age: args.age,
            gender: args.gender,
            doctors_verdict: args.doctors_verdict,
        }
    }
}

fn parse_gender(raw: &str) -> Result<Gender, String> {
    raw.parse().map_err(|e: sagal_core::error::CoreError| e.to_string())
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective config with credentials redacted.
    Show,
    /// Write the effective config to the config file.
    Init,
}
