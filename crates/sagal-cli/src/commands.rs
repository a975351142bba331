use std::path::{Path, PathBuf};
use std::sync::Arc;

use eyre::WrapErr;
use sagal_core::intake::{ImageIntakeValidator, RawImage};
use sagal_core::models::PatientRecordDraft;
use sagal_inference::{InferenceClient, InferenceConfig, RetryPolicy};
use sagal_lab::{
    FileSlotStore, GateConfig, HandoffStore, LabError, LabSession, RecordBook, ResultGate,
};
use sagal_storage::ObjectStore;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::aws;
use crate::cli::{Cli, Command, ConfigCommand, HandoffCommand, RecordCommand};
use crate::config::{self, SagalConfig};

pub async fn run(cli: Cli) -> eyre::Result<()> {
    let config_path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };
    let mut config = config::load_or_default(&config_path)?;
    cli.overrides.apply(&mut config);

    match cli.command {
        Command::Analyze { file } => analyze(&config, &file).await,
        Command::Preview { file, out } => preview(&config, &file, out).await,
        Command::Handoff(HandoffCommand::Show) => {
            let staged = handoff_store(&config)?.consume()?;
            print_json(&staged)
        }
        Command::Handoff(HandoffCommand::Clear) => {
            handoff_store(&config)?.clear()?;
            Ok(())
        }
        Command::Record(cmd) => record(&config, cmd).await,
        Command::Config(ConfigCommand::Show) => print_json(&config::config_info(&config)),
        Command::Config(ConfigCommand::Init) => {
            config::save_config(&config_path, &config)?;
            println!("{}", config_path.display());
            Ok(())
        }
    }
}

async fn analyze(config: &SagalConfig, file: &Path) -> eyre::Result<()> {
    let store = aws::object_store(config).await?;
    let mut session = LabSession::new(
        ImageIntakeValidator::new(config.max_upload_bytes),
        inference_client(config)?,
        ResultGate::with_config(
            store,
            GateConfig {
                upload_timeout: config.upload_timeout(),
                ..GateConfig::default()
            },
        ),
        handoff_store(config)?,
    );

    session.select(RawImage::from_path(file)?).map_err(lab_report)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let gated = session.analyze(&cancel).await.map_err(lab_report)?;
    print_json(&gated)
}

async fn preview(config: &SagalConfig, file: &Path, out: Option<PathBuf>) -> eyre::Result<()> {
    let submission = ImageIntakeValidator::new(config.max_upload_bytes)
        .validate(RawImage::from_path(file)?)
        .map_err(|e| lab_report(e.into()))?;

    let jpeg = inference_client(config)?
        .preview(&submission)
        .await
        .map_err(|e| lab_report(e.into()))?;

    let out = out.unwrap_or_else(|| default_preview_path(file));
    std::fs::write(&out, &jpeg)
        .wrap_err_with(|| format!("failed to write preview to {}", out.display()))?;

    info!(path = %out.display(), size = jpeg.len(), "preview written");
    println!("{}", out.display());
    Ok(())
}

async fn record(config: &SagalConfig, cmd: RecordCommand) -> eyre::Result<()> {
    let store: Arc<dyn ObjectStore> = aws::object_store(config).await?;
    let book = RecordBook::new(store);

    match cmd {
        RecordCommand::Create(args) => {
            let handoff = handoff_store(config)?;
            let record = book
                .create_from_handoff(&handoff, PatientRecordDraft::from(args))
                .await
                .map_err(lab_report)?;
            print_json(&record)
        }
        RecordCommand::Update { id, draft } => {
            let record = book
                .update(id, PatientRecordDraft::from(draft))
                .await
                .map_err(lab_report)?;
            print_json(&record)
        }
        RecordCommand::Show { id } => print_json(&book.get(id).await.map_err(lab_report)?),
        RecordCommand::List => print_json(&book.list().await.map_err(lab_report)?),
    }
}

fn inference_client(config: &SagalConfig) -> eyre::Result<InferenceClient> {
    let mut inference = InferenceConfig::new(config.inference_url.clone());
    inference.timeout = config.inference_timeout();
    inference.retry = RetryPolicy::default().with_max_attempts(config.max_attempts.max(1));
    Ok(InferenceClient::new(inference)?)
}

fn handoff_store(config: &SagalConfig) -> eyre::Result<HandoffStore<FileSlotStore>> {
    let mut store = HandoffStore::new(FileSlotStore::new(config.handoff_dir()?));
    if let Some(ttl) = config.handoff_ttl() {
        store = store.with_ttl(ttl);
    }
    Ok(store)
}

/// Attach the clinician-facing message to a pipeline error.
fn lab_report(err: LabError) -> eyre::Report {
    let message = err.user_message();
    eyre::Report::new(err).wrap_err(message)
}

fn default_preview_path(file: &Path) -> PathBuf {
    let stem = file
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    file.with_file_name(format!("{stem}-preview.jpg"))
}

fn print_json<T: Serialize>(value: &T) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_path_sits_next_to_the_input() {
        assert_eq!(
            default_preview_path(Path::new("/slides/smear-01.png")),
            PathBuf::from("/slides/smear-01-preview.jpg")
        );
    }

    #[test]
    fn lab_report_leads_with_the_user_message() {
        let report = lab_report(LabError::NothingStaged);
        assert_eq!(
            report.to_string(),
            "There is no lab result waiting to be recorded."
        );
    }
}
