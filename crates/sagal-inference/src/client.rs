use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use sagal_core::BoxFuture;
use sagal_core::intake::ImageSubmission;
use sagal_core::models::PredictionResult;
use tracing::{debug, info};

use crate::error::InferenceError;
use crate::response::parse_prediction;
use crate::retry::RetryPolicy;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Multipart field the service reads the image from.
const FILE_FIELD: &str = "file";

/// Longest error body kept in `InferenceError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// Anything that can turn a submission into a prediction.
pub trait Classifier: Send + Sync {
    fn classify<'a>(
        &'a self,
        submission: &'a ImageSubmission,
    ) -> BoxFuture<'a, Result<PredictionResult, InferenceError>>;
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Service root, e.g. `http://localhost:5000`.
    pub base_url: String,
    /// Per-attempt limit covering connect, upload, and response body.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl InferenceConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: DEFAULT_TIMEOUT,
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client for the smear classification service.
#[derive(Debug, Clone)]
pub struct InferenceClient {
    http: Client,
    predict_url: Url,
    preview_url: Url,
    timeout: Duration,
    retry: RetryPolicy,
}

struct Reply {
    body: Vec<u8>,
    content_type: Option<String>,
}

impl InferenceClient {
    pub fn new(config: InferenceConfig) -> Result<Self, InferenceError> {
        let mut base = Url::parse(&config.base_url).map_err(|e| {
            InferenceError::Config(format!("invalid base URL {}: {e}", config.base_url))
        })?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        let predict_url = join(&base, "predict")?;
        let preview_url = join(&base, "preview")?;

        let http = Client::builder()
            .connect_timeout(config.timeout)
            .build()
            .map_err(|e| InferenceError::Config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            predict_url,
            preview_url,
            timeout: config.timeout,
            retry: config.retry,
        })
    }

    pub fn predict_url(&self) -> &Url {
        &self.predict_url
    }

    /// Send the submission's image to `/predict` and parse the result.
    ///
    /// A non-success status is a service failure, never a negative
    /// prediction.
    pub async fn classify(
        &self,
        submission: &ImageSubmission,
    ) -> Result<PredictionResult, InferenceError> {
        info!(
            submission_id = %submission.id(),
            size = submission.size_bytes(),
            "sending image for classification"
        );

        let prediction = self
            .retry
            .run(|attempt| self.classify_once(submission, attempt))
            .await?;

        info!(
            submission_id = %submission.id(),
            label = %prediction.label,
            confidence = %prediction.confidence,
            "classification received"
        );
        Ok(prediction)
    }

    async fn classify_once(
        &self,
        submission: &ImageSubmission,
        attempt: u32,
    ) -> Result<PredictionResult, InferenceError> {
        debug!(attempt, url = %self.predict_url, "posting image");
        let reply = self.post_image(&self.predict_url, submission).await?;
        parse_prediction(&reply.body)
    }

    /// Fetch the side-by-side original/pre-processed JPEG from `/preview`.
    pub async fn preview(&self, submission: &ImageSubmission) -> Result<Vec<u8>, InferenceError> {
        let reply = self.post_image(&self.preview_url, submission).await?;
        match reply.content_type.as_deref() {
            Some(ct) if ct.starts_with("image/") => Ok(reply.body),
            other => Err(InferenceError::Protocol(format!(
                "expected an image from /preview, got {}",
                other.unwrap_or("no content type")
            ))),
        }
    }

    async fn post_image(
        &self,
        url: &Url,
        submission: &ImageSubmission,
    ) -> Result<Reply, InferenceError> {
        let form = image_form(submission)?;

        let exchange = async {
            let resp = self
                .http
                .post(url.clone())
                .multipart(form)
                .send()
                .await
                .map_err(|e| InferenceError::Transport(e.to_string()))?;

            let status = resp.status();
            let content_type = resp
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = resp
                .bytes()
                .await
                .map_err(|e| InferenceError::Transport(e.to_string()))?;

            if !status.is_success() {
                return Err(InferenceError::Status {
                    status: status.as_u16(),
                    body: String::from_utf8_lossy(&body)
                        .chars()
                        .take(MAX_ERROR_BODY)
                        .collect(),
                });
            }

            Ok(Reply {
                body: body.to_vec(),
                content_type,
            })
        };

        tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| InferenceError::Timeout(self.timeout))?
    }
}

impl Classifier for InferenceClient {
    fn classify<'a>(
        &'a self,
        submission: &'a ImageSubmission,
    ) -> BoxFuture<'a, Result<PredictionResult, InferenceError>> {
        Box::pin(InferenceClient::classify(self, submission))
    }
}

fn join(base: &Url, path: &str) -> Result<Url, InferenceError> {
    base.join(path)
        .map_err(|e| InferenceError::Config(format!("invalid endpoint {base}{path}: {e}")))
}

fn image_form(submission: &ImageSubmission) -> Result<Form, InferenceError> {
    let part = Part::bytes(submission.bytes().to_vec())
        .file_name(submission.file_name().to_string())
        .mime_str(submission.mime_type())
        .map_err(|e| {
            InferenceError::Config(format!(
                "invalid content type {}: {e}",
                submission.mime_type()
            ))
        })?;
    Ok(Form::new().part(FILE_FIELD, part))
}
