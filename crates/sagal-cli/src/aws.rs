use std::sync::Arc;

use sagal_storage::{ObjectStore, S3ObjectStore};

use crate::config::{CredentialSource, SagalConfig};

/// Build an `SdkConfig` from a region and credential source.
pub async fn build_aws_config(region: &str, creds: &CredentialSource) -> aws_config::SdkConfig {
    let mut builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    match creds {
        CredentialSource::Inline {
            access_key_id,
            secret_access_key,
            session_token,
        } => {
            builder = builder.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key_id,
                secret_access_key,
                session_token.clone(),
                None,
                "sagal-config",
            ));
        }
        CredentialSource::Profile { profile_name } => {
            builder = builder.profile_name(profile_name);
        }
        CredentialSource::DefaultChain => {}
    }

    builder.load().await
}

/// The object store behind smear images and patient records.
pub async fn object_store(config: &SagalConfig) -> eyre::Result<Arc<dyn ObjectStore>> {
    if config.bucket.trim().is_empty() {
        return Err(eyre::eyre!(
            "no bucket configured; set `bucket` in the config file or pass --bucket"
        ));
    }

    let sdk_config = build_aws_config(&config.region, &config.credentials).await;
    let client = aws_sdk_s3::Client::new(&sdk_config);

    let mut store = S3ObjectStore::new(client, config.bucket.clone(), &config.region);
    if let Some(base) = &config.public_base_url {
        store = store.with_public_base_url(base.clone());
    }

    tracing::debug!(bucket = %config.bucket, region = %config.region, "using S3 object store");
    Ok(Arc::new(store))
}
