//! `ObjectStore` backed by Amazon S3 (or any S3-compatible endpoint).

use super::{BackendError, BackendResult, ObjectPage, ObjectStore};
use crate::errors::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_credential_types::provider::{ProvideCredentials, SharedCredentialsProvider};
use aws_sdk_s3::{
    Client,
    config::Region,
    error::{DisplayErrorContext, ProvideErrorMetadata},
    primitives::ByteStream,
    types::{Delete, ObjectIdentifier},
};
use bytes::Bytes;
use std::error::Error as StdError;
use tracing::debug;

/// S3 accepts at most this many keys per `DeleteObjects` request.
const MAX_KEYS_PER_DELETE: usize = 1000;

/// Overrides applied on top of the ambient AWS configuration chain.
#[derive(Debug, Clone, Default)]
pub struct S3Settings {
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub force_path_style: bool,
}

#[derive(Clone, Debug)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    /// Resolve credentials and region from the environment and build a client.
    ///
    /// Credentials are resolved once here, so a missing or broken chain fails
    /// with `RepositoryError::Configuration` instead of surfacing on the first
    /// request. A missing region fails the same way.
    pub async fn connect(settings: &S3Settings) -> RepositoryResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &settings.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &settings.endpoint_url {
            loader = loader.endpoint_url(endpoint.clone());
        }
        let sdk_config = loader.load().await;

        if sdk_config.region().is_none() {
            return Err(RepositoryError::Configuration(
                "no AWS region resolved; set AWS_REGION or pass --region".into(),
            ));
        }
        ensure_credentials(sdk_config.credentials_provider()).await?;

        debug!(
            region = ?sdk_config.region(),
            endpoint = ?settings.endpoint_url,
            "resolved S3 configuration"
        );

        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(settings.force_path_style)
            .build();
        Ok(Self::from_client(Client::from_conf(s3_config)))
    }

    pub fn from_client(client: Client) -> Self {
        Self { client }
    }
}

async fn ensure_credentials(provider: Option<SharedCredentialsProvider>) -> RepositoryResult<()> {
    let Some(provider) = provider else {
        return Err(RepositoryError::Configuration(
            "no AWS credentials provider configured".into(),
        ));
    };
    provider.provide_credentials().await.map_err(|err| {
        RepositoryError::Configuration(format!(
            "no usable AWS credentials: {}",
            DisplayErrorContext(&err)
        ))
    })?;
    Ok(())
}

/// Keep the whole SDK error chain in the message; `SdkError`'s own
/// `Display` is just "service error".
fn sdk_failure<E>(err: E) -> BackendError
where
    E: StdError + Send + Sync + 'static,
{
    BackendError::Service {
        message: DisplayErrorContext(&err).to_string(),
        source: Box::new(err),
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Bytes) -> BackendResult<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(sdk_failure)?;
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> BackendResult<Bytes> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err) => {
                let missing = err
                    .as_service_error()
                    .is_some_and(|service_err| service_err.is_no_such_key())
                    || err.code() == Some("NotFound");
                if missing {
                    return Err(BackendError::NotFound {
                        bucket: bucket.to_string(),
                        key: key.to_string(),
                    });
                }
                return Err(sdk_failure(err));
            }
        };

        let body = output.body.collect().await.map_err(sdk_failure)?;
        Ok(body.into_bytes())
    }

    async fn list_objects_page(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: Option<String>,
    ) -> BackendResult<ObjectPage> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(bucket)
            .prefix(prefix)
            .set_continuation_token(continuation_token)
            .send()
            .await
            .map_err(sdk_failure)?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|object| object.key().map(str::to_owned))
            .collect();
        let next_continuation_token = if output.is_truncated().unwrap_or(false) {
            output.next_continuation_token().map(str::to_owned)
        } else {
            None
        };

        Ok(ObjectPage {
            keys,
            next_continuation_token,
        })
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> BackendResult<()> {
        for chunk in keys.chunks(MAX_KEYS_PER_DELETE) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(sdk_failure)?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(sdk_failure)?;

            let output = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(sdk_failure)?;

            // Quiet mode only reports the keys that failed.
            if let Some(failure) = output.errors().first() {
                return Err(BackendError::DeleteRejected {
                    key: failure.key().unwrap_or_default().to_string(),
                    reason: failure
                        .message()
                        .or(failure.code())
                        .unwrap_or("unknown error")
                        .to_string(),
                });
            }
        }
        Ok(())
    }
}
