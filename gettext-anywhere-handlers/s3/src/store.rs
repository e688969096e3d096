use crate::S3Options;
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_s3::Client;
use aws_sdk_s3::config::Credentials;
use aws_sdk_s3::operation::get_object::GetObjectError;
use std::collections::HashMap;
use std::fmt::{Debug, Formatter};
use std::sync::{Arc, LazyLock};
use tokio::sync::{Mutex, OnceCell};
use tracing::debug;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The object storage operations that the S3 handler needs.
#[async_trait]
pub trait ObjectStore: Debug + Send + Sync {
    /// Checks whether an object exists without downloading it.
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, BoxError>;

    /// Downloads an object, [None] if there is no object with this key.
    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, BoxError>;
}

/// An [`ObjectStore`] backed by the AWS SDK.
#[derive(Debug, Clone)]
pub struct S3ObjectStore {
    client: Client,
}

impl S3ObjectStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    /// Builds a client from the default AWS configuration chain and the handler options.
    pub async fn connect(options: &S3Options) -> Self {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = &options.region {
            loader = loader.region(Region::new(region.clone()));
        }
        if let Some(endpoint) = &options.endpoint {
            loader = loader.endpoint_url(endpoint);
        }
        if let (Some(access_key_id), Some(secret_access_key)) =
            (&options.aws_access_key_id, &options.aws_secret_access_key)
        {
            loader = loader.credentials_provider(Credentials::new(
                access_key_id,
                secret_access_key,
                None,
                None,
                "gettext-anywhere",
            ));
        }
        let shared_config = loader.load().await;

        let mut s3_builder = aws_sdk_s3::config::Builder::from(&shared_config);
        if options.force_path_style {
            s3_builder = s3_builder.force_path_style(true);
        }
        debug!(bucket = %options.bucket_name, "created s3 client");
        Self::new(Client::from_conf(s3_builder.build()))
    }
}

/// The options that determine how a client connects. Handlers with equal keys share a client.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    region: Option<String>,
    endpoint: Option<String>,
    credentials: Option<(String, String)>,
    force_path_style: bool,
}

impl From<&S3Options> for ConnectionKey {
    fn from(options: &S3Options) -> Self {
        Self {
            region: options.region.clone(),
            endpoint: options.endpoint.clone(),
            credentials: options
                .aws_access_key_id
                .clone()
                .zip(options.aws_secret_access_key.clone()),
            force_path_style: options.force_path_style,
        }
    }
}

impl Debug for ConnectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionKey")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .finish_non_exhaustive()
    }
}

/// The stores that were connected during the lifetime of the process.
pub(crate) static STORES: LazyLock<StorePool> = LazyLock::new(StorePool::default);

/// [StorePool] keeps one store per [ConnectionKey], so the AWS configuration chain is only
/// loaded once per distinct connection.
#[derive(Debug, Default)]
pub struct StorePool {
    stores: Mutex<HashMap<ConnectionKey, Arc<OnceCell<Arc<dyn ObjectStore>>>>>,
}

impl StorePool {
    /// Returns the store for `key`, connecting it with `connect` if there is none yet.
    ///
    /// Concurrent callers with the same key wait for a single connection attempt.
    pub async fn get_or_connect<F, Fut>(
        &self,
        key: ConnectionKey,
        connect: F,
    ) -> Arc<dyn ObjectStore>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Arc<dyn ObjectStore>>,
    {
        let cell = Arc::clone(self.stores.lock().await.entry(key).or_default());
        Arc::clone(cell.get_or_init(connect).await)
    }

    pub async fn len(&self) -> usize {
        self.stores.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.stores.lock().await.is_empty()
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, BoxError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(err) if err.as_service_error().is_some_and(|err| err.is_not_found()) => Ok(false),
            Err(err) => Err(Box::new(err)),
        }
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Option<Vec<u8>>, BoxError> {
        let output = match self.client.get_object().bucket(bucket).key(key).send().await {
            Ok(output) => output,
            Err(err)
                if err
                    .as_service_error()
                    .is_some_and(GetObjectError::is_no_such_key) =>
            {
                return Ok(None);
            }
            Err(err) => return Err(Box::new(err)),
        };
        let bytes = output.body.collect().await?.into_bytes();
        Ok(Some(bytes.to_vec()))
    }
}
