//! AWS S3 client wrapper

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::operation::get_object::builders::GetObjectInputBuilder;
use aws_sdk_s3::operation::put_object::builders::PutObjectInputBuilder;
use aws_sdk_s3::Client;
use aws_sdk_s3_transfer_manager::io::InputStream;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::{Error, Result};
use crate::s3::credentials::{non_empty, Options, ResolvedOptions};
use crate::s3::types::{DownloadInput, UploadInput, UploadOutput, UploadSource};

const CREDENTIALS_PROVIDER: &str = "aws-manager";

/// Public upload/download surface, implemented by [`AwsManager`]
#[async_trait]
pub trait Transfer: Send + Sync {
    async fn upload(&self, input: UploadInput) -> Result<UploadOutput>;

    /// Download into a file at `destination`, returning the bytes written
    async fn download(&self, destination: &Path, input: DownloadInput) -> Result<u64>;
}

/// The calls forwarded to the storage service
///
/// Implemented by [`S3Transfer`]; tests substitute their own.
#[async_trait]
pub trait TransferBackend: Send + Sync {
    /// Upload `source` with the object fields of `request`
    async fn upload_object(
        &self,
        request: PutObjectInputBuilder,
        source: UploadSource,
    ) -> Result<UploadOutput>;

    /// Fetch an object and stream its body into `sink`
    async fn download_object(
        &self,
        request: GetObjectInputBuilder,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64>;
}

/// Transfer manager backed uploads and downloads
///
/// Large objects are split into concurrent part requests by
/// `aws-sdk-s3-transfer-manager`; the plain SDK client stays available for
/// bucket and metadata calls.
pub struct S3Transfer {
    s3: Client,
    manager: aws_sdk_s3_transfer_manager::Client,
}

impl S3Transfer {
    pub fn new(s3: Client) -> Self {
        let config = aws_sdk_s3_transfer_manager::Config::builder()
            .client(s3.clone())
            .build();
        Self {
            s3,
            manager: aws_sdk_s3_transfer_manager::Client::new(config),
        }
    }

    pub fn s3_client(&self) -> &Client {
        &self.s3
    }
}

#[async_trait]
impl TransferBackend for S3Transfer {
    async fn upload_object(
        &self,
        request: PutObjectInputBuilder,
        source: UploadSource,
    ) -> Result<UploadOutput> {
        let input = request.build().map_err(Error::transfer("upload"))?;
        let body = match source {
            UploadSource::Bytes(bytes) => InputStream::from(bytes),
            UploadSource::File(path) => {
                InputStream::from_path(&path).map_err(Error::transfer("upload"))?
            }
        };

        let bucket = input.bucket.clone().unwrap_or_default();
        let key = input.key.clone().unwrap_or_default();

        let handle = self
            .manager
            .upload()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .body(body)
            .set_acl(input.acl)
            .set_cache_control(input.cache_control)
            .set_content_disposition(input.content_disposition)
            .set_content_encoding(input.content_encoding)
            .set_content_language(input.content_language)
            .set_content_md5(input.content_md5)
            .set_content_type(input.content_type)
            .set_expires(input.expires)
            .set_grant_full_control(input.grant_full_control)
            .set_grant_read(input.grant_read)
            .set_grant_read_acp(input.grant_read_acp)
            .set_grant_write_acp(input.grant_write_acp)
            .set_metadata(input.metadata)
            .set_object_lock_legal_hold_status(input.object_lock_legal_hold_status)
            .set_object_lock_mode(input.object_lock_mode)
            .set_object_lock_retain_until_date(input.object_lock_retain_until_date)
            .set_request_payer(input.request_payer)
            .set_sse_customer_algorithm(input.sse_customer_algorithm)
            .set_sse_customer_key(input.sse_customer_key)
            .set_sse_customer_key_md5(input.sse_customer_key_md5)
            .set_sse_kms_encryption_context(input.ssekms_encryption_context)
            .set_sse_kms_key_id(input.ssekms_key_id)
            .set_server_side_encryption(input.server_side_encryption)
            .set_storage_class(input.storage_class)
            .set_tagging(input.tagging)
            .set_website_redirect_location(input.website_redirect_location)
            .initiate()
            .map_err(Error::transfer("upload"))?;

        let output = handle.join().await.map_err(Error::transfer("upload"))?;

        Ok(UploadOutput {
            bucket,
            key,
            e_tag: output.e_tag().map(str::to_string),
            version_id: output.version_id().map(str::to_string),
            server_side_encryption: output
                .server_side_encryption()
                .map(|s| s.as_str().to_string()),
            expiration: output.expiration().map(str::to_string),
        })
    }

    async fn download_object(
        &self,
        request: GetObjectInputBuilder,
        sink: &mut (dyn AsyncWrite + Unpin + Send),
    ) -> Result<u64> {
        let input = request.build().map_err(Error::transfer("download"))?;

        let mut handle = self
            .manager
            .download()
            .set_bucket(input.bucket)
            .set_key(input.key)
            .set_if_match(input.if_match)
            .set_if_modified_since(input.if_modified_since)
            .set_if_none_match(input.if_none_match)
            .set_if_unmodified_since(input.if_unmodified_since)
            .set_part_number(input.part_number)
            .set_range(input.range)
            .set_request_payer(input.request_payer)
            .set_response_cache_control(input.response_cache_control)
            .set_response_content_disposition(input.response_content_disposition)
            .set_response_content_encoding(input.response_content_encoding)
            .set_response_content_language(input.response_content_language)
            .set_response_content_type(input.response_content_type)
            .set_response_expires(input.response_expires)
            .set_sse_customer_algorithm(input.sse_customer_algorithm)
            .set_sse_customer_key(input.sse_customer_key)
            .set_sse_customer_key_md5(input.sse_customer_key_md5)
            .set_version_id(input.version_id)
            .initiate()
            .map_err(Error::transfer("download"))?;

        let mut written = 0u64;
        while let Some(chunk) = handle.body_mut().next().await {
            let chunk = chunk.map_err(Error::transfer("download"))?;
            let bytes = chunk.data.into_bytes();
            sink.write_all(&bytes).await.map_err(Error::Write)?;
            written += bytes.len() as u64;
        }
        sink.flush().await.map_err(Error::Write)?;

        Ok(written)
    }
}

/// SDK configuration built only from resolved options
///
/// Nothing here reads the process environment or shared AWS config files.
pub(crate) fn s3_config(options: &ResolvedOptions) -> aws_sdk_s3::config::Builder {
    let credentials = Credentials::new(
        options.access_key_id.clone(),
        options.secret_access_key.clone(),
        options.token.clone(),
        None,
        CREDENTIALS_PROVIDER,
    );

    let mut builder = aws_sdk_s3::config::Builder::new()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(options.region.clone()))
        .credentials_provider(credentials);
    builder.set_endpoint_url(options.endpoint_url.clone());
    builder.force_path_style(options.force_path_style)
}

/// Uploads and downloads objects against a default bucket
pub struct AwsManager<B = S3Transfer> {
    options: ResolvedOptions,
    backend: B,
}

impl AwsManager<S3Transfer> {
    /// Resolve `options` (falling back to the environment) and build the clients
    pub fn new(options: Options) -> Result<Self> {
        let resolved = options.resolve()?;
        Ok(Self::from_resolved(resolved))
    }

    /// Build the clients for already resolved options
    pub fn from_resolved(options: ResolvedOptions) -> Self {
        let client = Client::from_conf(s3_config(&options).build());

        tracing::debug!(
            region = %options.region,
            bucket = %options.bucket,
            endpoint = ?options.endpoint_url,
            "created S3 client"
        );

        Self {
            options,
            backend: S3Transfer::new(client),
        }
    }
}

impl<B: TransferBackend> AwsManager<B> {
    /// Wrap an existing backend
    pub fn with_backend(options: ResolvedOptions, backend: B) -> Self {
        Self { options, backend }
    }

    pub fn options(&self) -> &ResolvedOptions {
        &self.options
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The default bucket used when an input doesn't name one
    pub fn bucket(&self) -> &str {
        &self.options.bucket
    }

    fn bucket_or_default(&self, bucket: &Option<String>) -> String {
        non_empty(bucket)
            .unwrap_or(self.options.bucket.as_str())
            .to_string()
    }
}

#[async_trait]
impl<B: TransferBackend> Transfer for AwsManager<B> {
    async fn upload(&self, mut input: UploadInput) -> Result<UploadOutput> {
        let source = input.take_source().ok_or(Error::MissingBody)?;
        if let UploadSource::File(path) = &source {
            tokio::fs::metadata(path)
                .await
                .map_err(|e| Error::io(path, e))?;
        }

        let bucket = self.bucket_or_default(&input.bucket);
        input.bucket = Some(bucket.clone());

        tracing::info!(
            "Uploading s3://{}/{}",
            bucket,
            non_empty(&input.file_name).unwrap_or_default()
        );

        self.backend
            .upload_object(input.into_put_object_input(), source)
            .await
    }

    async fn download(&self, destination: &Path, mut input: DownloadInput) -> Result<u64> {
        let mut file = tokio::fs::File::create(destination)
            .await
            .map_err(|e| Error::io(destination, e))?;

        input.bucket = Some(self.bucket_or_default(&input.bucket));

        tracing::info!(
            "Downloading s3://{}/{} to {:?}",
            input.bucket.as_deref().unwrap_or_default(),
            input.file_name.as_deref().unwrap_or_default(),
            destination
        );

        let written = self
            .backend
            .download_object(input.to_get_object_input(), &mut file)
            .await?;

        tracing::debug!("Downloaded {} bytes to {:?}", written, destination);
        Ok(written)
    }
}
