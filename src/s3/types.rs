//! Transfer request types and their translation into SDK inputs

use std::collections::HashMap;
use std::path::PathBuf;

use aws_sdk_s3::operation::get_object::builders::GetObjectInputBuilder;
use aws_sdk_s3::operation::get_object::GetObjectInput;
use aws_sdk_s3::operation::put_object::builders::PutObjectInputBuilder;
use aws_sdk_s3::operation::put_object::PutObjectInput;
use aws_sdk_s3::primitives::DateTime as SmithyDateTime;
use aws_sdk_s3::types::{
    ObjectCannedAcl, ObjectLockLegalHoldStatus, ObjectLockMode, RequestPayer,
    ServerSideEncryption, StorageClass,
};
use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::s3::credentials::non_empty;

/// Options for a single object upload
///
/// The body is taken from `body` when set, otherwise read from `path`.
/// `file_name` becomes the object key; `bucket` falls back to the configured
/// default when unset. Empty strings are treated as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadInput {
    pub body: Option<Bytes>,
    pub path: Option<PathBuf>,
    pub bucket: Option<String>,
    pub file_name: Option<String>,
    pub acl: Option<String>,
    pub cache_control: Option<String>,
    pub content_disposition: Option<String>,
    pub content_encoding: Option<String>,
    pub content_language: Option<String>,
    pub content_md5: Option<String>,
    pub content_type: Option<String>,
    pub expires: Option<DateTime<Utc>>,
    pub grant_full_control: Option<String>,
    pub grant_read: Option<String>,
    pub grant_read_acp: Option<String>,
    pub grant_write_acp: Option<String>,
    pub metadata: HashMap<String, String>,
    pub object_lock_legal_hold_status: Option<String>,
    pub object_lock_mode: Option<String>,
    pub object_lock_retain_until_date: Option<DateTime<Utc>>,
    pub request_payer: Option<String>,
    pub sse_customer_algorithm: Option<String>,
    pub sse_customer_key: Option<String>,
    pub sse_customer_key_md5: Option<String>,
    pub ssekms_encryption_context: Option<String>,
    pub ssekms_key_id: Option<String>,
    pub server_side_encryption: Option<String>,
    pub storage_class: Option<String>,
    pub tagging: Option<String>,
    pub website_redirect_location: Option<String>,
}

impl UploadInput {
    /// Upload the file at `path` under `file_name`
    pub fn from_path(path: impl Into<PathBuf>, file_name: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    /// Upload an in-memory body under `file_name`
    pub fn from_body(body: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            body: Some(body.into()),
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    /// Take the body, or failing that the non-empty source path
    pub fn take_source(&mut self) -> Option<UploadSource> {
        if let Some(body) = self.body.take() {
            return Some(UploadSource::Bytes(body));
        }
        self.path
            .take()
            .filter(|p| !p.as_os_str().is_empty())
            .map(UploadSource::File)
    }

    /// Consume the input, moving every set object field onto a `PutObject`
    /// request. The body travels separately as an [`UploadSource`].
    pub fn into_put_object_input(self) -> PutObjectInputBuilder {
        PutObjectInput::builder()
            .set_acl(non_empty(&self.acl).map(ObjectCannedAcl::from))
            .set_bucket(owned(&self.bucket))
            .set_cache_control(owned(&self.cache_control))
            .set_content_disposition(owned(&self.content_disposition))
            .set_content_encoding(owned(&self.content_encoding))
            .set_content_language(owned(&self.content_language))
            .set_content_md5(owned(&self.content_md5))
            .set_content_type(owned(&self.content_type))
            .set_expires(self.expires.map(to_smithy_time))
            .set_grant_full_control(owned(&self.grant_full_control))
            .set_grant_read(owned(&self.grant_read))
            .set_grant_read_acp(owned(&self.grant_read_acp))
            .set_grant_write_acp(owned(&self.grant_write_acp))
            .set_key(owned(&self.file_name))
            .set_metadata((!self.metadata.is_empty()).then_some(self.metadata))
            .set_object_lock_legal_hold_status(
                non_empty(&self.object_lock_legal_hold_status).map(ObjectLockLegalHoldStatus::from),
            )
            .set_object_lock_mode(non_empty(&self.object_lock_mode).map(ObjectLockMode::from))
            .set_object_lock_retain_until_date(
                self.object_lock_retain_until_date.map(to_smithy_time),
            )
            .set_request_payer(non_empty(&self.request_payer).map(RequestPayer::from))
            .set_sse_customer_algorithm(owned(&self.sse_customer_algorithm))
            .set_sse_customer_key(owned(&self.sse_customer_key))
            .set_sse_customer_key_md5(owned(&self.sse_customer_key_md5))
            .set_ssekms_encryption_context(owned(&self.ssekms_encryption_context))
            .set_ssekms_key_id(owned(&self.ssekms_key_id))
            .set_server_side_encryption(
                non_empty(&self.server_side_encryption).map(ServerSideEncryption::from),
            )
            .set_storage_class(non_empty(&self.storage_class).map(StorageClass::from))
            .set_tagging(owned(&self.tagging))
            .set_website_redirect_location(owned(&self.website_redirect_location))
    }
}

/// Where the bytes of an upload come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadSource {
    Bytes(Bytes),
    File(PathBuf),
}

/// Options for a single object download
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadInput {
    pub bucket: Option<String>,
    pub if_match: Option<String>,
    pub if_modified_since: Option<DateTime<Utc>>,
    pub if_none_match: Option<String>,
    pub if_unmodified_since: Option<DateTime<Utc>>,
    pub file_name: Option<String>,
    /// Zero means "whole object", same as unset
    pub part_number: Option<i32>,
    pub range: Option<String>,
    pub request_payer: Option<String>,
    pub response_cache_control: Option<String>,
    pub response_content_disposition: Option<String>,
    pub response_content_encoding: Option<String>,
    pub response_content_language: Option<String>,
    pub response_content_type: Option<String>,
    pub response_expires: Option<DateTime<Utc>>,
    pub sse_customer_algorithm: Option<String>,
    pub sse_customer_key: Option<String>,
    pub sse_customer_key_md5: Option<String>,
    pub version_id: Option<String>,
}

impl DownloadInput {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: Some(file_name.into()),
            ..Default::default()
        }
    }

    /// Build the `GetObject` request for this input
    pub fn to_get_object_input(&self) -> GetObjectInputBuilder {
        GetObjectInput::builder()
            .set_bucket(owned(&self.bucket))
            .set_if_match(owned(&self.if_match))
            .set_if_modified_since(self.if_modified_since.map(to_smithy_time))
            .set_if_none_match(owned(&self.if_none_match))
            .set_if_unmodified_since(self.if_unmodified_since.map(to_smithy_time))
            .set_key(owned(&self.file_name))
            .set_part_number(self.part_number.filter(|n| *n != 0))
            .set_range(owned(&self.range))
            .set_request_payer(non_empty(&self.request_payer).map(RequestPayer::from))
            .set_response_cache_control(owned(&self.response_cache_control))
            .set_response_content_disposition(owned(&self.response_content_disposition))
            .set_response_content_encoding(owned(&self.response_content_encoding))
            .set_response_content_language(owned(&self.response_content_language))
            .set_response_content_type(owned(&self.response_content_type))
            .set_response_expires(self.response_expires.map(to_smithy_time))
            .set_sse_customer_algorithm(owned(&self.sse_customer_algorithm))
            .set_sse_customer_key(owned(&self.sse_customer_key))
            .set_sse_customer_key_md5(owned(&self.sse_customer_key_md5))
            .set_version_id(owned(&self.version_id))
    }
}

/// Result of a completed upload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadOutput {
    pub bucket: String,
    pub key: String,
    pub e_tag: Option<String>,
    pub version_id: Option<String>,
    pub server_side_encryption: Option<String>,
    pub expiration: Option<String>,
}

impl UploadOutput {
    /// Location of the uploaded object as an `s3://` URL
    pub fn location(&self) -> String {
        ObjectUrl {
            bucket: self.bucket.clone(),
            key: self.key.clone(),
        }
        .to_s3_url()
    }
}

/// Bucket and key of an object, parsed from a URL
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectUrl {
    pub bucket: String,
    pub key: String,
}

impl ObjectUrl {
    /// Parse `s3://bucket/key`, or an https URL in virtual-hosted
    /// (`bucket.s3.region.amazonaws.com/key`) or path style
    /// (`s3.region.amazonaws.com/bucket/key`)
    pub fn parse(input: &str) -> Option<Self> {
        if let Some(rest) = input.strip_prefix("s3://") {
            let (bucket, key) = rest.split_once('/').unwrap_or((rest, ""));
            return (!bucket.is_empty()).then(|| Self::new(bucket, key));
        }

        let parsed = url::Url::parse(input).ok()?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return None;
        }
        let host = parsed.host_str()?;
        if !host.ends_with(".amazonaws.com") {
            return None;
        }
        let path = urlencoding::decode(parsed.path().trim_start_matches('/')).ok()?;
        let path = path.as_ref();

        if let Some((bucket, _)) = host.split_once(".s3.") {
            return Some(Self::new(bucket, path));
        }
        if host.starts_with("s3.") {
            let (bucket, key) = path.split_once('/').unwrap_or((path, ""));
            return (!bucket.is_empty()).then(|| Self::new(bucket, key));
        }
        None
    }

    fn new(bucket: &str, key: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            key: key.to_string(),
        }
    }

    pub fn to_s3_url(&self) -> String {
        if self.key.is_empty() {
            format!("s3://{}", self.bucket)
        } else {
            format!("s3://{}/{}", self.bucket, self.key)
        }
    }
}

fn owned(value: &Option<String>) -> Option<String> {
    non_empty(value).map(str::to_string)
}

fn to_smithy_time(time: DateTime<Utc>) -> SmithyDateTime {
    SmithyDateTime::from_secs_and_nanos(time.timestamp(), time.timestamp_subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2030, 1, 2, 3, 4, 5).unwrap()
    }

    #[test]
    fn test_upload_input_maps_every_set_field() {
        let mut metadata = HashMap::new();
        metadata.insert("owner".to_string(), "billing".to_string());

        let input = UploadInput {
            bucket: Some("bucket-name".into()),
            file_name: Some("reports/invoice.pdf".into()),
            acl: Some("public-read".into()),
            cache_control: Some("max-age=60".into()),
            content_disposition: Some("attachment".into()),
            content_encoding: Some("gzip".into()),
            content_language: Some("en".into()),
            content_md5: Some("md5sum".into()),
            content_type: Some("application/pdf".into()),
            expires: Some(sample_time()),
            grant_full_control: Some("id=full".into()),
            grant_read: Some("id=read".into()),
            grant_read_acp: Some("id=read-acp".into()),
            grant_write_acp: Some("id=write-acp".into()),
            metadata,
            object_lock_legal_hold_status: Some("ON".into()),
            object_lock_mode: Some("GOVERNANCE".into()),
            object_lock_retain_until_date: Some(sample_time()),
            request_payer: Some("requester".into()),
            sse_customer_algorithm: Some("AES256".into()),
            sse_customer_key: Some("customer-key".into()),
            sse_customer_key_md5: Some("customer-key-md5".into()),
            ssekms_encryption_context: Some("context".into()),
            ssekms_key_id: Some("kms-key".into()),
            server_side_encryption: Some("aws:kms".into()),
            storage_class: Some("STANDARD_IA".into()),
            tagging: Some("team=payments".into()),
            website_redirect_location: Some("/elsewhere".into()),
            ..Default::default()
        };

        let req = input.into_put_object_input();
        let expected_time = SmithyDateTime::from_secs(sample_time().timestamp());

        assert_eq!(req.get_bucket().as_deref(), Some("bucket-name"));
        assert_eq!(req.get_key().as_deref(), Some("reports/invoice.pdf"));
        assert_eq!(req.get_acl(), &Some(ObjectCannedAcl::PublicRead));
        assert_eq!(req.get_cache_control().as_deref(), Some("max-age=60"));
        assert_eq!(req.get_content_disposition().as_deref(), Some("attachment"));
        assert_eq!(req.get_content_encoding().as_deref(), Some("gzip"));
        assert_eq!(req.get_content_language().as_deref(), Some("en"));
        assert_eq!(req.get_content_md5().as_deref(), Some("md5sum"));
        assert_eq!(req.get_content_type().as_deref(), Some("application/pdf"));
        assert_eq!(req.get_expires(), &Some(expected_time));
        assert_eq!(req.get_grant_full_control().as_deref(), Some("id=full"));
        assert_eq!(req.get_grant_read().as_deref(), Some("id=read"));
        assert_eq!(req.get_grant_read_acp().as_deref(), Some("id=read-acp"));
        assert_eq!(req.get_grant_write_acp().as_deref(), Some("id=write-acp"));
        assert_eq!(
            req.get_metadata()
                .as_ref()
                .and_then(|m| m.get("owner"))
                .map(String::as_str),
            Some("billing")
        );
        assert_eq!(
            req.get_object_lock_legal_hold_status(),
            &Some(ObjectLockLegalHoldStatus::On)
        );
        assert_eq!(req.get_object_lock_mode(), &Some(ObjectLockMode::Governance));
        assert_eq!(req.get_object_lock_retain_until_date(), &Some(expected_time));
        assert_eq!(req.get_request_payer(), &Some(RequestPayer::Requester));
        assert_eq!(req.get_sse_customer_algorithm().as_deref(), Some("AES256"));
        assert_eq!(req.get_sse_customer_key().as_deref(), Some("customer-key"));
        assert_eq!(req.get_sse_customer_key_md5().as_deref(), Some("customer-key-md5"));
        assert_eq!(req.get_ssekms_encryption_context().as_deref(), Some("context"));
        assert_eq!(req.get_ssekms_key_id().as_deref(), Some("kms-key"));
        assert_eq!(
            req.get_server_side_encryption(),
            &Some(ServerSideEncryption::AwsKms)
        );
        assert_eq!(req.get_storage_class(), &Some(StorageClass::StandardIa));
        assert_eq!(req.get_tagging().as_deref(), Some("team=payments"));
        assert_eq!(req.get_website_redirect_location().as_deref(), Some("/elsewhere"));
    }

    #[test]
    fn test_upload_input_leaves_empty_fields_unset() {
        let input = UploadInput {
            bucket: Some(String::new()),
            acl: Some(String::new()),
            content_type: Some(String::new()),
            storage_class: Some(String::new()),
            ..Default::default()
        };

        let req = input.into_put_object_input();

        assert!(req.get_bucket().is_none());
        assert!(req.get_key().is_none());
        assert!(req.get_acl().is_none());
        assert!(req.get_content_type().is_none());
        assert!(req.get_storage_class().is_none());
        assert!(req.get_expires().is_none());
        assert!(req.get_metadata().is_none());
    }

    #[test]
    fn test_take_source_prefers_body_over_path() {
        let mut input = UploadInput {
            body: Some(Bytes::from_static(b"hello")),
            ..UploadInput::from_path("./on-disk.txt", "hello.txt")
        };
        assert_eq!(
            input.take_source(),
            Some(UploadSource::Bytes(Bytes::from_static(b"hello")))
        );
        assert!(input.body.is_none());
        assert_eq!(input.path.as_deref(), Some(std::path::Path::new("./on-disk.txt")));

        assert_eq!(
            input.take_source(),
            Some(UploadSource::File(PathBuf::from("./on-disk.txt")))
        );
    }

    #[test]
    fn test_take_source_without_body_or_path_is_none() {
        assert_eq!(UploadInput::default().take_source(), None);

        let mut input = UploadInput::from_path("", "empty.txt");
        assert_eq!(input.take_source(), None);
    }

    #[test]
    fn test_unknown_enum_value_passes_through() {
        let input = UploadInput {
            storage_class: Some("FUTURE_CLASS".into()),
            ..Default::default()
        };
        let req = input.into_put_object_input();
        assert_eq!(
            req.get_storage_class().as_ref().map(|s| s.as_str()),
            Some("FUTURE_CLASS")
        );
    }

    #[test]
    fn test_download_input_maps_every_set_field() {
        let input = DownloadInput {
            bucket: Some("bucket-name".into()),
            if_match: Some("etag-1".into()),
            if_modified_since: Some(sample_time()),
            if_none_match: Some("etag-2".into()),
            if_unmodified_since: Some(sample_time()),
            file_name: Some("reports/invoice.pdf".into()),
            part_number: Some(3),
            range: Some("bytes=0-99".into()),
            request_payer: Some("requester".into()),
            response_cache_control: Some("no-cache".into()),
            response_content_disposition: Some("inline".into()),
            response_content_encoding: Some("identity".into()),
            response_content_language: Some("de".into()),
            response_content_type: Some("text/plain".into()),
            response_expires: Some(sample_time()),
            sse_customer_algorithm: Some("AES256".into()),
            sse_customer_key: Some("customer-key".into()),
            sse_customer_key_md5: Some("customer-key-md5".into()),
            version_id: Some("v42".into()),
        };

        let req = input.to_get_object_input();
        let expected_time = SmithyDateTime::from_secs(sample_time().timestamp());

        assert_eq!(req.get_bucket().as_deref(), Some("bucket-name"));
        assert_eq!(req.get_if_match().as_deref(), Some("etag-1"));
        assert_eq!(req.get_if_modified_since(), &Some(expected_time));
        assert_eq!(req.get_if_none_match().as_deref(), Some("etag-2"));
        assert_eq!(req.get_if_unmodified_since(), &Some(expected_time));
        assert_eq!(req.get_key().as_deref(), Some("reports/invoice.pdf"));
        assert_eq!(req.get_part_number(), &Some(3));
        assert_eq!(req.get_range().as_deref(), Some("bytes=0-99"));
        assert_eq!(req.get_request_payer(), &Some(RequestPayer::Requester));
        assert_eq!(req.get_response_cache_control().as_deref(), Some("no-cache"));
        assert_eq!(req.get_response_content_disposition().as_deref(), Some("inline"));
        assert_eq!(req.get_response_content_encoding().as_deref(), Some("identity"));
        assert_eq!(req.get_response_content_language().as_deref(), Some("de"));
        assert_eq!(req.get_response_content_type().as_deref(), Some("text/plain"));
        assert_eq!(req.get_response_expires(), &Some(expected_time));
        assert_eq!(req.get_sse_customer_algorithm().as_deref(), Some("AES256"));
        assert_eq!(req.get_sse_customer_key().as_deref(), Some("customer-key"));
        assert_eq!(req.get_sse_customer_key_md5().as_deref(), Some("customer-key-md5"));
        assert_eq!(req.get_version_id().as_deref(), Some("v42"));
    }

    #[test]
    fn test_download_input_zero_part_number_is_unset() {
        let input = DownloadInput {
            part_number: Some(0),
            range: Some(String::new()),
            ..DownloadInput::new("file.txt")
        };
        let req = input.to_get_object_input();
        assert!(req.get_part_number().is_none());
        assert!(req.get_range().is_none());
        assert!(req.get_bucket().is_none());
        assert_eq!(req.get_key().as_deref(), Some("file.txt"));
    }

    #[test]
    fn test_subsecond_time_is_preserved() {
        let time = Utc.timestamp_opt(1_700_000_000, 250_000_000).unwrap();
        let converted = to_smithy_time(time);
        assert_eq!(converted.secs(), 1_700_000_000);
        assert_eq!(converted.subsec_nanos(), 250_000_000);
    }

    #[test]
    fn test_upload_output_location() {
        let output = UploadOutput {
            bucket: "bucket".into(),
            key: "a/b.txt".into(),
            ..Default::default()
        };
        assert_eq!(output.location(), "s3://bucket/a/b.txt");
    }

    #[test]
    fn test_object_url_parse_s3_scheme() {
        let url = ObjectUrl::parse("s3://my-bucket/path/to/file.txt").unwrap();
        assert_eq!(url.bucket, "my-bucket");
        assert_eq!(url.key, "path/to/file.txt");

        let url = ObjectUrl::parse("s3://my-bucket").unwrap();
        assert_eq!(url.key, "");
    }

    #[test]
    fn test_object_url_parse_https() {
        let url =
            ObjectUrl::parse("https://my-bucket.s3.eu-west-1.amazonaws.com/path/file.txt").unwrap();
        assert_eq!(url, ObjectUrl::new("my-bucket", "path/file.txt"));

        let url = ObjectUrl::parse("https://s3.eu-west-1.amazonaws.com/my-bucket/file.txt").unwrap();
        assert_eq!(url, ObjectUrl::new("my-bucket", "file.txt"));
    }

    #[test]
    fn test_object_url_parse_https_decodes_key() {
        let url =
            ObjectUrl::parse("https://my-bucket.s3.eu-west-1.amazonaws.com/my%20file.txt").unwrap();
        assert_eq!(url.key, "my file.txt");

        let url = ObjectUrl::parse("https://s3.eu-west-1.amazonaws.com/my-bucket/dir/r%C3%A9sum%C3%A9.pdf")
            .unwrap();
        assert_eq!(url, ObjectUrl::new("my-bucket", "dir/résumé.pdf"));
    }

    #[test]
    fn test_object_url_parse_rejects_other_inputs() {
        assert!(ObjectUrl::parse("https://example.com/file.txt").is_none());
        assert!(ObjectUrl::parse("ftp://bucket/key").is_none());
        assert!(ObjectUrl::parse("s3://").is_none());
        assert!(ObjectUrl::parse("plain-key.txt").is_none());
    }

    #[test]
    fn test_object_url_round_trip_to_s3_url() {
        assert_eq!(
            ObjectUrl::new("bucket", "dir/file").to_s3_url(),
            "s3://bucket/dir/file"
        );
        assert_eq!(ObjectUrl::new("bucket", "").to_s3_url(), "s3://bucket");
    }
}
