//! Presigned URLs and POST policies.
//!
//! Both share the SigV4 primitives in [`crate::signing`]. All
//! operations refuse to run for anonymous clients before any I/O
//! happens.

use crate::error::Error;
use crate::executor::{Executor, RequestSpec};
use crate::request::build_target;
use crate::signing::{
    self, credential_scope, encode_policy, post_presign_signature, presign_v4, AWS_ALGORITHM,
};
use crate::validate;
use chrono::{DateTime, SecondsFormat, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Presigned URL generation and POST-policy signing.
pub struct PresignService {
    executor: Arc<Executor>,
}

impl PresignService {
    /// Create a new presign service.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Produce a presigned GET URL valid for `expires_secs` seconds.
    pub async fn presigned_get_object(
        &self,
        bucket: &str,
        object: &str,
        expires_secs: u64,
    ) -> Result<String, Error> {
        self.presigned_url("GET", bucket, object, expires_secs).await
    }

    /// Produce a presigned PUT URL valid for `expires_secs` seconds.
    pub async fn presigned_put_object(
        &self,
        bucket: &str,
        object: &str,
        expires_secs: u64,
    ) -> Result<String, Error> {
        self.presigned_url("PUT", bucket, object, expires_secs).await
    }

    async fn presigned_url(
        &self,
        method: &str,
        bucket: &str,
        object: &str,
        expires_secs: u64,
    ) -> Result<String, Error> {
        let config = self.executor.config();
        if config.is_anonymous() {
            return Err(Error::AnonymousRequest);
        }
        validate::bucket_name(bucket)?;
        validate::object_name(object)?;
        validate::expiry(expires_secs)?;

        let region = self.executor.resolve_region(Some(bucket)).await?;
        let spec = RequestSpec::new(method).bucket(bucket).object(object);
        let target = build_target(config, &spec);

        let query = presign_v4(
            method,
            &target.host_header,
            &target.path,
            &config.access_key,
            &config.secret_key,
            &region,
            &Utc::now(),
            expires_secs,
        );

        Ok(format!(
            "{}://{}{}?{}",
            config.scheme(),
            target.host_header,
            target.path,
            query
        ))
    }

    /// Sign a POST policy and return the completed form-data map.
    ///
    /// The caller embeds the map in an HTML form; the client never
    /// submits the form itself.
    pub async fn presigned_post_policy(
        &self,
        mut policy: PostPolicy,
    ) -> Result<HashMap<String, String>, Error> {
        let config = self.executor.config();
        if config.is_anonymous() {
            return Err(Error::AnonymousRequest);
        }

        let bucket = policy
            .bucket
            .clone()
            .ok_or_else(|| Error::InvalidArgument {
                message: "post policy has no bucket".to_string(),
            })?;
        if policy.expiration.is_none() {
            return Err(Error::InvalidDate {
                message: "post policy has no expiration".to_string(),
            });
        }

        let region = self.executor.resolve_region(Some(&bucket)).await?;
        let now = Utc::now();
        let amz_date = signing::format_datetime(&now);
        let credential = format!(
            "{}/{}",
            config.access_key,
            credential_scope(&signing::format_date_stamp(&now), &region)
        );

        policy.push_condition("eq", "$x-amz-date", &amz_date);
        policy.push_condition("eq", "$x-amz-algorithm", AWS_ALGORITHM);
        policy.push_condition("eq", "$x-amz-credential", &credential);

        let policy_base64 = encode_policy(&policy.to_json());
        let signature = post_presign_signature(&policy_base64, &config.secret_key, &region, &now);

        let mut form_data = policy.form_data;
        form_data.insert("x-amz-date".to_string(), amz_date);
        form_data.insert("x-amz-algorithm".to_string(), AWS_ALGORITHM.to_string());
        form_data.insert("x-amz-credential".to_string(), credential);
        form_data.insert("policy".to_string(), policy_base64);
        form_data.insert("x-amz-signature".to_string(), signature);

        Ok(form_data)
    }
}

impl std::fmt::Debug for PresignService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresignService").finish_non_exhaustive()
    }
}

/// A POST policy for browser-based uploads: a set of conditions plus
/// the form fields that satisfy them.
#[derive(Debug, Clone, Default)]
pub struct PostPolicy {
    expiration: Option<DateTime<Utc>>,
    conditions: Vec<(String, String, String)>,
    content_length_range: Option<(u64, u64)>,
    bucket: Option<String>,
    form_data: HashMap<String, String>,
}

impl PostPolicy {
    /// Create an empty policy.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy expiration. Must lie in the future.
    pub fn set_expires(&mut self, when: DateTime<Utc>) -> Result<(), Error> {
        if when <= Utc::now() {
            return Err(Error::InvalidDate {
                message: "post policy expiration must lie in the future".to_string(),
            });
        }
        self.expiration = Some(when);
        Ok(())
    }

    /// Constrain the upload to a bucket.
    pub fn set_bucket(&mut self, bucket: &str) -> Result<(), Error> {
        validate::bucket_name(bucket)?;
        self.push_condition("eq", "$bucket", bucket);
        self.form_data.insert("bucket".to_string(), bucket.to_string());
        self.bucket = Some(bucket.to_string());
        Ok(())
    }

    /// Constrain the upload to an exact object key.
    pub fn set_key(&mut self, key: &str) -> Result<(), Error> {
        validate::object_name(key)?;
        self.push_condition("eq", "$key", key);
        self.form_data.insert("key".to_string(), key.to_string());
        Ok(())
    }

    /// Constrain the upload to keys with a prefix.
    pub fn set_key_starts_with(&mut self, prefix: &str) -> Result<(), Error> {
        validate::prefix(prefix)?;
        self.push_condition("starts-with", "$key", prefix);
        self.form_data.insert("key".to_string(), prefix.to_string());
        Ok(())
    }

    /// Constrain the upload's content type.
    pub fn set_content_type(&mut self, content_type: &str) -> Result<(), Error> {
        if content_type.is_empty() {
            return Err(Error::InvalidArgument {
                message: "content type must not be empty".to_string(),
            });
        }
        self.push_condition("eq", "$Content-Type", content_type);
        self.form_data
            .insert("Content-Type".to_string(), content_type.to_string());
        Ok(())
    }

    /// Constrain the upload size to an inclusive byte range. This
    /// condition has no form-data entry.
    pub fn set_content_length_range(&mut self, min: u64, max: u64) -> Result<(), Error> {
        if min > max {
            return Err(Error::InvalidArgument {
                message: "content-length-range minimum exceeds maximum".to_string(),
            });
        }
        self.content_length_range = Some((min, max));
        Ok(())
    }

    fn push_condition(&mut self, op: &str, field: &str, value: &str) {
        self.conditions
            .push((op.to_string(), field.to_string(), value.to_string()));
    }

    /// Render the policy document as JSON for signing.
    pub fn to_json(&self) -> String {
        let mut conditions: Vec<serde_json::Value> = self
            .conditions
            .iter()
            .map(|(op, field, value)| serde_json::json!([op, field, value]))
            .collect();
        if let Some((min, max)) = self.content_length_range {
            conditions.push(serde_json::json!(["content-length-range", min, max]));
        }

        let expiration = self
            .expiration
            .map(|when| when.to_rfc3339_opts(SecondsFormat::Millis, true))
            .unwrap_or_default();

        serde_json::json!({
            "expiration": expiration,
            "conditions": conditions,
        })
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn policy_requires_future_expiration() {
        let mut policy = PostPolicy::new();
        assert!(policy.set_expires(Utc::now() - Duration::hours(1)).is_err());
        assert!(policy.set_expires(Utc::now() + Duration::hours(1)).is_ok());
    }

    #[test]
    fn policy_json_contains_conditions() {
        let mut policy = PostPolicy::new();
        policy.set_expires(Utc::now() + Duration::days(1)).unwrap();
        policy.set_bucket("my-bucket").unwrap();
        policy.set_key("uploads/photo.jpg").unwrap();
        policy.set_content_length_range(1024, 10240).unwrap();

        let json = policy.to_json();
        assert!(json.contains(r#"["eq","$bucket","my-bucket"]"#));
        assert!(json.contains(r#"["eq","$key","uploads/photo.jpg"]"#));
        assert!(json.contains(r#"["content-length-range",1024,10240]"#));
        assert!(json.contains("\"expiration\""));
    }

    #[test]
    fn key_starts_with_uses_starts_with_op() {
        let mut policy = PostPolicy::new();
        policy.set_key_starts_with("uploads/").unwrap();
        assert!(policy.to_json().contains(r#"["starts-with","$key","uploads/"]"#));
    }

    #[test]
    fn content_length_range_validates_order() {
        let mut policy = PostPolicy::new();
        assert!(policy.set_content_length_range(10, 1).is_err());
    }

    #[test]
    fn conditions_mirrored_into_form_data() {
        let mut policy = PostPolicy::new();
        policy.set_bucket("my-bucket").unwrap();
        policy.set_key("k.txt").unwrap();
        policy.set_content_type("text/plain").unwrap();

        assert_eq!(policy.form_data.get("bucket").map(String::as_str), Some("my-bucket"));
        assert_eq!(policy.form_data.get("key").map(String::as_str), Some("k.txt"));
        assert_eq!(
            policy.form_data.get("Content-Type").map(String::as_str),
            Some("text/plain")
        );
        policy.set_content_length_range(0, 10).unwrap();
        assert!(!policy.form_data.contains_key("content-length-range"));
    }
}
