//! Bucket operations.

use crate::error::Error;
use crate::executor::{Executor, RequestSpec};
use crate::signing::sha256_hex;
use crate::types::{BucketAcl, BucketInfo, CannedAcl, Grant, REGIONS};
use crate::validate;
use crate::xml;
use bytes::Bytes;
use std::sync::Arc;

const ALL_USERS_URI: &str = "http://acs.amazonaws.com/groups/global/AllUsers";
const AUTHENTICATED_USERS_URI: &str =
    "http://acs.amazonaws.com/groups/global/AuthenticatedUsers";

/// Bucket CRUD, existence checks and ACL management.
pub struct BucketsService {
    executor: Arc<Executor>,
}

impl BucketsService {
    /// Create a new buckets service.
    pub fn new(executor: Arc<Executor>) -> Self {
        Self { executor }
    }

    /// Create a bucket in the given region with the given canned ACL.
    ///
    /// The request is signed for the target region directly since the
    /// bucket cannot be resolved before it exists. Regions other than
    /// the default carry a `CreateBucketConfiguration` body.
    pub async fn make_bucket(
        &self,
        bucket: &str,
        acl: CannedAcl,
        region: &str,
    ) -> Result<(), Error> {
        validate::bucket_name(bucket)?;
        if !REGIONS.contains(&region) {
            return Err(Error::InvalidArgument {
                message: format!("unknown region {region:?}"),
            });
        }

        let mut spec = RequestSpec::new("PUT")
            .bucket(bucket)
            .header("x-amz-acl", acl.as_str());

        let body = if region != crate::region::DEFAULT_REGION {
            let xml = xml::create_bucket_config_xml(region);
            spec = spec.header("content-length", xml.len().to_string());
            Some(Bytes::from(xml))
        } else {
            None
        };
        let body_sha256 = body.as_ref().map(|b| sha256_hex(b));

        self.executor
            .execute_in_region(spec, body, body_sha256, 200, region)
            .await?;
        Ok(())
    }

    /// List all buckets owned by the authenticated caller.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>, Error> {
        let response = self
            .executor
            .execute(RequestSpec::new("GET"), None, None, 200)
            .await?;
        xml::decode_list_buckets(&String::from_utf8_lossy(&response.body))
    }

    /// Check whether a bucket exists and is reachable.
    pub async fn bucket_exists(&self, bucket: &str) -> Result<bool, Error> {
        validate::bucket_name(bucket)?;
        let spec = RequestSpec::new("HEAD").bucket(bucket);
        match self.executor.execute(spec, None, None, 200).await {
            Ok(_) => Ok(true),
            Err(Error::Server(e)) if e.status_code == 404 => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Delete an empty bucket and drop its region cache entry.
    pub async fn remove_bucket(&self, bucket: &str) -> Result<(), Error> {
        validate::bucket_name(bucket)?;
        let spec = RequestSpec::new("DELETE").bucket(bucket);
        self.executor.execute(spec, None, None, 204).await?;
        self.executor.regions().evict(bucket);
        Ok(())
    }

    /// Read a bucket's ACL, reduced to a canned ACL name.
    pub async fn get_bucket_acl(&self, bucket: &str) -> Result<BucketAcl, Error> {
        validate::bucket_name(bucket)?;
        let spec = RequestSpec::new("GET").bucket(bucket).query("acl");
        let response = self.executor.execute(spec, None, None, 200).await?;
        let grants = xml::decode_acl_grants(&String::from_utf8_lossy(&response.body))?;
        Ok(reduce_grants(&grants))
    }

    /// Replace a bucket's ACL with a canned ACL.
    pub async fn set_bucket_acl(&self, bucket: &str, acl: CannedAcl) -> Result<(), Error> {
        validate::bucket_name(bucket)?;
        let spec = RequestSpec::new("PUT")
            .bucket(bucket)
            .query("acl")
            .header("x-amz-acl", acl.as_str());
        self.executor.execute(spec, None, None, 200).await?;
        Ok(())
    }
}

/// Reduce a grant list to a canned ACL name.
fn reduce_grants(grants: &[Grant]) -> BucketAcl {
    let mut public_read = false;
    let mut public_write = false;
    let mut auth_read = false;
    let mut auth_write = false;

    for grant in grants {
        let Some(uri) = grant.grantee_uri.as_deref() else {
            continue; // Owner grants do not affect the canned name.
        };
        match uri {
            ALL_USERS_URI => match grant.permission.as_str() {
                "READ" => public_read = true,
                "WRITE" => public_write = true,
                _ => return BucketAcl::Unsupported,
            },
            AUTHENTICATED_USERS_URI => match grant.permission.as_str() {
                "READ" => auth_read = true,
                "WRITE" => auth_write = true,
                _ => return BucketAcl::Unsupported,
            },
            _ => return BucketAcl::Unsupported,
        }
    }

    match (public_read, public_write, auth_read, auth_write) {
        (true, true, false, false) => BucketAcl::PublicReadWrite,
        (true, false, false, false) => BucketAcl::PublicRead,
        (false, false, true, false) => BucketAcl::AuthenticatedRead,
        (false, false, false, false) => BucketAcl::Private,
        _ => BucketAcl::Unsupported,
    }
}

impl std::fmt::Debug for BucketsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketsService").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grant(uri: Option<&str>, permission: &str) -> Grant {
        Grant {
            grantee_uri: uri.map(String::from),
            permission: permission.to_string(),
        }
    }

    #[test]
    fn owner_only_is_private() {
        let grants = vec![grant(None, "FULL_CONTROL")];
        assert_eq!(reduce_grants(&grants), BucketAcl::Private);
    }

    #[test]
    fn all_users_read_is_public_read() {
        let grants = vec![
            grant(None, "FULL_CONTROL"),
            grant(Some(ALL_USERS_URI), "READ"),
        ];
        assert_eq!(reduce_grants(&grants), BucketAcl::PublicRead);
    }

    #[test]
    fn all_users_read_write_is_public_read_write() {
        let grants = vec![
            grant(Some(ALL_USERS_URI), "READ"),
            grant(Some(ALL_USERS_URI), "WRITE"),
        ];
        assert_eq!(reduce_grants(&grants), BucketAcl::PublicReadWrite);
    }

    #[test]
    fn authenticated_read() {
        let grants = vec![grant(Some(AUTHENTICATED_USERS_URI), "READ")];
        assert_eq!(reduce_grants(&grants), BucketAcl::AuthenticatedRead);
    }

    #[test]
    fn mixed_combinations_are_unsupported() {
        let grants = vec![
            grant(Some(ALL_USERS_URI), "READ"),
            grant(Some(AUTHENTICATED_USERS_URI), "READ"),
        ];
        assert_eq!(reduce_grants(&grants), BucketAcl::Unsupported);

        let grants = vec![grant(Some(ALL_USERS_URI), "FULL_CONTROL")];
        assert_eq!(reduce_grants(&grants), BucketAcl::Unsupported);

        let grants = vec![grant(Some("http://example.com/custom-group"), "READ")];
        assert_eq!(reduce_grants(&grants), BucketAcl::Unsupported);
    }
}
