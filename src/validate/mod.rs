//! Input validation raised before any I/O.

use crate::error::Error;

/// Longest legal object key and listing prefix.
const MAX_KEY_LENGTH: usize = 1024;

/// Check a bucket name against S3 naming rules.
pub fn bucket_name(bucket: &str) -> Result<(), Error> {
    let fail = |reason: &str| Error::InvalidBucketName {
        bucket: bucket.to_string(),
        reason: reason.to_string(),
    };

    if bucket.len() < 3 || bucket.len() > 63 {
        return Err(fail("must be between 3 and 63 characters"));
    }
    if bucket.contains("..") {
        return Err(fail("must not contain consecutive periods"));
    }
    let bytes = bucket.as_bytes();
    if !bytes[0].is_ascii_lowercase() && !bytes[0].is_ascii_digit() {
        return Err(fail("must start with a lowercase letter or digit"));
    }
    if !bytes[bytes.len() - 1].is_ascii_lowercase() && !bytes[bytes.len() - 1].is_ascii_digit() {
        return Err(fail("must end with a lowercase letter or digit"));
    }
    if !bucket
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
    {
        return Err(fail(
            "may only contain lowercase letters, digits, hyphens and periods",
        ));
    }
    Ok(())
}

/// Check an object key.
pub fn object_name(object: &str) -> Result<(), Error> {
    if object.is_empty() {
        return Err(Error::InvalidObjectName {
            object: object.to_string(),
            reason: "must not be empty".to_string(),
        });
    }
    if object.len() > MAX_KEY_LENGTH {
        return Err(Error::InvalidObjectName {
            object: object.to_string(),
            reason: format!("must not exceed {MAX_KEY_LENGTH} bytes"),
        });
    }
    Ok(())
}

/// Check a listing prefix.
pub fn prefix(prefix: &str) -> Result<(), Error> {
    if prefix.len() > MAX_KEY_LENGTH {
        return Err(Error::InvalidPrefix {
            prefix: prefix.to_string(),
        });
    }
    Ok(())
}

/// Check a presigned-URL expiry in seconds. S3 caps these at 7 days.
pub fn expiry(expires_secs: u64) -> Result<(), Error> {
    const MAX_EXPIRY: u64 = 7 * 24 * 60 * 60;
    if expires_secs == 0 || expires_secs > MAX_EXPIRY {
        return Err(Error::InvalidDate {
            message: format!("expiry must be between 1 and {MAX_EXPIRY} seconds"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_ordinary_bucket_names() {
        assert!(bucket_name("my-bucket").is_ok());
        assert!(bucket_name("abc").is_ok());
        assert!(bucket_name("log.archive.2024").is_ok());
    }

    #[test]
    fn rejects_bad_bucket_names() {
        assert!(bucket_name("ab").is_err());
        assert!(bucket_name(&"a".repeat(64)).is_err());
        assert!(bucket_name("My-Bucket").is_err());
        assert!(bucket_name("-leading").is_err());
        assert!(bucket_name("trailing-").is_err());
        assert!(bucket_name("double..dot").is_err());
        assert!(bucket_name("under_score").is_err());
    }

    #[test]
    fn object_name_bounds() {
        assert!(object_name("a").is_ok());
        assert!(object_name("dir/nested/key.txt").is_ok());
        assert!(object_name("").is_err());
        assert!(object_name(&"k".repeat(1025)).is_err());
    }

    #[test]
    fn expiry_bounds() {
        assert!(expiry(1).is_ok());
        assert!(expiry(604800).is_ok());
        assert!(expiry(0).is_err());
        assert!(expiry(604801).is_err());
    }
}
