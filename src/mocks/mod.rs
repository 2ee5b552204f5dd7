//! Mock implementations for testing.

mod transport;

pub use transport::{MockResponse, MockTransport};

/// Canned response documents for tests.
pub struct TestFixtures;

impl TestFixtures {
    /// Sample `?location` response.
    pub fn location_xml(region: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<LocationConstraint xmlns="http://s3.amazonaws.com/doc/2006-03-01/">{region}</LocationConstraint>"#
        )
    }

    /// Sample `?location` response for the default region (empty body).
    pub fn location_default_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<LocationConstraint xmlns="http://s3.amazonaws.com/doc/2006-03-01/"/>"#
    }

    /// Sample ListAllMyBucketsResult response.
    pub fn list_buckets_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListAllMyBucketsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Owner><ID>owner-id</ID><DisplayName>Owner</DisplayName></Owner>
    <Buckets>
        <Bucket><Name>bucket1</Name><CreationDate>2024-01-01T00:00:00.000Z</CreationDate></Bucket>
        <Bucket><Name>bucket2</Name><CreationDate>2024-01-02T00:00:00.000Z</CreationDate></Bucket>
    </Buckets>
</ListAllMyBucketsResult>"#
    }

    /// Sample ListBucketResult response.
    pub fn list_objects_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Name>test-bucket</Name>
    <Prefix></Prefix>
    <IsTruncated>false</IsTruncated>
    <Contents>
        <Key>file1.txt</Key>
        <LastModified>2024-01-15T10:30:00.000Z</LastModified>
        <ETag>"0123456789abcdef0123456789abcdef"</ETag>
        <Size>1024</Size>
    </Contents>
    <Contents>
        <Key>file2.txt</Key>
        <LastModified>2024-01-16T11:30:00.000Z</LastModified>
        <ETag>"fedcba9876543210fedcba9876543210"</ETag>
        <Size>2048</Size>
    </Contents>
</ListBucketResult>"#
    }

    /// Sample InitiateMultipartUploadResult response.
    pub fn initiate_upload_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<InitiateMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Bucket>test-bucket</Bucket>
    <Key>big-file.bin</Key>
    <UploadId>upload-id-12345</UploadId>
</InitiateMultipartUploadResult>"#
    }

    /// Sample CompleteMultipartUploadResult response.
    pub fn complete_upload_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<CompleteMultipartUploadResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Location>http://localhost:9000/test-bucket/big-file.bin</Location>
    <Bucket>test-bucket</Bucket>
    <Key>big-file.bin</Key>
    <ETag>"3858f62230ac3c915f300c664312c11f-2"</ETag>
</CompleteMultipartUploadResult>"#
    }

    /// An empty incomplete-upload listing.
    pub fn list_uploads_empty_xml() -> &'static str {
        r#"<?xml version="1.0" encoding="UTF-8"?>
<ListMultipartUploadsResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
    <Bucket>test-bucket</Bucket>
    <IsTruncated>false</IsTruncated>
</ListMultipartUploadsResult>"#
    }

    /// Sample error response body.
    pub fn error_xml(code: &str, message: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<Error>
    <Code>{code}</Code>
    <Message>{message}</Message>
    <RequestId>test-request-id</RequestId>
</Error>"#
        )
    }
}
