//! XML decoding and encoding for S3 payloads.
//!
//! Each decoder is a streaming event-loop parser over one response
//! document; emitters build the two request bodies the protocol needs.

use crate::error::{Error, ServerError};
use crate::region::DEFAULT_REGION;
use crate::types::{
    trim_etag, BucketInfo, CompleteResult, Grant, IncompleteUpload, MultipartInit, ObjectEntry,
    ObjectPage, PartPage, PartRecord, UploadPage,
};
use quick_xml::events::Event;
use quick_xml::Reader;

fn xml_error(e: quick_xml::Error) -> Error {
    Error::Decode {
        message: e.to_string(),
    }
}

/// Decode an S3 `<Error>` document. The HTTP status is supplied by the
/// caller since it is not part of the body.
pub fn decode_error(xml: &str, status_code: u16) -> Result<ServerError, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut error = ServerError {
        code: String::new(),
        message: String::new(),
        resource: None,
        request_id: None,
        status_code,
    };
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Code" => error.code = text,
                    "Message" => error.message = text,
                    "Resource" => error.resource = Some(text),
                    "RequestId" => error.request_id = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_element.clear(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    if error.code.is_empty() {
        return Err(Error::Decode {
            message: "error response without <Code>".to_string(),
        });
    }
    Ok(error)
}

/// Decode a `<LocationConstraint>` response. An empty or absent value
/// means the default region.
pub fn decode_location(xml: &str) -> Result<String, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut region = String::new();
    let mut in_constraint = false;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                in_constraint = e.name().as_ref() == b"LocationConstraint";
            }
            Ok(Event::Text(e)) => {
                if in_constraint {
                    region = e.unescape().unwrap_or_default().to_string();
                }
            }
            Ok(Event::End(_)) => in_constraint = false,
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    if region.is_empty() {
        region = DEFAULT_REGION.to_string();
    }
    Ok(region)
}

/// Decode a `ListAllMyBucketsResult` document.
pub fn decode_list_buckets(xml: &str) -> Result<Vec<BucketInfo>, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut buckets = Vec::new();
    let mut current: Option<BucketInfo> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Bucket" {
                    current = Some(BucketInfo {
                        name: String::new(),
                        creation_date: None,
                    });
                }
                current_element = name;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(bucket) = current.as_mut() {
                    match current_element.as_str() {
                        "Name" => bucket.name = text,
                        "CreationDate" => bucket.creation_date = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Bucket" {
                    if let Some(bucket) = current.take() {
                        buckets.push(bucket);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(buckets)
}

/// Decode a `ListBucketResult` page.
pub fn decode_list_objects(xml: &str) -> Result<ObjectPage, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = ObjectPage::default();
    let mut current: Option<ObjectEntry> = None;
    let mut in_common_prefixes = false;
    let mut in_owner = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Contents" => {
                        current = Some(ObjectEntry {
                            key: String::new(),
                            last_modified: None,
                            etag: None,
                            size: 0,
                        });
                    }
                    "CommonPrefixes" => in_common_prefixes = true,
                    "Owner" => in_owner = true,
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_owner {
                    // Owner sub-records are not part of the page model.
                } else if let Some(entry) = current.as_mut() {
                    match current_element.as_str() {
                        "Key" => entry.key = text,
                        "LastModified" => entry.last_modified = Some(text),
                        "ETag" => entry.etag = Some(trim_etag(&text)),
                        "Size" => entry.size = text.parse().unwrap_or(0),
                        _ => {}
                    }
                } else if in_common_prefixes {
                    if current_element == "Prefix" {
                        page.common_prefixes.push(text);
                    }
                } else {
                    match current_element.as_str() {
                        "IsTruncated" => page.is_truncated = text == "true",
                        "NextMarker" => page.next_marker = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"Contents" => {
                        if let Some(entry) = current.take() {
                            page.objects.push(entry);
                        }
                    }
                    b"CommonPrefixes" => in_common_prefixes = false,
                    b"Owner" => in_owner = false,
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    // Servers that omit NextMarker on truncated pages expect the caller
    // to continue from the last key.
    if page.is_truncated && page.next_marker.is_none() {
        page.next_marker = page.objects.last().map(|o| o.key.clone());
    }

    Ok(page)
}

/// Decode a `ListMultipartUploadsResult` page.
pub fn decode_list_uploads(xml: &str) -> Result<UploadPage, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = UploadPage::default();
    let mut current: Option<IncompleteUpload> = None;
    let mut in_nested = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Upload" => {
                        current = Some(IncompleteUpload {
                            key: String::new(),
                            upload_id: String::new(),
                            initiated: None,
                        });
                    }
                    // Owner/Initiator carry their own ID elements which
                    // would otherwise clobber the upload fields.
                    "Owner" | "Initiator" => in_nested = true,
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_nested {
                    continue;
                }
                if let Some(upload) = current.as_mut() {
                    match current_element.as_str() {
                        "Key" => upload.key = text,
                        "UploadId" => upload.upload_id = text,
                        "Initiated" => upload.initiated = Some(text),
                        _ => {}
                    }
                } else {
                    match current_element.as_str() {
                        "IsTruncated" => page.is_truncated = text == "true",
                        "NextKeyMarker" => page.next_key_marker = Some(text),
                        "NextUploadIdMarker" => page.next_upload_id_marker = Some(text),
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"Upload" => {
                        if let Some(upload) = current.take() {
                            page.uploads.push(upload);
                        }
                    }
                    b"Owner" | b"Initiator" => in_nested = false,
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(page)
}

/// Decode a `ListPartsResult` page.
pub fn decode_list_parts(xml: &str) -> Result<PartPage, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut page = PartPage::default();
    let mut current: Option<PartRecord> = None;
    let mut in_nested = false;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                match name.as_str() {
                    "Part" => {
                        current = Some(PartRecord {
                            part_number: 0,
                            etag: String::new(),
                        });
                    }
                    "Owner" | "Initiator" => in_nested = true,
                    _ => {}
                }
                current_element = name;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if in_nested {
                    continue;
                }
                if let Some(part) = current.as_mut() {
                    match current_element.as_str() {
                        "PartNumber" => part.part_number = text.parse().unwrap_or(0),
                        "ETag" => part.etag = trim_etag(&text),
                        _ => {}
                    }
                } else {
                    match current_element.as_str() {
                        "IsTruncated" => page.is_truncated = text == "true",
                        "NextPartNumberMarker" => {
                            page.next_part_number_marker = text.parse().ok()
                        }
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                match e.name().as_ref() {
                    b"Part" => {
                        if let Some(part) = current.take() {
                            page.parts.push(part);
                        }
                    }
                    b"Owner" | b"Initiator" => in_nested = false,
                    _ => {}
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(page)
}

/// Decode an `InitiateMultipartUploadResult` document.
pub fn decode_initiate_upload(xml: &str) -> Result<MultipartInit, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut init = MultipartInit {
        bucket: String::new(),
        key: String::new(),
        upload_id: String::new(),
    };
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Bucket" => init.bucket = text,
                    "Key" => init.key = text,
                    "UploadId" => init.upload_id = text,
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_element.clear(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    if init.upload_id.is_empty() {
        return Err(Error::Decode {
            message: "initiate response without <UploadId>".to_string(),
        });
    }
    Ok(init)
}

/// Decode a `CompleteMultipartUploadResult` document.
pub fn decode_complete_upload(xml: &str) -> Result<CompleteResult, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut result = CompleteResult {
        bucket: None,
        key: None,
        etag: String::new(),
        location: None,
    };
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                current_element = String::from_utf8_lossy(e.name().as_ref()).to_string();
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                match current_element.as_str() {
                    "Bucket" => result.bucket = Some(text),
                    "Key" => result.key = Some(text),
                    "ETag" => result.etag = trim_etag(&text),
                    "Location" => result.location = Some(text),
                    _ => {}
                }
            }
            Ok(Event::End(_)) => current_element.clear(),
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(result)
}

/// Decode the grant list of an `AccessControlPolicy` document.
pub fn decode_acl_grants(xml: &str) -> Result<Vec<Grant>, Error> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut grants = Vec::new();
    let mut current: Option<Grant> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "Grant" {
                    current = Some(Grant {
                        grantee_uri: None,
                        permission: String::new(),
                    });
                }
                current_element = name;
            }
            Ok(Event::Text(e)) => {
                let text = e.unescape().unwrap_or_default().to_string();
                if let Some(grant) = current.as_mut() {
                    match current_element.as_str() {
                        "URI" => grant.grantee_uri = Some(text),
                        "Permission" => grant.permission = text,
                        _ => {}
                    }
                }
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"Grant" {
                    if let Some(grant) = current.take() {
                        grants.push(grant);
                    }
                }
                current_element.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(xml_error(e)),
            _ => {}
        }
    }

    Ok(grants)
}

/// Build the `CreateBucketConfiguration` body for non-default regions.
pub fn create_bucket_config_xml(region: &str) -> String {
    format!(
        "<CreateBucketConfiguration xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
<LocationConstraint>{}</LocationConstraint>\
</CreateBucketConfiguration>",
        escape_xml(region)
    )
}

/// Build the `CompleteMultipartUpload` manifest with parts in the order
/// given.
pub fn complete_upload_xml(parts: &[PartRecord]) -> String {
    let mut xml = String::from("<CompleteMultipartUpload>");
    for part in parts {
        xml.push_str("<Part>");
        xml.push_str(&format!("<PartNumber>{}</PartNumber>", part.part_number));
        xml.push_str(&format!("<ETag>{}</ETag>", escape_xml(&part.etag)));
        xml.push_str("</Part>");
    }
    xml.push_str("</CompleteMultipartUpload>");
    xml
}

/// Escape special characters for XML.
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
