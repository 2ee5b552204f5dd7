//! Canonical request building for AWS Signature V4.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters that should NOT be percent-encoded in URI paths.
const URI_PATH_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~')
    .remove(b'/');

/// Characters that should NOT be percent-encoded in query strings.
const QUERY_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// URI-encode a path, leaving `/` segment separators intact.
pub fn uri_encode_path(path: &str) -> String {
    utf8_percent_encode(path, URI_PATH_SET).to_string()
}

/// URI-encode a query key or value.
pub fn uri_encode_query(value: &str) -> String {
    utf8_percent_encode(value, QUERY_SET).to_string()
}

/// Build the canonical query string: parameters sorted by name then
/// value, bare subresource keys given an empty value, joined with `&`.
///
/// The input must already be URI-encoded; request builders encode each
/// value exactly once, and the same encoded form is sent on the wire.
pub fn build_canonical_query_string(query_string: &str) -> String {
    if query_string.is_empty() {
        return String::new();
    }

    let mut params: Vec<(String, String)> = query_string
        .split('&')
        .filter(|s| !s.is_empty())
        .map(|pair| {
            let mut parts = pair.splitn(2, '=');
            let key = parts.next().unwrap_or("");
            let value = parts.next().unwrap_or("");
            (key.to_string(), value.to_string())
        })
        .collect();

    params.sort_by(|a, b| a.0.cmp(&b.0).then_with(|| a.1.cmp(&b.1)));

    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

/// Build the canonical headers string: lowercased, trimmed, sorted by
/// name, one `name:value\n` line each.
pub fn build_canonical_headers(headers: &[(String, String)]) -> String {
    let mut header_map: std::collections::BTreeMap<String, Vec<String>> =
        std::collections::BTreeMap::new();

    for (name, value) in headers {
        let name_lower = name.to_lowercase();

        if !super::should_sign_header(&name_lower) {
            continue;
        }

        let trimmed = value.split_whitespace().collect::<Vec<_>>().join(" ");

        header_map.entry(name_lower).or_default().push(trimmed);
    }

    header_map
        .iter()
        .map(|(name, values)| format!("{}:{}\n", name, values.join(",")))
        .collect()
}

/// Build the signed headers list: semicolon-separated, sorted, lowercase.
pub fn build_signed_headers(headers: &[(String, String)]) -> String {
    let mut names: std::collections::BTreeSet<String> = std::collections::BTreeSet::new();

    for (name, _) in headers {
        let name_lower = name.to_lowercase();
        if super::should_sign_header(&name_lower) {
            names.insert(name_lower);
        }
    }

    names.into_iter().collect::<Vec<_>>().join(";")
}

/// Build the canonical request string.
///
/// Format:
/// ```text
/// HTTPMethod\n
/// CanonicalURI\n
/// CanonicalQueryString\n
/// CanonicalHeaders\n
/// SignedHeaders\n
/// HashedPayload
/// ```
pub fn build_canonical_request(
    method: &str,
    path: &str,
    query_string: &str,
    headers: &[(String, String)],
    payload_hash: &str,
) -> String {
    let canonical_query = build_canonical_query_string(query_string);
    let canonical_headers = build_canonical_headers(headers);
    let signed_headers = build_signed_headers(headers);

    format!(
        "{}\n{}\n{}\n{}\n{}\n{}",
        method.to_uppercase(),
        path,
        canonical_query,
        canonical_headers,
        signed_headers,
        payload_hash
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encode_path_preserves_separators() {
        assert_eq!(uri_encode_path("/"), "/");
        assert_eq!(uri_encode_path("/foo/bar"), "/foo/bar");
        assert_eq!(uri_encode_path("/foo bar/baz"), "/foo%20bar/baz");
        assert_eq!(uri_encode_path("/a+b"), "/a%2Bb");
    }

    #[test]
    fn encode_query_escapes_reserved() {
        assert_eq!(uri_encode_query("foo"), "foo");
        assert_eq!(uri_encode_query("foo bar"), "foo%20bar");
        assert_eq!(uri_encode_query("foo=bar"), "foo%3Dbar");
        assert_eq!(uri_encode_query("a/b"), "a%2Fb");
    }

    #[test]
    fn canonical_query_sorted() {
        assert_eq!(build_canonical_query_string(""), "");
        assert_eq!(build_canonical_query_string("uploads"), "uploads=");
        assert_eq!(build_canonical_query_string("b=2&a=1"), "a=1&b=2");
        assert_eq!(build_canonical_query_string("a=2&a=1"), "a=1&a=2");
        // Pre-encoded values pass through untouched.
        assert_eq!(
            build_canonical_query_string("prefix=logs%2F2024&uploads"),
            "prefix=logs%2F2024&uploads="
        );
    }

    #[test]
    fn canonical_headers_lowercased_and_sorted() {
        let headers = vec![
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
            ("Host".to_string(), "example.com".to_string()),
        ];

        let result = build_canonical_headers(&headers);
        assert_eq!(
            result,
            "host:example.com\nx-amz-date:20231215T103045Z\n"
        );
    }

    #[test]
    fn signed_headers_list() {
        let headers = vec![
            ("Host".to_string(), "example.com".to_string()),
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
            ("Content-Type".to_string(), "application/xml".to_string()),
            ("User-Agent".to_string(), "ignored".to_string()),
        ];

        assert_eq!(
            build_signed_headers(&headers),
            "content-type;host;x-amz-date"
        );
    }

    #[test]
    fn canonical_request_shape() {
        let headers = vec![
            (
                "Host".to_string(),
                "examplebucket.s3.amazonaws.com".to_string(),
            ),
            ("X-Amz-Date".to_string(), "20231215T103045Z".to_string()),
        ];

        let result = build_canonical_request(
            "GET",
            "/test.txt",
            "",
            &headers,
            crate::signing::EMPTY_SHA256,
        );

        assert!(result.starts_with("GET\n/test.txt\n\n"));
        assert!(result.contains("host;x-amz-date"));
        assert!(result.ends_with(crate::signing::EMPTY_SHA256));
    }

    #[test]
    fn header_whitespace_normalized() {
        let headers = vec![(
            "X-Amz-Meta-Test".to_string(),
            "value  with   spaces".to_string(),
        )];

        let result = build_canonical_headers(&headers);
        assert_eq!(result, "x-amz-meta-test:value with spaces\n");
    }
}
