//! Canonical request construction

use super::{AUTHORIZATION_HEADER, HOST_HEADER, SIGN_HEADER_JOINER, SIGN_JOINER};
use http::{HeaderMap, Method, Uri};
use percent_encoding::{percent_encode, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use std::collections::BTreeSet;

/// Everything except `A-Z a-z 0-9 - _ . ~` is escaped
const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

/// Same as [`UNRESERVED`] but keeps path separators
const UNRESERVED_PATH: &AsciiSet = &UNRESERVED.remove(b'/');

/// Percent-encode with upper-case hex; spaces become `%20`.
pub fn uri_encode(input: &str, encode_slash: bool) -> String {
    let set = if encode_slash {
        UNRESERVED
    } else {
        UNRESERVED_PATH
    };
    utf8_percent_encode(input, set).to_string()
}

/// The four signed parts of a request plus the names of the signed headers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanonicalRequest {
    pub method: String,
    pub uri: String,
    pub query: String,
    pub headers: String,
    /// Lower-cased, sorted
    pub signed_headers: Vec<String>,
}

impl CanonicalRequest {
    /// Canonicalize an [`http::Request`]
    pub fn build<B>(request: &http::Request<B>, headers_to_sign: &BTreeSet<String>) -> Self {
        Self::from_parts(
            request.method(),
            request.uri(),
            request.headers(),
            headers_to_sign,
        )
    }

    /// Canonicalize the pieces of a request
    pub fn from_parts(
        method: &Method,
        uri: &Uri,
        headers: &HeaderMap,
        headers_to_sign: &BTreeSet<String>,
    ) -> Self {
        let (canonical_headers, signed_headers) = canonical_headers(headers, headers_to_sign);
        Self {
            method: method.as_str().to_string(),
            uri: canonical_uri(uri.path()),
            query: canonical_query_string(uri.query().unwrap_or_default()),
            headers: canonical_headers,
            signed_headers,
        }
    }

    /// `;`-joined signed header names as written into the token
    pub fn signed_headers_str(&self) -> String {
        self.signed_headers.join(SIGN_HEADER_JOINER)
    }
}

impl std::fmt::Display for CanonicalRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let parts = [
            self.method.as_str(),
            self.uri.as_str(),
            self.query.as_str(),
            self.headers.as_str(),
        ];
        f.write_str(&parts.join(SIGN_JOINER))
    }
}

/// Canonical form of a request path
pub fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    let path = path.strip_prefix('/').unwrap_or(path);
    format!("/{}", uri_encode(path, false))
}

/// Canonical form of a raw query string.
///
/// Pairs split at the first `=`, keys and values are encoded on their own,
/// `Authorization` is dropped and the resulting `key=value` strings are sorted.
///
/// Every non-empty segment is signed, repeated keys included. Verifiers that
/// stop at the first empty segment (`a=1&&b=2` signing only `a=1`) or keep
/// only the last value of a repeated key reject such queries; keep queries
/// free of empty segments and repeated keys when talking to them.
pub fn canonical_query_string(raw_query: &str) -> String {
    let mut pairs: Vec<String> = raw_query
        .split('&')
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| {
            let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
            if key.eq_ignore_ascii_case(AUTHORIZATION_HEADER) {
                return None;
            }
            Some(format!("{}={}", uri_encode(key, true), uri_encode(value, true)))
        })
        .collect();
    pairs.sort();
    pairs.join("&")
}

/// Canonical header block and the sorted list of header names it covers.
///
/// `host` is always included when present. Repeated header values are joined
/// with `;` before trimming. Values are encoded byte for byte, so bytes
/// outside UTF-8 become `%XX` like any other reserved byte.
pub fn canonical_headers(
    headers: &HeaderMap,
    headers_to_sign: &BTreeSet<String>,
) -> (String, Vec<String>) {
    let mut lines = Vec::new();
    let mut names = Vec::new();

    for name in headers.keys() {
        let key = name.as_str().to_ascii_lowercase();
        if key == AUTHORIZATION_HEADER {
            continue;
        }
        if key != HOST_HEADER && !headers_to_sign.contains(&key) {
            continue;
        }

        // Raw bytes: values need not be UTF-8
        let mut value = Vec::new();
        for (i, v) in headers.get_all(name).iter().enumerate() {
            if i > 0 {
                value.extend_from_slice(SIGN_HEADER_JOINER.as_bytes());
            }
            value.extend_from_slice(v.as_bytes());
        }

        lines.push(format!(
            "{}:{}",
            uri_encode(&key, true),
            percent_encode(value.trim_ascii(), UNRESERVED)
        ));
        names.push(key);
    }

    lines.sort();
    names.sort();
    (lines.join(SIGN_JOINER), names)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::default_headers_to_sign;
    use http::HeaderValue;

    #[test]
    fn test_uri_encode() {
        assert_eq!(uri_encode("a b", true), "a%20b");
        assert_eq!(uri_encode("a/b", true), "a%2Fb");
        assert_eq!(uri_encode("a/b", false), "a/b");
        assert_eq!(uri_encode("AZaz09-_.~", true), "AZaz09-_.~");
        assert_eq!(uri_encode("林", true), "%E6%9E%97");
        assert_eq!(uri_encode("a+b=c", true), "a%2Bb%3Dc");
    }

    #[test]
    fn test_canonical_uri() {
        assert_eq!(canonical_uri(""), "/");
        assert_eq!(canonical_uri("/"), "/");
        assert_eq!(canonical_uri("/path"), "/path");
        assert_eq!(canonical_uri("/a/b c/d"), "/a/b%20c/d");
        assert_eq!(canonical_uri("no-slash"), "/no-slash");
    }

    #[test]
    fn test_canonical_query_sorted() {
        assert_eq!(canonical_query_string("b=2&a=1"), "a=1&b=2");
        assert_eq!(canonical_query_string(""), "");
    }

    #[test]
    fn test_canonical_query_empty_values() {
        assert_eq!(canonical_query_string("toke="), "toke=");
        assert_eq!(canonical_query_string("toke"), "toke=");
        assert_eq!(
            canonical_query_string("toke=123&name=x&age="),
            "age=&name=x&toke=123"
        );
    }

    #[test]
    fn test_canonical_query_drops_authorization() {
        assert_eq!(
            canonical_query_string("authorization=abc&a=1&AUTHORIZATION=x"),
            "a=1"
        );
    }

    #[test]
    fn test_canonical_query_encoding() {
        assert_eq!(canonical_query_string("k=a b"), "k=a%20b");
        assert_eq!(canonical_query_string("k=%E6%9E%97"), "k=%25E6%259E%2597");
        assert_eq!(canonical_query_string("a=1&&b=2"), "a=1&b=2");
    }

    #[test]
    fn test_canonical_query_order_independent() {
        let a = canonical_query_string("x=1&y=2&z=3&w=");
        let b = canonical_query_string("w=&z=3&x=1&y=2");
        assert_eq!(a, b);
    }

    #[test]
    fn test_canonical_headers_selection() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("www.example.com"));
        headers.insert("content-type", HeaderValue::from_static("application/json"));
        headers.insert("x-bce-request-id", HeaderValue::from_static("abc"));
        headers.insert("authorization", HeaderValue::from_static("secret"));

        let (block, names) = canonical_headers(&headers, &default_headers_to_sign());
        assert_eq!(
            block,
            "content-type:application%2Fjson\nhost:www.example.com"
        );
        assert_eq!(names, vec!["content-type", "host"]);
    }

    #[test]
    fn test_canonical_headers_host_always_signed() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("h"));
        headers.insert("content-type", HeaderValue::from_static("text/plain"));

        let (block, names) = canonical_headers(&headers, &BTreeSet::new());
        assert_eq!(block, "host:h");
        assert_eq!(names, vec!["host"]);
    }

    #[test]
    fn test_canonical_headers_trim_and_multi_value() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("h"));
        headers.append("x-multi", HeaderValue::from_static("  one"));
        headers.append("x-multi", HeaderValue::from_static("two  "));

        let to_sign = BTreeSet::from(["x-multi".to_string()]);
        let (block, _) = canonical_headers(&headers, &to_sign);
        assert_eq!(block, "host:h\nx-multi:one%3Btwo");
    }

    #[test]
    fn test_canonical_headers_non_utf8_bytes() {
        let mut headers = HeaderMap::new();
        headers.insert("host", HeaderValue::from_static("h"));
        headers.insert("x-raw", HeaderValue::from_bytes(b"caf\xe9").unwrap());

        let to_sign = BTreeSet::from(["x-raw".to_string()]);
        let (block, _) = canonical_headers(&headers, &to_sign);
        assert_eq!(block, "host:h\nx-raw:caf%E9");

        headers.insert("x-raw", HeaderValue::from_bytes(b"caf\xe8").unwrap());
        let (other, _) = canonical_headers(&headers, &to_sign);
        assert_ne!(block, other);
    }

    #[test]
    fn test_header_order_independence() {
        let mut first = HeaderMap::new();
        first.insert("host", HeaderValue::from_static("h"));
        first.insert("content-md5", HeaderValue::from_static("abc"));
        first.insert("content-type", HeaderValue::from_static("text/plain"));

        let mut second = HeaderMap::new();
        second.insert("content-type", HeaderValue::from_static("text/plain"));
        second.insert("content-md5", HeaderValue::from_static("abc"));
        second.insert("host", HeaderValue::from_static("h"));

        let to_sign = default_headers_to_sign();
        assert_eq!(
            canonical_headers(&first, &to_sign),
            canonical_headers(&second, &to_sign)
        );
    }

    #[test]
    fn test_concrete_canonical_request() {
        let request = http::Request::post("http://host/path?b=2&a=1")
            .header("Host", "host")
            .body(())
            .unwrap();

        let canonical = CanonicalRequest::build(&request, &default_headers_to_sign());
        assert_eq!(canonical.query, "a=1&b=2");
        assert_eq!(canonical.to_string(), "POST\n/path\na=1&b=2\nhost:host");
        assert_eq!(canonical.signed_headers_str(), "host");
    }
}
