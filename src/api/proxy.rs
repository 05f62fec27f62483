//! Proxy Path and Cache Key
//!
//! Turns the captured `/api/*path` into upstream path segments and derives
//! the cache key for the resulting request.

use reqwest::Url;
use sha2::{Digest, Sha256};

use crate::error::ApiError;

/// Partition used for requests without an `Authorization` header.
pub const ANONYMOUS_PARTITION: &str = "anon";

// == Path Segments ==
/// Splits a decoded wildcard path into segments to append below the base URL.
///
/// Empty segments are dropped. `.` and `..` are rejected because the backend
/// or any hop in between may resolve them above the configured base.
pub fn proxy_segments(path: &str) -> Result<Vec<String>, ApiError> {
    let mut segments = Vec::new();
    for segment in path.split('/') {
        match segment {
            "" => continue,
            "." | ".." => {
                return Err(ApiError::InvalidRequest(
                    "path segments '.' and '..' are not allowed".to_string(),
                ))
            }
            other => segments.push(other.to_string()),
        }
    }

    if segments.is_empty() {
        return Err(ApiError::InvalidRequest("path cannot be empty".to_string()));
    }
    Ok(segments)
}

// == Cache Key ==
/// Returns the partition prefix for a request's credentials.
///
/// Authenticated requests get `auth:<sha256 hex>` of the header value.
pub fn partition(authorization: Option<&str>) -> String {
    match authorization {
        None => ANONYMOUS_PARTITION.to_string(),
        Some(auth) => {
            let mut hasher = Sha256::new();
            hasher.update(auth.as_bytes());
            format!("auth:{}", hex::encode(hasher.finalize()))
        }
    }
}

/// Builds the cache key for a proxied GET of `url`.
///
/// The shape is `<partition> GET <path>[?<query>]`. The partition comes
/// first and the path is taken from the encoded URL, so nothing a caller
/// puts in the path or query can reach into another partition.
pub fn cache_key(url: &Url, authorization: Option<&str>) -> String {
    let mut key = format!("{} GET {}", partition(authorization), url.path());
    if let Some(query) = url.query() {
        key.push('?');
        key.push_str(query);
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(path_and_query: &str) -> Url {
        Url::parse(&format!("http://backend{path_and_query}")).unwrap()
    }

    #[test]
    fn test_segments_plain() {
        assert_eq!(proxy_segments("students").unwrap(), vec!["students"]);
        assert_eq!(
            proxy_segments("/products//search/").unwrap(),
            vec!["products", "search"]
        );
    }

    #[test]
    fn test_segments_keep_reserved_characters() {
        assert_eq!(
            proxy_segments("me#x/a?b").unwrap(),
            vec!["me#x", "a?b"]
        );
    }

    #[test]
    fn test_segments_reject_dot_segments() {
        for path in ["..", "../secret", "a/../../b", "./a", "a/./b"] {
            assert!(
                matches!(proxy_segments(path), Err(ApiError::InvalidRequest(_))),
                "{path} should be rejected"
            );
        }
        // Dots inside a name are ordinary characters
        assert_eq!(proxy_segments("file..json").unwrap(), vec!["file..json"]);
    }

    #[test]
    fn test_segments_reject_empty_path() {
        assert!(matches!(proxy_segments(""), Err(ApiError::InvalidRequest(_))));
        assert!(matches!(proxy_segments("//"), Err(ApiError::InvalidRequest(_))));
    }

    #[test]
    fn test_cache_key_plain() {
        assert_eq!(cache_key(&url("/students"), None), "anon GET /students");
        assert_eq!(
            cache_key(&url("/products/search?q=tv&page=2"), None),
            "anon GET /products/search?q=tv&page=2"
        );
    }

    #[test]
    fn test_cache_key_partitions_by_authorization() {
        let alice = cache_key(&url("/favorites"), Some("Bearer alice"));
        let bob = cache_key(&url("/favorites"), Some("Bearer bob"));

        assert_ne!(alice, bob);
        assert!(alice.starts_with("auth:"));
        assert!(alice.ends_with(" GET /favorites"));
        assert_eq!(alice, cache_key(&url("/favorites"), Some("Bearer alice")));
    }

    #[test]
    fn test_partition_is_full_sha256_hex() {
        let key = partition(Some("Bearer alice"));
        let digest = key.strip_prefix("auth:").unwrap();

        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_encoded_reserved_characters_cannot_forge_a_partition() {
        let base = Url::parse("http://backend").unwrap();
        let alice = cache_key(&base.join("/me").unwrap(), Some("Bearer alice"));
        let alice_hash = partition(Some("Bearer alice"));

        // An anonymous caller naming alice's partition inside the path
        let mut forged = base.clone();
        forged
            .path_segments_mut()
            .unwrap()
            .pop_if_empty()
            .push(&format!("me#{alice_hash}"));
        let forged_key = cache_key(&forged, None);

        assert_ne!(forged_key, alice);
        assert!(forged_key.starts_with("anon GET /me%23"));
    }

    #[test]
    fn test_encoded_question_mark_stays_in_path() {
        let mut in_path = Url::parse("http://backend").unwrap();
        in_path
            .path_segments_mut()
            .unwrap()
            .pop_if_empty()
            .push("students?page=1");

        assert_eq!(cache_key(&in_path, None), "anon GET /students%3Fpage=1");
        assert_ne!(
            cache_key(&in_path, None),
            cache_key(&url("/students?page=1"), None)
        );
    }
}
