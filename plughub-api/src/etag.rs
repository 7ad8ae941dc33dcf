//! Response caching layer: content fingerprints, conditional requests, and
//! the compression decision.
//!
//! Fingerprints are derived purely from payload bytes, and payloads are
//! memoized per (database generation, query identity) key, so identical
//! snapshots produce identical ETags across processes and restarts —
//! which is what makes shared proxies and CDNs cache correctly.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use actix_web::http::header;
use actix_web::{HttpRequest, HttpResponse};
use sha2::{Digest, Sha256};

use plughub_store_db::StoreDb;

use crate::cache_control_max_age_1d;
use crate::config::Config;
use crate::error::Result;

/// Strong ETag over the serialized payload. Changes if and only if the
/// payload's bytes change.
pub(crate) fn fingerprint(body: &[u8]) -> String {
    format!("\"sha256:{}\"", hex::encode(Sha256::digest(body)))
}

/// Does the request carry a fingerprint matching the payload?
pub(crate) fn not_modified(req: &HttpRequest, etag: &str) -> bool {
    req.headers()
        .get(header::IF_NONE_MATCH)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|raw| raw == "*" || raw.split(',').any(|candidate| candidate.trim() == etag))
}

/// Compression decision: only payloads at or above the threshold are worth
/// transport compression.
pub(crate) fn compressible(len: usize, threshold: usize) -> bool {
    len >= threshold
}

/// A serialized response body with its fingerprint.
pub(crate) struct CachedPayload {
    pub(crate) body: Vec<u8>,
    pub(crate) etag: String,
}

/// Memoized response payloads, keyed by generation-qualified query identity.
///
/// Concurrent misses for the same key may serialize the payload more than
/// once, but `or_insert` keeps the first entry, so callers never observe a
/// partially-computed one and the cache holds at most one payload per key.
#[derive(Default)]
pub(crate) struct ResponseCache {
    entries: Mutex<HashMap<String, Arc<CachedPayload>>>,
}

impl ResponseCache {
    pub(crate) fn get(&self, key: &str) -> Option<Arc<CachedPayload>> {
        match self.entries.lock() {
            Ok(entries) => entries.get(key).cloned(),
            Err(_) => None,
        }
    }

    pub(crate) fn insert(&self, key: String, body: Vec<u8>) -> Arc<CachedPayload> {
        let payload = Arc::new(CachedPayload {
            etag: fingerprint(&body),
            body,
        });
        match self.entries.lock() {
            Ok(mut entries) => entries.entry(key).or_insert(payload).clone(),
            Err(_) => payload,
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }
}

/// Build the response for a cached payload: conditional 304, ETag, cache
/// control, and the compression decision expressed as a transport header.
pub(crate) fn payload_response(
    req: &HttpRequest,
    config: &Config,
    payload: &CachedPayload,
) -> HttpResponse {
    if not_modified(req, &payload.etag) {
        return HttpResponse::NotModified()
            .insert_header((header::ETAG, payload.etag.clone()))
            .insert_header(cache_control_max_age_1d())
            .finish();
    }

    let mut builder = HttpResponse::Ok();
    builder
        .insert_header(header::ContentType::json())
        .insert_header((header::ETAG, payload.etag.clone()))
        .insert_header(cache_control_max_age_1d());
    if !compressible(payload.body.len(), config.compression_threshold) {
        // Pinning identity makes the Compress middleware leave the body
        // alone.
        builder.insert_header((header::CONTENT_ENCODING, "identity"));
    }
    builder.body(payload.body.clone())
}

/// Serve one query through the cache: memoized payload when present,
/// otherwise run the query, serialize once, and populate the cache.
/// `Ok(None)` propagates the query layer's not-found signal uncached.
pub(crate) async fn serve_cached<T, F>(
    req: &HttpRequest,
    config: &Config,
    key: &str,
    produce: F,
) -> Result<Option<HttpResponse>>
where
    T: serde::Serialize,
    F: FnOnce(&StoreDb) -> plughub_store_db::Result<Option<T>>,
{
    let catalog = config.catalog()?;
    let cache_key = format!("{}:{key}", catalog.generation());

    if let Some(payload) = config.cache.get(&cache_key) {
        return Ok(Some(payload_response(req, config, &payload)));
    }

    let value = {
        let db = catalog.db().await;
        produce(&db)?
    };
    let Some(value) = value else {
        return Ok(None);
    };

    let body = serde_json::to_vec(&value)?;
    let payload = config.cache.insert(cache_key, body);
    Ok(Some(payload_response(req, config, &payload)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fingerprint_is_content_derived() {
        let a = fingerprint(b"[1,2,3]");
        let b = fingerprint(b"[1,2,3]");
        let c = fingerprint(b"[1,2,4]");
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(a.starts_with("\"sha256:"));
    }

    #[test]
    fn test_compressible_threshold() {
        assert!(!compressible(100, 1024));
        assert!(compressible(1024, 1024));
        assert!(compressible(4096, 1024));
    }

    #[test]
    fn test_cache_keeps_first_entry() {
        let cache = ResponseCache::default();
        let first = cache.insert("k".into(), b"one".to_vec());
        let second = cache.insert("k".into(), b"two".to_vec());
        assert_eq!(first.etag, second.etag);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get("k").unwrap().body, b"one");
    }

    #[test]
    fn test_not_modified_matching() {
        let req = actix_web::test::TestRequest::get()
            .insert_header((header::IF_NONE_MATCH, "\"sha256:abc\""))
            .to_http_request();
        assert!(not_modified(&req, "\"sha256:abc\""));
        assert!(!not_modified(&req, "\"sha256:def\""));

        let any = actix_web::test::TestRequest::get()
            .insert_header((header::IF_NONE_MATCH, "*"))
            .to_http_request();
        assert!(not_modified(&any, "\"sha256:abc\""));

        let list = actix_web::test::TestRequest::get()
            .insert_header((header::IF_NONE_MATCH, "\"a\", \"sha256:abc\""))
            .to_http_request();
        assert!(not_modified(&list, "\"sha256:abc\""));
    }
}
