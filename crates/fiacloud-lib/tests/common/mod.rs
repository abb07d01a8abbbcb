// Shared helpers for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::body::Bytes;
use axum::http::{header, HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::Router;

/// Serve `router` on an ephemeral localhost port and return `http://host:port`
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        let _ = axum::serve(listener, router).await;
    });
    format!("http://{}", addr)
}

/// SSE body: one `data:` frame per payload, then `[DONE]`
pub fn sse_body(frames: &[serde_json::Value]) -> String {
    let mut body = String::new();
    for frame in frames {
        body.push_str(&format!("data: {}\n\n", frame));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

pub fn content_frame(text: &str) -> serde_json::Value {
    serde_json::json!({ "choices": [{ "index": 0, "delta": { "content": text } }] })
}

pub fn tool_frame(arguments: &str) -> serde_json::Value {
    serde_json::json!({
        "choices": [{
            "index": 0,
            "delta": { "tool_calls": [{ "index": 0, "function": { "arguments": arguments } }] }
        }]
    })
}

/// Minimal OSS/S3 emulation: objects keyed by decoded path
#[derive(Clone, Default)]
pub struct ObjectServer {
    pub objects: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
    pub requests: Arc<Mutex<Vec<(Method, String, HeaderMap)>>>,
    /// Leading path segment to strip (path-style buckets)
    pub bucket_prefix: Option<String>,
}

impl ObjectServer {
    pub fn path_style(bucket: &str) -> Self {
        Self {
            bucket_prefix: Some(format!("/{}", bucket)),
            ..Self::default()
        }
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects.lock().unwrap().keys().cloned().collect()
    }

    pub fn router(&self) -> Router {
        let server = self.clone();
        Router::new().fallback(move |method: Method, uri: Uri, headers: HeaderMap, body: Bytes| {
            let server = server.clone();
            async move { server.handle(method, uri, headers, body) }
        })
    }

    fn handle(&self, method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> Response {
        let mut path = uri.path().to_string();
        if let Some(prefix) = &self.bucket_prefix {
            path = path.strip_prefix(prefix.as_str()).unwrap_or(&path).to_string();
        }
        let key = urlencoding::decode(path.trim_start_matches('/'))
            .map(|k| k.into_owned())
            .unwrap_or_default();
        self.requests
            .lock()
            .unwrap()
            .push((method.clone(), key.clone(), headers.clone()));

        if !headers.contains_key(header::AUTHORIZATION) {
            return (StatusCode::FORBIDDEN, "<Error><Code>AccessDenied</Code></Error>").into_response();
        }

        let mut objects = self.objects.lock().unwrap();
        match method {
            Method::GET if key.is_empty() => {
                let prefix = uri
                    .query()
                    .map(|q| {
                        url::form_urlencoded::parse(q.as_bytes())
                            .find(|(k, _)| k == "prefix")
                            .map(|(_, v)| v.into_owned())
                            .unwrap_or_default()
                    })
                    .unwrap_or_default();
                let mut xml = String::from("<ListBucketResult><IsTruncated>false</IsTruncated>");
                for (k, v) in objects.iter().filter(|(k, _)| k.starts_with(&prefix)) {
                    xml.push_str(&format!(
                        "<Contents><Key>{}</Key><LastModified>2025-01-01T00:00:00.000Z</LastModified><Size>{}</Size></Contents>",
                        k,
                        v.len()
                    ));
                }
                xml.push_str("</ListBucketResult>");
                ([(header::CONTENT_TYPE, "application/xml")], xml).into_response()
            }
            Method::GET => match objects.get(&key) {
                Some(data) => data.clone().into_response(),
                None => (
                    StatusCode::NOT_FOUND,
                    "<Error><Code>NoSuchKey</Code><Message>missing</Message></Error>",
                )
                    .into_response(),
            },
            Method::PUT => {
                let copy_source = headers
                    .get("x-oss-copy-source")
                    .or_else(|| headers.get("x-amz-copy-source"))
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.to_string());
                match copy_source {
                    Some(source) => {
                        // "/bucket/key"
                        let raw = source.trim_start_matches('/');
                        let source_key = raw.split_once('/').map(|(_, k)| k).unwrap_or(raw);
                        let source_key = urlencoding::decode(source_key)
                            .map(|k| k.into_owned())
                            .unwrap_or_default();
                        match objects.get(&source_key).cloned() {
                            Some(data) => {
                                objects.insert(key, data);
                                StatusCode::OK.into_response()
                            }
                            None => StatusCode::NOT_FOUND.into_response(),
                        }
                    }
                    None => {
                        objects.insert(key, body.to_vec());
                        StatusCode::OK.into_response()
                    }
                }
            }
            Method::DELETE => {
                objects.remove(&key);
                StatusCode::NO_CONTENT.into_response()
            }
            _ => StatusCode::METHOD_NOT_ALLOWED.into_response(),
        }
    }
}
