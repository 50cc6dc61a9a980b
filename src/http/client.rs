use crate::trace::SessionTrace;
use reqwest::{Client, Method, Request};
use serde::Serialize;
use std::fmt;

pub const DEFAULT_MAX_TRACE_BODY_CHARS: usize = 4_000;

/// Thin wrapper around `reqwest::Client` that mirrors every exchange into the
/// session trace.
#[derive(Clone)]
pub struct HttpClient {
    inner: Client,
    trace: Option<SessionTrace>,
    max_body_chars: usize,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("traced", &self.trace.is_some())
            .field("max_body_chars", &self.max_body_chars)
            .finish()
    }
}

impl HttpClient {
    pub fn new(inner: Client) -> Self {
        Self {
            inner,
            trace: None,
            max_body_chars: DEFAULT_MAX_TRACE_BODY_CHARS,
        }
    }

    pub fn with_trace(mut self, trace: SessionTrace) -> Self {
        self.trace = Some(trace);
        self
    }

    #[cfg(test)]
    pub fn with_max_body_chars(mut self, max_body_chars: usize) -> Self {
        self.max_body_chars = max_body_chars;
        self
    }

    pub async fn post_json<T: Serialize + ?Sized>(
        &self,
        url: &str,
        payload: &T,
    ) -> Result<HttpResponseData, reqwest::Error> {
        let body_json = serde_json::to_string(payload)
            .unwrap_or_else(|err| format!("{{\"_serialization_error\":\"{err}\"}}"));
        let request = self.inner.post(url).json(payload).build()?;
        self.execute(request, &body_json).await
    }

    pub async fn get(&self, url: &str) -> Result<HttpResponseData, reqwest::Error> {
        let request = self.inner.request(Method::GET, url).build()?;
        self.execute(request, "").await
    }

    async fn execute(
        &self,
        request: Request,
        body_text: &str,
    ) -> Result<HttpResponseData, reqwest::Error> {
        if let Some(trace) = &self.trace {
            trace.log_http_request(
                request.method().as_str(),
                request.url().as_str(),
                request.headers(),
                &truncate_for_log(body_text, self.max_body_chars),
            );
        }

        let response = match self.inner.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                self.log_error(&err);
                return Err(err);
            }
        };
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = match response.text().await {
            Ok(body) => body,
            Err(err) => {
                self.log_error(&err);
                return Err(err);
            }
        };

        if let Some(trace) = &self.trace {
            trace.log_http_response(
                status,
                &headers,
                &truncate_for_log(&body, self.max_body_chars),
            );
        }

        Ok(HttpResponseData { status, body })
    }

    fn log_error(&self, err: &reqwest::Error) {
        if let Some(trace) = &self.trace {
            trace.log_http_error(&err.to_string());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponseData {
    pub status: u16,
    pub body: String,
}

impl HttpResponseData {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

pub fn truncate_for_log(input: &str, max_chars: usize) -> String {
    let count = input.chars().count();
    if count <= max_chars {
        return input.to_string();
    }

    let truncated = input.chars().take(max_chars).collect::<String>();
    format!("{truncated}... <truncated {} chars>", count - max_chars)
}

#[cfg(test)]
mod tests {
    use super::{HttpClient, HttpResponseData, truncate_for_log};
    use crate::trace::SessionTrace;
    use reqwest::Client;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn post_json_returns_status_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .and(body_json(json!({"model": "m"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new());
        let response = client
            .post_json(&format!("{}/api/chat", server.uri()), &json!({"model": "m"}))
            .await
            .expect("request should succeed");

        assert_eq!(
            response,
            HttpResponseData {
                status: 200,
                body: "{\"ok\":true}".to_string(),
            }
        );
        assert!(response.is_success());
    }

    #[tokio::test]
    async fn get_passes_through_error_statuses() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/tags"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let client = HttpClient::new(Client::new());
        let response = client
            .get(&format!("{}/api/tags", server.uri()))
            .await
            .expect("transport should succeed");

        assert_eq!(response.status, 503);
        assert_eq!(response.body, "busy");
        assert!(!response.is_success());
    }

    #[tokio::test]
    async fn exchanges_are_written_to_trace() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/chat"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("x-request-id", "req-42")
                    .set_body_json(json!({"message": {"content": "pong"}})),
            )
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_dir("http-test", dir.path()).expect("trace");
        let client = HttpClient::new(Client::new()).with_trace(trace.clone());

        client
            .post_json(
                &format!("{}/api/chat", server.uri()),
                &json!({"messages": [{"role": "user", "content": "ping"}]}),
            )
            .await
            .expect("request should succeed");

        let text = fs::read_to_string(trace.file_path()).expect("read trace");
        assert!(text.contains("[http.req   ] POST"));
        assert!(text.contains("\"content\":\"ping\""));
        assert!(text.contains("[http.resp  ] HTTP 200"));
        assert!(text.contains("x-request-id: req-42"));
        assert!(text.contains("pong"));
    }

    #[tokio::test]
    async fn transport_failures_are_traced() {
        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_dir("http-err", dir.path()).expect("trace");
        let client = HttpClient::new(Client::new()).with_trace(trace.clone());

        // Port 9 (discard) on localhost is expected to refuse connections.
        let err = client
            .get("http://127.0.0.1:9/api/tags")
            .await
            .expect_err("connection should fail");
        assert!(err.is_connect() || err.is_request());

        let text = fs::read_to_string(trace.file_path()).expect("read trace");
        assert!(text.contains("[http.err   ]"));
    }

    #[tokio::test]
    async fn long_bodies_are_truncated_in_trace() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("x".repeat(50)))
            .mount(&server)
            .await;

        let dir = tempdir().expect("tempdir");
        let trace = SessionTrace::create_in_dir("http-trunc", dir.path()).expect("trace");
        let client = HttpClient::new(Client::new())
            .with_trace(trace.clone())
            .with_max_body_chars(10);

        let response = client
            .get(&format!("{}/api/tags", server.uri()))
            .await
            .expect("request should succeed");
        assert_eq!(response.body.len(), 50);

        let text = fs::read_to_string(trace.file_path()).expect("read trace");
        assert!(text.contains("xxxxxxxxxx... <truncated 40 chars>"));
    }

    #[test]
    fn truncate_for_log_appends_marker() {
        let out = truncate_for_log("abcdefghijklmnopqrstuvwxyz", 5);
        assert_eq!(out, "abcde... <truncated 21 chars>");
        assert_eq!(truncate_for_log("short", 5), "short");
    }
}
