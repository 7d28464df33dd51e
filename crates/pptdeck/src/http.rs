use std::time::Duration;

use thiserror::Error;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Patch,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(String, String)>,
    pub bearer: Option<String>,
    pub body: Option<serde_json::Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            bearer: None,
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::Get, url)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn bearer(mut self, token: Option<String>) -> Self {
        self.bearer = token;
        self
    }

    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lowercase. Repeated headers keep one entry each.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Value of the cookie `name` from the `Set-Cookie` headers. An empty
    /// value means the server cleared it.
    pub fn cookie(&self, name: &str) -> Option<String> {
        self.headers
            .iter()
            .filter(|(key, _)| key == "set-cookie")
            .filter_map(|(_, value)| value.split(';').next()?.split_once('='))
            .find(|(key, _)| key.trim() == name)
            .map(|(_, value)| value.trim().trim_matches('"').to_string())
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn json<T: serde::de::DeserializeOwned>(&self) -> serde_json::Result<T> {
        if self.body.trim().is_empty() {
            serde_json::from_str("null")
        } else {
            serde_json::from_str(&self.body)
        }
    }
}

/// The request never produced an HTTP status.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },
}

/// Blocking HTTP seam shared by the config loader and the REST client.
pub trait HttpTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// `ureq`-backed transport. Non-2xx statuses are returned, not raised.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build()
            .into();
        Self { agent }
    }
}

impl Default for UreqTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpTransport for UreqTransport {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let network = |e: ureq::Error| TransportError::Network {
            url: request.url.clone(),
            message: e.to_string(),
        };
        let auth = request.bearer.as_ref().map(|t| format!("Bearer {t}"));

        tracing::debug!(method = request.method.as_str(), url = %request.url, "http request");

        let result = match request.method {
            Method::Get | Method::Delete => {
                let mut builder = if request.method == Method::Get {
                    self.agent.get(&request.url)
                } else {
                    self.agent.delete(&request.url)
                };
                for (key, value) in &request.query {
                    builder = builder.query(key, value);
                }
                if let Some(auth) = &auth {
                    builder = builder.header("Authorization", auth);
                }
                builder.call()
            }
            Method::Post | Method::Patch => {
                let mut builder = if request.method == Method::Post {
                    self.agent.post(&request.url)
                } else {
                    self.agent.patch(&request.url)
                };
                for (key, value) in &request.query {
                    builder = builder.query(key, value);
                }
                if let Some(auth) = &auth {
                    builder = builder.header("Authorization", auth);
                }
                match &request.body {
                    Some(body) => builder.send_json(body),
                    None => builder.send_empty(),
                }
            }
        };

        let mut response = result.map_err(network)?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                Some((name.as_str().to_string(), value.to_str().ok()?.to_string()))
            })
            .collect();
        let body = response.body_mut().read_to_string().map_err(network)?;
        tracing::debug!(status, url = %request.url, "http response");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// Scripted transport: answers requests in order and records what it saw.
    #[derive(Default)]
    pub struct FakeTransport {
        responses: RefCell<VecDeque<Result<HttpResponse, TransportError>>>,
        pub requests: RefCell<Vec<HttpRequest>>,
    }

    impl FakeTransport {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(&self, status: u16, body: &str) -> &Self {
            self.respond_with(HttpResponse::new(status, body))
        }

        pub fn respond_with(&self, response: HttpResponse) -> &Self {
            self.responses.borrow_mut().push_back(Ok(response));
            self
        }

        pub fn fail(&self, message: &str) -> &Self {
            self.responses
                .borrow_mut()
                .push_back(Err(TransportError::Network {
                    url: "fake".to_string(),
                    message: message.to_string(),
                }));
            self
        }

        pub fn urls(&self) -> Vec<String> {
            self.requests.borrow().iter().map(|r| r.url.clone()).collect()
        }
    }

    impl HttpTransport for FakeTransport {
        fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
            self.requests.borrow_mut().push(request.clone());
            self.responses
                .borrow_mut()
                .pop_front()
                .unwrap_or_else(|| {
                    Err(TransportError::Network {
                        url: request.url.clone(),
                        message: "no scripted response".to_string(),
                    })
                })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = HttpRequest::get("http://x/ppts")
            .query("q", "demo")
            .query("limit", 1)
            .bearer(Some("tok".into()));
        assert_eq!(req.method, Method::Get);
        assert_eq!(req.query[1], ("limit".to_string(), "1".to_string()));
        assert_eq!(req.bearer.as_deref(), Some("tok"));
    }

    #[test]
    fn test_response_status_and_empty_body() {
        let resp = HttpResponse::new(204, "");
        assert!(resp.is_success());
        let value: serde_json::Value = resp.json().unwrap();
        assert!(value.is_null());
        assert!(!HttpResponse::new(404, "").is_success());
    }

    #[test]
    fn test_cookie_from_set_cookie_headers() {
        let resp = HttpResponse::new(200, "{}")
            .header("Content-Type", "application/json")
            .header("Set-Cookie", "theme=dark; Path=/")
            .header("Set-Cookie", "refresh_token=abc=; Path=/; Max-Age=604800; HttpOnly");
        assert_eq!(resp.cookie("refresh_token").as_deref(), Some("abc="));
        assert_eq!(resp.cookie("theme").as_deref(), Some("dark"));
        assert_eq!(resp.cookie("missing"), None);

        let cleared = HttpResponse::new(204, "").header("set-cookie", "refresh_token=; Path=/; Max-Age=0");
        assert_eq!(cleared.cookie("refresh_token").as_deref(), Some(""));
    }
}
