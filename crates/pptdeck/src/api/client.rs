use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde_json::json;

use super::error::ApiError;
use crate::http::{HttpRequest, HttpResponse, HttpTransport, Method};
use crate::session::SessionContext;

pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api/v1";

/// Cookie the backend sets on login, register and refresh.
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Thin wrapper around the transport that knows the API base URL and the
/// session. Adds the bearer token, and on a 401 refreshes the access token
/// once before giving up.
#[derive(Clone)]
pub struct ApiClient {
    transport: Rc<dyn HttpTransport>,
    base_url: String,
    session: Rc<SessionContext>,
}

impl ApiClient {
    pub fn new(
        transport: Rc<dyn HttpTransport>,
        base_url: impl Into<String>,
        session: Rc<SessionContext>,
    ) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
            session,
        }
    }

    pub fn session(&self) -> &Rc<SessionContext> {
        &self.session
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    pub fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T, ApiError> {
        let mut request = HttpRequest::get(self.url(path));
        for (key, value) in query {
            request = request.query(key, value);
        }
        self.send(request)
    }

    pub fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<T, ApiError> {
        let mut request = HttpRequest::new(Method::Post, self.url(path));
        request.body = body;
        self.send(request)
    }

    pub fn patch<T: DeserializeOwned>(&self, path: &str, body: serde_json::Value) -> Result<T, ApiError> {
        self.send(HttpRequest::new(Method::Patch, self.url(path)).json(body))
    }

    pub fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.send(HttpRequest::new(Method::Delete, self.url(path)))
    }

    pub fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let response = self.execute(request)?;
        Ok(response.json()?)
    }

    /// POST that also returns the refresh token the server set as a cookie.
    pub fn post_with_refresh_cookie<T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<serde_json::Value>,
    ) -> Result<(T, Option<String>), ApiError> {
        let mut request = HttpRequest::new(Method::Post, self.url(path));
        request.body = body;
        let response = self.execute(request)?;
        let cookie = response.cookie(REFRESH_COOKIE).filter(|t| !t.is_empty());
        Ok((response.json()?, cookie))
    }

    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let first = self
            .transport
            .execute(&request.clone().bearer(self.session.access_token()))?;
        if first.is_success() {
            return Ok(first);
        }
        if first.status != 401 {
            return Err(ApiError::from_response(first.status, &first.body));
        }

        let Some(refresh_token) = self.session.refresh_token() else {
            return Err(ApiError::from_response(first.status, &first.body));
        };

        tracing::debug!(url = %request.url, "access token rejected, refreshing");
        let (access_token, rotated) = match self.refresh_access_token(&refresh_token) {
            Ok(tokens) => tokens,
            Err(e) => {
                tracing::info!("Token refresh failed: {e}");
                self.session.clear();
                return Err(ApiError::SessionExpired);
            }
        };
        self.session.set_tokens(access_token.clone(), rotated);

        let retry = self.transport.execute(&request.bearer(Some(access_token)))?;
        if retry.is_success() {
            Ok(retry)
        } else {
            Err(ApiError::from_response(retry.status, &retry.body))
        }
    }

    /// New access token, plus the rotated refresh token if the server sent one.
    fn refresh_access_token(&self, refresh_token: &str) -> Result<(String, Option<String>), ApiError> {
        let request = HttpRequest::new(Method::Post, self.url("/auth/refresh"))
            .json(json!({ "refreshToken": refresh_token }));
        let response = self.transport.execute(&request)?;
        if !response.is_success() {
            return Err(ApiError::from_response(response.status, &response.body));
        }
        let body: serde_json::Value = response.json()?;
        let access_token = body["accessToken"]
            .as_str()
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .ok_or_else(|| ApiError::from_response(response.status, "{}"))?;
        let rotated = response.cookie(REFRESH_COOKIE).filter(|t| !t.is_empty());
        Ok((access_token, rotated))
    }
}
