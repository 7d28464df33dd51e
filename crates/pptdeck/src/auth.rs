use crate::api::auth::{AuthApi, AuthResponse};
use crate::api::{ApiClient, ApiError};
use crate::session::{Session, User};

/// Sign-in state on top of the session context, with the last error kept
/// for display.
pub struct AuthStore {
    client: ApiClient,
    loading: bool,
    error: Option<String>,
}

impl AuthStore {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            loading: false,
            error: None,
        }
    }

    pub fn user(&self) -> Option<User> {
        self.client.session().user()
    }

    pub fn access_token(&self) -> Option<String> {
        self.client.session().access_token()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user().is_some() && self.access_token().is_some()
    }

    pub fn loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn login(&mut self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.run("Login failed", |api| api.login(email, password))
    }

    pub fn register(
        &mut self,
        email: &str,
        password: &str,
        email_code: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.run("Registration failed", |api| {
            api.register(email, password, email_code)
        })
    }

    /// Ends the session locally even when the server call fails.
    pub fn logout(&mut self) {
        self.loading = true;
        self.error = None;
        if let Err(e) = AuthApi::new(&self.client).logout() {
            tracing::warn!("Logout error: {e}");
        }
        self.client.session().clear();
        self.loading = false;
    }

    /// Trades the saved refresh token for a new session. Without one there is
    /// nothing to send, and the current session is left alone.
    pub fn refresh_token(&mut self) -> Result<AuthResponse, ApiError> {
        if self.client.session().refresh_token().is_none() {
            return Err(ApiError::SessionExpired);
        }
        match AuthApi::new(&self.client).refresh() {
            Ok(response) => {
                self.save(&response);
                Ok(response)
            }
            Err(e) => {
                self.client.session().clear();
                Err(e)
            }
        }
    }

    pub fn clear_auth(&mut self) {
        self.client.session().clear();
    }

    fn run<F>(&mut self, fallback: &str, call: F) -> Result<AuthResponse, ApiError>
    where
        F: FnOnce(&AuthApi<'_>) -> Result<AuthResponse, ApiError>,
    {
        self.loading = true;
        self.error = None;
        let result = call(&AuthApi::new(&self.client));
        self.loading = false;

        match result {
            Ok(response) => {
                self.save(&response);
                Ok(response)
            }
            Err(e) => {
                self.error = Some(match &e {
                    ApiError::Status {
                        message: Some(m), ..
                    } if !m.is_empty() => m.clone(),
                    _ => fallback.to_string(),
                });
                Err(e)
            }
        }
    }

    fn save(&self, response: &AuthResponse) {
        let refresh_token = response
            .refresh_token
            .clone()
            .or_else(|| self.client.session().refresh_token());
        self.client.session().set(Session {
            user: response.user.clone(),
            access_token: response.access_token.clone(),
            refresh_token,
        });
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::http::HttpResponse;
    use crate::http::testing::FakeTransport;
    use crate::session::{SessionContext, sample_session};

    const AUTH_OK: &str = r#"{"user":{"id":1,"email":"a@b.c","status":"active"},
        "accessToken":"tok-1","refreshToken":"ref-1","expiresIn":900}"#;

    fn store(transport: &Rc<FakeTransport>) -> AuthStore {
        AuthStore::new(ApiClient::new(
            transport.clone(),
            "http://api.test/api/v1",
            Rc::new(SessionContext::in_memory()),
        ))
    }

    #[test]
    fn test_login_persists_session() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(200, AUTH_OK);
        let mut auth = store(&transport);

        auth.login("a@b.c", "pw").unwrap();
        assert!(auth.is_authenticated());
        assert_eq!(auth.access_token().as_deref(), Some("tok-1"));
        assert!(!auth.loading());
        assert!(auth.error().is_none());
    }

    #[test]
    fn test_login_failure_records_message() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(
            401,
            r#"{"code":"invalid_credentials","message":"invalid email or password"}"#,
        );
        let mut auth = store(&transport);

        assert!(auth.login("a@b.c", "bad").is_err());
        assert_eq!(auth.error(), Some("invalid email or password"));
        assert!(!auth.is_authenticated());

        transport.fail("connection refused");
        assert!(auth.register("a@b.c", "pw", "123456").is_err());
        assert_eq!(auth.error(), Some("Registration failed"));
    }

    #[test]
    fn test_logout_clears_even_when_server_fails() {
        let transport = Rc::new(FakeTransport::new());
        transport.fail("offline");
        let mut auth = store(&transport);
        auth.client.session().set(sample_session());

        auth.logout();
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_refresh_failure_clears_session() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(401, r#"{"code":"session_not_found"}"#);
        let mut auth = store(&transport);
        auth.client.session().set(sample_session());

        // The refresh endpoint itself answers 401; the client then tries its own
        // refresh with the same token, which also fails.
        transport.respond(401, "");
        assert!(auth.refresh_token().is_err());
        assert!(!auth.is_authenticated());
    }

    #[test]
    fn test_refresh_keeps_refresh_token_when_not_rotated() {
        let transport = Rc::new(FakeTransport::new());
        transport.respond(
            200,
            r#"{"user":{"id":7,"email":"ada@example.com"},"accessToken":"access-9"}"#,
        );
        let mut auth = store(&transport);
        auth.client.session().set(sample_session());

        auth.refresh_token().unwrap();
        assert_eq!(auth.access_token().as_deref(), Some("access-9"));
        assert_eq!(
            auth.client.session().refresh_token().as_deref(),
            Some("refresh-1")
        );
    }

    #[test]
    fn test_cookie_refresh_token_drives_retry() {
        const LOGIN: &str = r#"{"user":{"id":1,"email":"a@b.c","status":"active"},
            "accessToken":"tok-1","expiresIn":900}"#;
        let transport = Rc::new(FakeTransport::new());
        transport
            .respond_with(
                HttpResponse::new(200, LOGIN)
                    .header("Set-Cookie", "refresh_token=ref-cookie; Path=/; HttpOnly"),
            )
            .respond(401, r#"{"code":"unauthorized"}"#)
            .respond(200, r#"{"user":{"id":1,"email":"a@b.c"},"accessToken":"tok-2"}"#)
            .respond(200, r#"{"items":[]}"#);
        let mut auth = store(&transport);

        auth.login("a@b.c", "pw").unwrap();
        assert_eq!(
            auth.client.session().refresh_token().as_deref(),
            Some("ref-cookie")
        );

        let _: serde_json::Value = auth.client.get("/ppts", &[]).unwrap();
        let requests = transport.requests.borrow();
        assert!(requests[2].url.ends_with("/auth/refresh"));
        assert_eq!(requests[2].body.as_ref().unwrap()["refreshToken"], "ref-cookie");
        assert_eq!(requests[3].bearer.as_deref(), Some("tok-2"));
    }

    #[test]
    fn test_refresh_without_token_keeps_session() {
        let transport = Rc::new(FakeTransport::new());
        let mut auth = store(&transport);
        let mut session = sample_session();
        session.refresh_token = None;
        auth.client.session().set(session);

        assert!(matches!(auth.refresh_token(), Err(ApiError::SessionExpired)));
        assert!(auth.is_authenticated());
        assert!(transport.requests.borrow().is_empty());
    }
}
