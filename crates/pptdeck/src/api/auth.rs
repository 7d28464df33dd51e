use serde::Deserialize;
use serde_json::json;

use super::client::ApiClient;
use super::error::ApiError;
use crate::session::User;

#[derive(Debug, Clone, Deserialize)]
pub struct Captcha {
    pub captcha_id: String,
    /// Base64 PNG, optionally prefixed with a `data:` URL header.
    pub image: String,
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeSent {
    #[serde(default)]
    pub expires_in: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    pub user: User,
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: u64,
}

pub struct AuthApi<'a> {
    client: &'a ApiClient,
}

impl<'a> AuthApi<'a> {
    pub fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    pub fn captcha(&self) -> Result<Captcha, ApiError> {
        self.client.get("/auth/captcha", &[])
    }

    pub fn send_verification_code(
        &self,
        email: &str,
        captcha_id: &str,
        captcha_code: &str,
    ) -> Result<CodeSent, ApiError> {
        self.client.post(
            "/auth/send-verification-code",
            Some(json!({
                "email": email,
                "captcha_id": captcha_id,
                "captcha_code": captcha_code,
            })),
        )
    }

    pub fn register(
        &self,
        email: &str,
        password: &str,
        email_code: &str,
    ) -> Result<AuthResponse, ApiError> {
        self.authenticate(
            "/auth/register",
            json!({
                "email": email,
                "password": password,
                "email_code": email_code,
            }),
        )
    }

    pub fn login(&self, email: &str, password: &str) -> Result<AuthResponse, ApiError> {
        self.authenticate("/auth/login", json!({ "email": email, "password": password }))
    }

    /// The server answers 204; the body is ignored.
    pub fn logout(&self) -> Result<(), ApiError> {
        let body = self
            .client
            .session()
            .refresh_token()
            .map(|t| json!({ "refreshToken": t }));
        let _: serde_json::Value = self.client.post("/auth/logout", body)?;
        Ok(())
    }

    pub fn refresh(&self) -> Result<AuthResponse, ApiError> {
        let token = self.client.session().refresh_token();
        self.authenticate("/auth/refresh", json!({ "refreshToken": token }))
    }

    /// The refresh token travels in a cookie; a body field wins if present.
    fn authenticate(&self, path: &str, body: serde_json::Value) -> Result<AuthResponse, ApiError> {
        let (mut response, cookie): (AuthResponse, _) =
            self.client.post_with_refresh_cookie(path, Some(body))?;
        if response.refresh_token.is_none() {
            response.refresh_token = cookie;
        }
        Ok(response)
    }
}

/// Decodes a captcha image, accepting both raw base64 and `data:` URLs.
pub fn decode_captcha_image(image: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    let payload = image
        .split_once("base64,")
        .map(|(_, data)| data)
        .unwrap_or(image);
    base64::engine::general_purpose::STANDARD.decode(payload.trim())
}
