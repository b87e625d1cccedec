use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::adapters::preferences::PreferenceStore;
use crate::adapters::token_vault::{TokenVault, VaultError};
use crate::domain::models::{
    AnonymousMeterRequest, ApiMessage, Consumption, ForgotPassword, Invoice, LoginRequest,
    LoginResponse, Meter, MeterStatus, NewReading, Profile, ResetPassword, UpdateEmail,
    UpdatePassword, UpdateProfile, UpdateProfileImage,
};

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    /// Development-only escape hatch for self-signed backends. Must stay
    /// false in any real deployment.
    pub accept_invalid_certs: bool,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            request_timeout: Duration::from_secs(30),
            accept_invalid_certs: false,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("login rejected ({status}): {body}")]
    AuthenticationFailed { status: u16, body: String },
    #[error("login succeeded but the response carried no token")]
    MalformedResponse,
    #[error("no stored token; user is not authenticated")]
    NotAuthenticated,
    #[error("token vault unavailable: {0}")]
    Vault(#[from] VaultError),
    #[error("request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("server rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

/// Owns the session token and builds the per-call HTTP clients every
/// endpoint uses. All request plumbing (base URL, timeout, certificate
/// policy, bearer header) lives here and nowhere else.
pub struct AuthService {
    config: ClientConfig,
    vault: Arc<dyn TokenVault>,
    preferences: Arc<dyn PreferenceStore>,
}

impl AuthService {
    pub fn new(
        config: ClientConfig,
        vault: Arc<dyn TokenVault>,
        preferences: Arc<dyn PreferenceStore>,
    ) -> Self {
        Self {
            config,
            vault,
            preferences,
        }
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn client_builder(&self) -> reqwest::ClientBuilder {
        let mut builder = reqwest::Client::builder().timeout(self.config.request_timeout);
        if self.config.accept_invalid_certs {
            builder = builder.danger_accept_invalid_certs(true);
        }
        builder
    }

    /// Client for the public endpoints: no credentials attached.
    pub fn anonymous_client(&self) -> Result<reqwest::Client, ApiError> {
        self.client_builder().build().map_err(ApiError::from)
    }

    /// Client with the stored bearer token attached to every request.
    /// Fails fast when no usable token is stored; no request leaves the
    /// process in that case.
    pub fn authenticated_client(&self) -> Result<reqwest::Client, ApiError> {
        let token = self
            .vault
            .get()?
            .filter(|token| !token.trim().is_empty())
            .ok_or(ApiError::NotAuthenticated)?;

        let mut headers = HeaderMap::new();
        let value = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| ApiError::NotAuthenticated)?;
        headers.insert(AUTHORIZATION, value);

        self.client_builder()
            .default_headers(headers)
            .build()
            .map_err(ApiError::from)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<String, ApiError> {
        let client = self.anonymous_client()?;
        let response = client
            .post(self.endpoint("Auth/login"))
            .json(&LoginRequest {
                email: email.to_string(),
                password: password.to_string(),
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::AuthenticationFailed {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: LoginResponse =
            serde_json::from_str(&body).map_err(|_| ApiError::MalformedResponse)?;
        if parsed.token.trim().is_empty() {
            return Err(ApiError::MalformedResponse);
        }

        self.vault.set(&parsed.token)?;
        Ok(parsed.token)
    }

    /// Pure vault lookup; never touches the network.
    pub fn is_logged_in(&self) -> bool {
        matches!(self.vault.get(), Ok(Some(token)) if !token.trim().is_empty())
    }

    /// Stored token, or the empty string when none is usable.
    pub fn current_token(&self) -> String {
        self.vault.get().ok().flatten().unwrap_or_default()
    }

    /// Drops the stored token and clears the notification checkpoint so the
    /// next account starts from the sentinel. A checkpoint-clear failure is
    /// logged but never blocks the logout itself.
    pub fn logout(&self) -> Result<(), ApiError> {
        self.vault.remove()?;

        if let Err(error) = self.preferences.clear_checkpoint() {
            tracing::warn!(error = %error, "failed to clear notification checkpoint on logout");
        }

        Ok(())
    }
}

/// Typed port over the billing backend. Screens and the poller depend on
/// this trait, never on the HTTP plumbing directly.
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn invoices(&self) -> Result<Vec<Invoice>, ApiError>;
    async fn unread_invoices(&self) -> Result<Vec<Invoice>, ApiError>;
    async fn consumption_history(&self) -> Result<Vec<Consumption>, ApiError>;
    async fn submit_reading(&self, reading: &NewReading) -> Result<(), ApiError>;
    async fn my_meters(&self) -> Result<Vec<Meter>, ApiError>;
    async fn meter_status(&self) -> Result<Vec<MeterStatus>, ApiError>;
    async fn tariff_brackets(&self) -> Result<Vec<crate::domain::models::TariffBracket>, ApiError>;
    async fn profile(&self) -> Result<Profile, ApiError>;
    async fn update_profile(&self, update: &UpdateProfile) -> Result<(), ApiError>;
    async fn update_email(&self, update: &UpdateEmail) -> Result<(), ApiError>;
    async fn update_password(&self, update: &UpdatePassword) -> Result<bool, ApiError>;
    async fn update_profile_image(&self, update: &UpdateProfileImage) -> Result<(), ApiError>;
    async fn forgot_password(&self, email: &str) -> Result<(), ApiError>;
    async fn reset_password(&self, reset: &ResetPassword) -> Result<(), ApiError>;
    async fn submit_anonymous_meter_request(
        &self,
        request: &AnonymousMeterRequest,
    ) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct HttpBillingApi {
    auth: Arc<AuthService>,
}

impl HttpBillingApi {
    pub fn new(auth: Arc<AuthService>) -> Self {
        Self { auth }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        client: reqwest::Client,
        path: &str,
    ) -> Result<T, ApiError> {
        let response = client.get(self.auth.endpoint(path)).send().await?;
        Self::parse(response).await
    }

    async fn post_expect_ok<B: Serialize + Sync>(
        &self,
        client: reqwest::Client,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let response = client
            .post(self.auth.endpoint(path))
            .json(body)
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    async fn put_expect_ok<B: Serialize + Sync>(
        &self,
        client: reqwest::Client,
        path: &str,
        body: &B,
    ) -> Result<(), ApiError> {
        let response = client
            .put(self.auth.endpoint(path))
            .json(body)
            .send()
            .await?;
        Self::expect_ok(response).await
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ApiError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(ApiError::from);
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::rejection(status, body))
    }

    async fn expect_ok(response: reqwest::Response) -> Result<(), ApiError> {
        let status = response.status();
        if status.is_success() {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(Self::rejection(status, body))
    }

    fn rejection(status: reqwest::StatusCode, body: String) -> ApiError {
        let message = serde_json::from_str::<ApiMessage>(&body)
            .ok()
            .and_then(|envelope| envelope.message)
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| {
                if body.trim().is_empty() {
                    status.to_string()
                } else {
                    body
                }
            });

        ApiError::Rejected {
            status: status.as_u16(),
            message,
        }
    }
}

#[async_trait]
impl BillingApi for HttpBillingApi {
    async fn invoices(&self) -> Result<Vec<Invoice>, ApiError> {
        self.get_json(self.auth.authenticated_client()?, "Customer/invoices")
            .await
    }

    async fn unread_invoices(&self) -> Result<Vec<Invoice>, ApiError> {
        self.get_json(self.auth.authenticated_client()?, "Customer/invoices/unread")
            .await
    }

    async fn consumption_history(&self) -> Result<Vec<Consumption>, ApiError> {
        self.get_json(
            self.auth.authenticated_client()?,
            "Customer/consumptions/history",
        )
        .await
    }

    async fn submit_reading(&self, reading: &NewReading) -> Result<(), ApiError> {
        self.post_expect_ok(
            self.auth.authenticated_client()?,
            "Customer/consumptions",
            reading,
        )
        .await
    }

    async fn my_meters(&self) -> Result<Vec<Meter>, ApiError> {
        self.get_json(self.auth.authenticated_client()?, "Customer/mine")
            .await
    }

    async fn meter_status(&self) -> Result<Vec<MeterStatus>, ApiError> {
        self.get_json(self.auth.authenticated_client()?, "Customer/meters/status")
            .await
    }

    async fn tariff_brackets(&self) -> Result<Vec<crate::domain::models::TariffBracket>, ApiError> {
        // Public pricing endpoint, reachable before login.
        self.get_json(self.auth.anonymous_client()?, "Customer/tariff-brackets")
            .await
    }

    async fn profile(&self) -> Result<Profile, ApiError> {
        self.get_json(self.auth.authenticated_client()?, "Profile")
            .await
    }

    async fn update_profile(&self, update: &UpdateProfile) -> Result<(), ApiError> {
        self.put_expect_ok(self.auth.authenticated_client()?, "Profile", update)
            .await
    }

    async fn update_email(&self, update: &UpdateEmail) -> Result<(), ApiError> {
        self.put_expect_ok(self.auth.authenticated_client()?, "Profile/email", update)
            .await
    }

    async fn update_password(&self, update: &UpdatePassword) -> Result<bool, ApiError> {
        let client = self.auth.authenticated_client()?;
        let response = client
            .put(self.auth.endpoint("Profile/password"))
            .json(update)
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    async fn update_profile_image(&self, update: &UpdateProfileImage) -> Result<(), ApiError> {
        self.put_expect_ok(self.auth.authenticated_client()?, "Profile/image", update)
            .await
    }

    async fn forgot_password(&self, email: &str) -> Result<(), ApiError> {
        self.post_expect_ok(
            self.auth.anonymous_client()?,
            "Auth/forgot-password",
            &ForgotPassword {
                email: email.to_string(),
            },
        )
        .await
    }

    async fn reset_password(&self, reset: &ResetPassword) -> Result<(), ApiError> {
        self.post_expect_ok(self.auth.anonymous_client()?, "Auth/reset-password", reset)
            .await
    }

    async fn submit_anonymous_meter_request(
        &self,
        request: &AnonymousMeterRequest,
    ) -> Result<(), ApiError> {
        self.post_expect_ok(
            self.auth.anonymous_client()?,
            "Customer/meter-requests/anonymous",
            request,
        )
        .await
    }
}
