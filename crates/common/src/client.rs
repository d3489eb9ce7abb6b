//! The signed request pipeline.
//!
//! [`SignedClient::execute`] picks a token, signs the exact body bytes, sends
//! them, waits out rate limiting, and only hands back a body whose server
//! signature checks out.

use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method, Response, StatusCode};
use serde_json::Value;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::constants::{
    HEADER_CLIENT_AUTHENTICATION, HEADER_CLIENT_REQUEST_ID, HEADER_CLIENT_SIGNATURE,
    HEADER_SERVER_SIGNATURE,
};
use crate::envelope::ResponseEnvelope;
use crate::error::BunqError;
use crate::request_signing::RequestSigner;
use crate::retry::RetryPolicy;
use crate::session::{AuthState, Credential, SessionState};
use crate::settings::Settings;
use crate::transport::{client_headers, HttpTransport, OutgoingRequest, ReqwestTransport};

/// Produces a fresh session when the current one is missing or stale.
///
/// Implementations talk to the server through the same client, but must use
/// [`Credential::Bootstrap`]: a [`Credential::Session`] call from inside
/// `establish` would wait on the renewal it is part of.
#[async_trait]
pub trait SessionRenewer: Send + Sync {
    async fn establish(&self, client: &SignedClient) -> Result<SessionState, Report<BunqError>>;
}

pub struct SignedClient {
    transport: Arc<dyn HttpTransport>,
    signer: RequestSigner,
    installation_token: String,
    renewer: Arc<dyn SessionRenewer>,
    session: RwLock<Option<Arc<SessionState>>>,
    renewal: Mutex<()>,
    retry: RetryPolicy,
    headers: HeaderMap,
}

impl SignedClient {
    #[must_use]
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        signer: RequestSigner,
        installation_token: impl Into<String>,
        renewer: Arc<dyn SessionRenewer>,
    ) -> Self {
        Self {
            transport,
            signer,
            installation_token: installation_token.into(),
            renewer,
            session: RwLock::new(None),
            renewal: Mutex::new(()),
            retry: RetryPolicy::default(),
            headers: HeaderMap::new(),
        }
    }

    /// Client talking to the configured API over HTTPS.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] if the settings do not describe a
    /// usable transport or header set.
    pub fn from_settings(
        settings: &Settings,
        signer: RequestSigner,
        installation_token: impl Into<String>,
        renewer: Arc<dyn SessionRenewer>,
    ) -> Result<Self, Report<BunqError>> {
        let transport = Arc::new(ReqwestTransport::from_settings(settings)?);
        Self::new(transport, signer, installation_token, renewer).with_settings(settings)
    }

    /// Apply header and retry settings.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] if a configured header value is invalid.
    pub fn with_settings(mut self, settings: &Settings) -> Result<Self, Report<BunqError>> {
        self.headers = client_headers(&settings.api)?;
        self.retry = RetryPolicy::from(&settings.retry);
        Ok(self)
    }

    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    #[must_use]
    pub fn installation_token(&self) -> &str {
        &self.installation_token
    }

    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    /// The current session, even if it has gone stale.
    #[must_use]
    pub fn session(&self) -> Option<Arc<SessionState>> {
        match self.session.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        if self.valid_session().is_some() {
            AuthState::SessionActive
        } else {
            AuthState::Bootstrapped
        }
    }

    /// Replace the current session wholesale.
    pub fn install_session(&self, session: SessionState) {
        self.store_session(Arc::new(session));
    }

    fn store_session(&self, session: Arc<SessionState>) {
        match self.session.write() {
            Ok(mut guard) => *guard = Some(session),
            Err(poisoned) => *poisoned.into_inner() = Some(session),
        }
    }

    fn valid_session(&self) -> Option<Arc<SessionState>> {
        self.session().filter(|session| session.is_valid())
    }

    /// Return a valid session, establishing one first if necessary.
    ///
    /// Concurrent callers that all find the session stale share a single
    /// renewal.
    ///
    /// # Errors
    ///
    /// Propagates any error from the [`SessionRenewer`].
    pub async fn ensure_session(&self) -> Result<Arc<SessionState>, Report<BunqError>> {
        if let Some(session) = self.valid_session() {
            return Ok(session);
        }

        let _guard = self.renewal.lock().await;
        if let Some(session) = self.valid_session() {
            // Someone else renewed while we were waiting.
            return Ok(session);
        }

        self.establish_locked().await
    }

    /// Establish a new session even if the current one is still valid.
    ///
    /// # Errors
    ///
    /// Propagates any error from the [`SessionRenewer`].
    pub async fn renew_session(&self) -> Result<Arc<SessionState>, Report<BunqError>> {
        let _guard = self.renewal.lock().await;
        self.establish_locked().await
    }

    async fn establish_locked(&self) -> Result<Arc<SessionState>, Report<BunqError>> {
        log::info!("Establishing a new session");
        let session = Arc::new(self.renewer.establish(self).await?);
        log::info!(
            "Session established for user {} until {}",
            session.owner_id(),
            session.expires_at()
        );
        self.store_session(Arc::clone(&session));
        Ok(session)
    }

    async fn resolve_token(&self, credential: Credential<'_>) -> Result<String, Report<BunqError>> {
        match credential {
            Credential::Bootstrap(token) => Ok(token.to_string()),
            Credential::Session => Ok(self.ensure_session().await?.token().to_string()),
        }
    }

    /// Send a signed request and return the verified response body.
    ///
    /// `body` is serialized once; the signature covers exactly the bytes
    /// sent. Rate-limited requests are re-signed and resent after the
    /// server-requested delay.
    ///
    /// # Errors
    ///
    /// - [`BunqError::Api`] for any non-success status other than 429
    /// - [`BunqError::RateLimited`] when a configured attempt cap is reached
    /// - [`BunqError::ResponseAuthenticity`] when the server signature is
    ///   missing or does not match
    /// - [`BunqError::InvalidSignatureEncoding`] when the server signature is
    ///   not base64
    /// - [`BunqError::Transport`], [`BunqError::Serialization`] and renewal
    ///   errors as they occur
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        credential: Credential<'_>,
    ) -> Result<Vec<u8>, Report<BunqError>> {
        let payload = match body {
            Some(value) => serde_json::to_vec(value).change_context(BunqError::Serialization {
                message: format!("Failed to serialize body for {method} {path}"),
            })?,
            None => Vec::new(),
        };

        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);

            let token = self.resolve_token(credential).await?;
            let request = self.build_request(&method, path, &payload, body.is_some(), &token)?;
            log::debug!("{method} {path} (attempt {attempts})");

            let response = self.transport.send(request).await?;
            let status = response.status();

            if status == StatusCode::TOO_MANY_REQUESTS {
                if !self.retry.allows_retry(attempts) {
                    log::error!("{method} {path} still rate limited after {attempts} attempts");
                    return Err(Report::new(BunqError::RateLimited { attempts }));
                }
                let delay = self.retry.backoff(response.headers());
                log::warn!("{method} {path} rate limited, retrying in {delay:?}");
                tokio::time::sleep(delay).await;
                continue;
            }

            if !status.is_success() {
                let body = String::from_utf8_lossy(response.body()).into_owned();
                log::warn!("{method} {path} failed with status {status}");
                return Err(Report::new(BunqError::Api { status, body }));
            }

            return self
                .verify_response(response)
                .attach(format!("while verifying response to {method} {path}"));
        }
    }

    fn build_request(
        &self,
        method: &Method,
        path: &str,
        payload: &[u8],
        has_body: bool,
        token: &str,
    ) -> Result<OutgoingRequest, Report<BunqError>> {
        let signature = self.signer.sign(payload)?;

        let mut headers = self.headers.clone();
        if has_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        headers.insert(
            HEADER_CLIENT_REQUEST_ID,
            HeaderValue::from_str(&Uuid::new_v4().to_string()).change_context(
                BunqError::Configuration {
                    message: "Request id is not a valid header value".to_string(),
                },
            )?,
        );
        headers.insert(
            HEADER_CLIENT_AUTHENTICATION,
            HeaderValue::from_str(token).change_context(BunqError::Configuration {
                message: "Authentication token is not a valid header value".to_string(),
            })?,
        );
        headers.insert(
            HEADER_CLIENT_SIGNATURE,
            HeaderValue::from_str(&signature).change_context(BunqError::Configuration {
                message: "Signature is not a valid header value".to_string(),
            })?,
        );

        Ok(OutgoingRequest {
            method: method.clone(),
            path: path.to_string(),
            headers,
            body: payload.to_vec(),
        })
    }

    fn verify_response(&self, response: Response<Vec<u8>>) -> Result<Vec<u8>, Report<BunqError>> {
        let signature = response
            .headers()
            .get_all(HEADER_SERVER_SIGNATURE)
            .iter()
            .map(HeaderValue::to_str)
            .collect::<Result<Vec<_>, _>>()
            .change_context(BunqError::InvalidSignatureEncoding {
                message: "Server signature header is not ASCII".to_string(),
            })?
            .join(",");

        if signature.is_empty() {
            log::error!("Response carries no server signature");
            return Err(Report::new(BunqError::ResponseAuthenticity {
                message: "Missing server signature".to_string(),
            }));
        }

        let body = response.into_body();
        if !self.signer.verify(&body, &signature)? {
            log::error!("Server signature does not match response body");
            return Err(Report::new(BunqError::ResponseAuthenticity {
                message: "Server signature does not match response body".to_string(),
            }));
        }

        Ok(body)
    }

    /// `GET` under the current session, decoded as an envelope.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`] and [`ResponseEnvelope::parse`].
    pub async fn get_envelope(&self, path: &str) -> Result<ResponseEnvelope, Report<BunqError>> {
        let bytes = self
            .execute(Method::GET, path, None, Credential::Session)
            .await?;
        ResponseEnvelope::parse(&bytes)
    }

    /// `POST` a JSON body, decoded as an envelope.
    ///
    /// # Errors
    ///
    /// See [`Self::execute`] and [`ResponseEnvelope::parse`].
    pub async fn post_envelope(
        &self,
        path: &str,
        body: &Value,
        credential: Credential<'_>,
    ) -> Result<ResponseEnvelope, Report<BunqError>> {
        let bytes = self
            .execute(Method::POST, path, Some(body), credential)
            .await?;
        ResponseEnvelope::parse(&bytes)
    }
}
