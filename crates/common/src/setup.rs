//! Bootstrap exchanges made before any key is registered.
//!
//! Nothing here is signed and nothing is verified: the server's public key is
//! only learned from the installation response itself.

use std::sync::Arc;

use error_stack::{Report, ResultExt};
use http::header::CONTENT_TYPE;
use http::{HeaderMap, HeaderValue, Method};
use serde::Serialize;

use crate::constants::{PATH_INSTALLATION, PATH_SANDBOX_USER};
use crate::envelope::ResponseEnvelope;
use crate::error::BunqError;
use crate::models::{InstallationRequest, SandboxUser, ServerPublicKey, Token};
use crate::request_signing::{parse_public_key_pem, KeyPair, RequestSigner};
use crate::session::AuthState;
use crate::settings::Settings;
use crate::transport::{client_headers, HttpTransport, OutgoingRequest, ReqwestTransport};

/// Result of registering our public key.
#[derive(Clone)]
pub struct Installation {
    pub token: String,
    pub server_public_key: String,
}

impl Installation {
    /// Signer pairing our key with the server key from this installation.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the server key is not a valid PEM
    /// public key.
    pub fn signer(&self, keys: &KeyPair) -> Result<RequestSigner, Report<BunqError>> {
        let server_key = parse_public_key_pem(&self.server_public_key)
            .attach("while reading the installation server key")?;
        Ok(RequestSigner::new(keys, server_key))
    }
}

impl std::fmt::Debug for Installation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Installation")
            .field("token", &"<redacted>")
            .field("server_public_key", &self.server_public_key)
            .finish()
    }
}

pub struct BunqSetup {
    transport: Arc<dyn HttpTransport>,
    headers: HeaderMap,
}

impl BunqSetup {
    #[must_use]
    pub fn new(transport: Arc<dyn HttpTransport>, headers: HeaderMap) -> Self {
        Self { transport, headers }
    }

    /// # Errors
    ///
    /// Returns [`BunqError::Configuration`] if the settings do not describe a
    /// usable transport or header set.
    pub fn from_settings(settings: &Settings) -> Result<Self, Report<BunqError>> {
        let transport = Arc::new(ReqwestTransport::from_settings(settings)?);
        Ok(Self::new(transport, client_headers(&settings.api)?))
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        AuthState::Unauthenticated
    }

    /// Create a sandbox user and return its API key.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Api`] on a non-success status and
    /// [`BunqError::MalformedEnvelope`] if the response has no `ApiKey`.
    pub async fn create_sandbox_user(&self) -> Result<String, Report<BunqError>> {
        let envelope = self.post(PATH_SANDBOX_USER, None::<&()>).await?;
        let user: SandboxUser = required(envelope.decode_one("ApiKey")?, "ApiKey")?;
        log::info!("Created sandbox user");
        Ok(user.api_key)
    }

    /// Register `public_key_pem` and receive an installation token plus the
    /// server's public key.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::Api`] on a non-success status and
    /// [`BunqError::MalformedEnvelope`] if either part of the answer is missing.
    pub async fn installation(&self, public_key_pem: &str) -> Result<Installation, Report<BunqError>> {
        let request = InstallationRequest {
            client_public_key: public_key_pem,
        };
        let envelope = self.post(PATH_INSTALLATION, Some(&request)).await?;

        let token: Token = required(envelope.decode_one("Token")?, "Token")?;
        let server_key: ServerPublicKey =
            required(envelope.decode_one("ServerPublicKey")?, "ServerPublicKey")?;
        log::info!("Installation registered");

        Ok(Installation {
            token: token.token,
            server_public_key: server_key.server_public_key,
        })
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<ResponseEnvelope, Report<BunqError>> {
        let mut headers = self.headers.clone();
        let body = match body {
            Some(body) => {
                headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                serde_json::to_vec(body).change_context(BunqError::Serialization {
                    message: format!("Failed to serialize body for POST {path}"),
                })?
            }
            None => Vec::new(),
        };

        log::debug!("POST {path} (unsigned)");
        let response = self
            .transport
            .send(OutgoingRequest {
                method: Method::POST,
                path: path.to_string(),
                headers,
                body,
            })
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = String::from_utf8_lossy(response.body()).into_owned();
            log::warn!("POST {path} failed with status {status}");
            return Err(Report::new(BunqError::Api { status, body }));
        }

        ResponseEnvelope::parse(response.body())
    }
}

pub(crate) fn required<T>(value: Option<T>, tag: &str) -> Result<T, Report<BunqError>> {
    value.ok_or_else(|| {
        Report::new(BunqError::MalformedEnvelope {
            message: format!("response has no '{tag}' entry"),
        })
    })
}
