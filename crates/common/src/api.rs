//! Banking operations on top of [`SignedClient`].
//!
//! All user-scoped paths are built from the owner id of the current session,
//! so every call here except [`BankingApi::register_device`] establishes a
//! session first if needed.

use std::sync::Arc;

use async_trait::async_trait;
use error_stack::{Report, ResultExt};
use serde::Serialize;
use serde_json::Value;

use crate::client::{SessionRenewer, SignedClient};
use crate::constants::{PATH_DEVICE_SERVER, PATH_SESSION_SERVER};
use crate::envelope::ResponseEnvelope;
use crate::error::BunqError;
use crate::models::{
    Amount, DeviceServerRequest, Id, MonetaryAccountBank, Payment, PaymentRequest, Pointer,
    RequestInquiryRequest, SessionServerRequest, Token, UserCompany, UserIdentity, UserPerson,
};
use crate::request_signing::KeyPair;
use crate::session::{Credential, SessionState};
use crate::settings::Settings;
use crate::setup::{required, Installation};

fn to_value<T: Serialize>(body: &T, path: &str) -> Result<Value, Report<BunqError>> {
    serde_json::to_value(body).change_context(BunqError::Serialization {
        message: format!("Failed to serialize body for {path}"),
    })
}

/// Opens sessions with `POST session-server` under the installation token.
pub struct SessionServer {
    api_key: String,
}

impl SessionServer {
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }
}

#[async_trait]
impl SessionRenewer for SessionServer {
    async fn establish(&self, client: &SignedClient) -> Result<SessionState, Report<BunqError>> {
        let body = to_value(
            &SessionServerRequest {
                secret: &self.api_key,
            },
            PATH_SESSION_SERVER,
        )?;
        let envelope = client
            .post_envelope(
                PATH_SESSION_SERVER,
                &body,
                Credential::Bootstrap(client.installation_token()),
            )
            .await?;

        let (token, person, company) = envelope
            .decode_triplet::<Token, UserPerson, UserCompany>("Token", "UserPerson", "UserCompany")?;
        let token = required(token, "Token")?;
        let identity = UserIdentity::from_parts(person, company).ok_or_else(|| {
            Report::new(BunqError::MalformedEnvelope {
                message: "session response must name exactly one of UserPerson or UserCompany"
                    .to_string(),
            })
        })?;

        SessionState::from_timeout(identity.id(), token.token, identity.session_timeout())
    }
}

pub struct BankingApi {
    client: SignedClient,
    api_key: String,
}

impl BankingApi {
    #[must_use]
    pub fn new(client: SignedClient, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Client for a completed installation, renewing sessions with `api_key`.
    ///
    /// # Errors
    ///
    /// Returns [`BunqError::KeyFormat`] if the installation's server key is
    /// unusable and [`BunqError::Configuration`] for invalid settings.
    pub fn connect(
        settings: &Settings,
        keys: &KeyPair,
        installation: &Installation,
        api_key: &str,
    ) -> Result<Self, Report<BunqError>> {
        let client = SignedClient::from_settings(
            settings,
            installation.signer(keys)?,
            installation.token.clone(),
            Arc::new(SessionServer::new(api_key)),
        )?;
        Ok(Self::new(client, api_key))
    }

    #[must_use]
    pub fn client(&self) -> &SignedClient {
        &self.client
    }

    /// Register this device for the API key.
    ///
    /// # Errors
    ///
    /// See [`SignedClient::execute`]; a response without `Id` is
    /// [`BunqError::MalformedEnvelope`].
    pub async fn register_device(
        &self,
        description: &str,
        permitted_ips: &[String],
    ) -> Result<Id, Report<BunqError>> {
        let body = to_value(
            &DeviceServerRequest {
                secret: &self.api_key,
                description,
                permitted_ips,
            },
            PATH_DEVICE_SERVER,
        )?;
        let envelope = self
            .client
            .post_envelope(
                PATH_DEVICE_SERVER,
                &body,
                Credential::Bootstrap(self.client.installation_token()),
            )
            .await?;
        let id = required(envelope.decode_one("Id")?, "Id")?;
        log::info!("Registered device '{description}'");
        Ok(id)
    }

    /// Register this device under the configured `[device] description`,
    /// without IP restrictions.
    ///
    /// # Errors
    ///
    /// See [`Self::register_device`].
    pub async fn register_configured_device(
        &self,
        settings: &Settings,
    ) -> Result<Id, Report<BunqError>> {
        self.register_device(&settings.device.description, &[]).await
    }

    /// Open a fresh session regardless of the current one.
    ///
    /// # Errors
    ///
    /// See [`SessionServer`].
    pub async fn establish_session(&self) -> Result<Arc<SessionState>, Report<BunqError>> {
        self.client.renew_session().await
    }

    async fn user_path(&self, suffix: &str) -> Result<String, Report<BunqError>> {
        let session = self.client.ensure_session().await?;
        Ok(format!("user/{}/{suffix}", session.owner_id()))
    }

    async fn post_for_id(&self, path: &str, body: &Value) -> Result<Id, Report<BunqError>> {
        let envelope: ResponseEnvelope = self
            .client
            .post_envelope(path, body, Credential::Session)
            .await?;
        required(envelope.decode_one("Id")?, "Id")
    }

    /// # Errors
    ///
    /// See [`SignedClient::execute`].
    pub async fn list_monetary_account_banks(
        &self,
    ) -> Result<Vec<MonetaryAccountBank>, Report<BunqError>> {
        let path = self.user_path("monetary-account-bank").await?;
        self.client
            .get_envelope(&path)
            .await?
            .decode_many("MonetaryAccountBank")
    }

    /// Ask `counterparty` for money. Sandbox users can request up to 500 EUR
    /// from `sugardaddy@bunq.com`.
    ///
    /// # Errors
    ///
    /// See [`SignedClient::execute`].
    pub async fn request_inquiry(
        &self,
        amount: &Amount,
        counterparty: &Pointer,
        description: &str,
        account_id: i64,
    ) -> Result<Id, Report<BunqError>> {
        let path = self
            .user_path(&format!("monetary-account/{account_id}/request-inquiry"))
            .await?;
        let body = to_value(
            &RequestInquiryRequest {
                amount_inquired: amount,
                counterparty_alias: counterparty,
                description,
                allow_bunqme: false,
            },
            &path,
        )?;
        self.post_for_id(&path, &body).await
    }

    /// # Errors
    ///
    /// See [`SignedClient::execute`].
    pub async fn list_payments(&self, account_id: i64) -> Result<Vec<Payment>, Report<BunqError>> {
        let path = self
            .user_path(&format!("monetary-account/{account_id}/payment"))
            .await?;
        self.client.get_envelope(&path).await?.decode_many("Payment")
    }

    /// # Errors
    ///
    /// See [`SignedClient::execute`]. Refused transfers, such as an exceeded
    /// daily limit, come back as [`BunqError::Api`].
    pub async fn send_payment(
        &self,
        amount: &Amount,
        counterparty: &Pointer,
        description: &str,
        account_id: i64,
    ) -> Result<Id, Report<BunqError>> {
        let path = self
            .user_path(&format!("monetary-account/{account_id}/payment"))
            .await?;
        let body = to_value(
            &PaymentRequest {
                amount,
                counterparty_alias: counterparty,
                description,
            },
            &path,
        )?;
        self.post_for_id(&path, &body).await
    }
}
