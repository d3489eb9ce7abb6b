//! Payloads exchanged with the API.
//!
//! Response types only declare the fields this client reads; the server sends
//! many more and serde ignores them.

use serde::{Deserialize, Serialize};

/// `ApiKey` entry returned when creating a sandbox user.
#[derive(Debug, Clone, Deserialize)]
pub struct SandboxUser {
    pub api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Token {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerPublicKey {
    pub server_public_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct Id {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPerson {
    pub id: i64,
    pub session_timeout: i64,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserCompany {
    pub id: i64,
    pub session_timeout: i64,
    #[serde(default)]
    pub name: Option<String>,
}

/// The user behind a session: exactly one of the two identity kinds.
#[derive(Debug, Clone)]
pub enum UserIdentity {
    Person(UserPerson),
    Company(UserCompany),
}

impl UserIdentity {
    /// Pick the single identity out of the optional pair the envelope yields.
    ///
    /// Returns `None` when neither or both are present.
    #[must_use]
    pub fn from_parts(person: Option<UserPerson>, company: Option<UserCompany>) -> Option<Self> {
        match (person, company) {
            (Some(person), None) => Some(Self::Person(person)),
            (None, Some(company)) => Some(Self::Company(company)),
            _ => None,
        }
    }

    #[must_use]
    pub fn id(&self) -> i64 {
        match self {
            Self::Person(person) => person.id,
            Self::Company(company) => company.id,
        }
    }

    /// Session lifetime in seconds granted to this user.
    #[must_use]
    pub fn session_timeout(&self) -> i64 {
        match self {
            Self::Person(person) => person.session_timeout,
            Self::Company(company) => company.session_timeout,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Amount {
    pub value: String,
    pub currency: String,
}

impl Amount {
    #[must_use]
    pub fn new(value: impl Into<String>, currency: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            currency: currency.into(),
        }
    }

    #[must_use]
    pub fn eur(value: impl Into<String>) -> Self {
        Self::new(value, "EUR")
    }
}

/// A counterparty alias such as an IBAN or e-mail address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pointer {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Pointer {
    #[must_use]
    pub fn email(address: impl Into<String>) -> Self {
        Self {
            kind: "EMAIL".to_string(),
            value: address.into(),
            name: None,
        }
    }

    #[must_use]
    pub fn iban(iban: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: "IBAN".to_string(),
            value: iban.into(),
            name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MonetaryAccountBank {
    pub id: i64,
    pub status: String,
    pub balance: Amount,
    #[serde(default)]
    pub description: Option<String>,
}

impl MonetaryAccountBank {
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.status == "ACTIVE"
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Payment {
    pub id: i64,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeviceServerRequest<'a> {
    pub secret: &'a str,
    pub description: &'a str,
    pub permitted_ips: &'a [String],
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionServerRequest<'a> {
    pub secret: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstallationRequest<'a> {
    pub client_public_key: &'a str,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestInquiryRequest<'a> {
    pub amount_inquired: &'a Amount,
    pub counterparty_alias: &'a Pointer,
    pub description: &'a str,
    pub allow_bunqme: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentRequest<'a> {
    pub amount: &'a Amount,
    pub counterparty_alias: &'a Pointer,
    pub description: &'a str,
}
