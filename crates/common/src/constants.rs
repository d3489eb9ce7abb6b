use std::time::Duration;

use http::header::HeaderName;

pub const HEADER_CLIENT_AUTHENTICATION: HeaderName =
    HeaderName::from_static("x-bunq-client-authentication");
pub const HEADER_CLIENT_SIGNATURE: HeaderName = HeaderName::from_static("x-bunq-client-signature");
pub const HEADER_SERVER_SIGNATURE: HeaderName = HeaderName::from_static("x-bunq-server-signature");
pub const HEADER_CLIENT_REQUEST_ID: HeaderName =
    HeaderName::from_static("x-bunq-client-request-id");
pub const HEADER_LANGUAGE: HeaderName = HeaderName::from_static("x-bunq-language");
pub const HEADER_REGION: HeaderName = HeaderName::from_static("x-bunq-region");
pub const HEADER_GEOLOCATION: HeaderName = HeaderName::from_static("x-bunq-geolocation");

/// Key strength used for freshly generated key pairs.
pub const RSA_KEY_BITS: usize = 2048;

/// Armor label for PKCS#1 private keys.
pub const PRIVATE_KEY_LABEL: &str = "RSA PRIVATE KEY";
/// Armor label for `SubjectPublicKeyInfo` public keys.
pub const PUBLIC_KEY_LABEL: &str = "PUBLIC KEY";

/// A session is treated as expired this long before the server says it is.
pub const SESSION_GRACE_PERIOD: Duration = Duration::from_secs(30);

/// Back-off used when a 429 response carries no usable `Retry-After`.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(15);

pub const PATH_SANDBOX_USER: &str = "sandbox-user";
pub const PATH_INSTALLATION: &str = "installation";
pub const PATH_DEVICE_SERVER: &str = "device-server";
pub const PATH_SESSION_SERVER: &str = "session-server";
