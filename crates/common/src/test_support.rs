#[cfg(test)]
pub mod tests {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use async_trait::async_trait;
    use error_stack::Report;
    use http::header::RETRY_AFTER;
    use http::{HeaderValue, Response, StatusCode};

    use crate::constants::HEADER_SERVER_SIGNATURE;
    use crate::error::BunqError;
    use crate::request_signing::RequestSigner;
    use crate::settings::Settings;
    use crate::transport::{HttpTransport, OutgoingRequest};

    pub const CLIENT_PRIVATE_PEM: &str = include_str!("../tests/fixtures/client.pem");
    pub const CLIENT_PUBLIC_PEM: &str = include_str!("../tests/fixtures/client_pub.pem");
    pub const SERVER_PRIVATE_PEM: &str = include_str!("../tests/fixtures/server.pem");
    pub const SERVER_PUBLIC_PEM: &str = include_str!("../tests/fixtures/server_pub.pem");
    /// Body signed by the server fixture key with the openssl CLI.
    pub const SIGNED_BODY: &[u8] = include_bytes!("../tests/fixtures/body.json");
    pub const SIGNED_BODY_SIGNATURE: &str = include_str!("../tests/fixtures/body.sig");

    pub fn crate_test_settings_str() -> String {
        r#"
            [api]
            base_url = "https://api.test-bank.example/v1/"
            user_agent = "bunq-light-test"
            language = "en_US"
            region = "nl_NL"
            geolocation = "0 0 0 0 NL"
            timeout_secs = 5

            [retry]
            default_delay_secs = 15

            [device]
            description = "test-device"
            "#
        .to_string()
    }

    /// Environment variables the tests in this crate override.
    pub const OVERRIDE_VARS: [&str; 2] = [
        "BUNQ_LIGHT__RETRY__MAX_ATTEMPTS",
        "BUNQ_LIGHT__DEVICE__DESCRIPTION",
    ];

    pub fn create_test_settings() -> Settings {
        let toml_str = crate_test_settings_str();
        temp_env::with_vars_unset(OVERRIDE_VARS, || Settings::from_toml(&toml_str))
            .expect("Invalid config")
    }

    /// Signer used by the client under test: our key, server's public key.
    pub fn client_signer() -> RequestSigner {
        RequestSigner::from_pem(CLIENT_PRIVATE_PEM, SERVER_PUBLIC_PEM)
            .expect("client fixture keys should load")
    }

    /// Signer playing the server: server key, our public key.
    pub fn server_signer() -> RequestSigner {
        let server = crate::request_signing::KeyPair::from_private_pem(SERVER_PRIVATE_PEM)
            .expect("server fixture key should load");
        let client_public = crate::request_signing::parse_public_key_pem(CLIENT_PUBLIC_PEM)
            .expect("client public fixture should load");
        RequestSigner::new(&server, client_public)
    }

    /// 200 response whose body is signed by the server fixture key.
    pub fn signed_ok(body: &str) -> Response<Vec<u8>> {
        let signature = server_signer()
            .sign(body.as_bytes())
            .expect("server fixture should sign");
        with_signature(StatusCode::OK, body, &signature)
    }

    pub fn with_signature(status: StatusCode, body: &str, signature: &str) -> Response<Vec<u8>> {
        let mut response = plain(status, body);
        response.headers_mut().insert(
            HEADER_SERVER_SIGNATURE,
            HeaderValue::from_str(signature).expect("signature should be a header value"),
        );
        response
    }

    pub fn plain(status: StatusCode, body: &str) -> Response<Vec<u8>> {
        let mut response = Response::new(body.as_bytes().to_vec());
        *response.status_mut() = status;
        response
    }

    pub fn rate_limited(retry_after: Option<&'static str>) -> Response<Vec<u8>> {
        let mut response = plain(StatusCode::TOO_MANY_REQUESTS, "");
        if let Some(value) = retry_after {
            response
                .headers_mut()
                .insert(RETRY_AFTER, HeaderValue::from_static(value));
        }
        response
    }

    /// Replays queued responses in order and records every request.
    #[derive(Default)]
    pub struct ScriptedTransport {
        responses: Mutex<VecDeque<Response<Vec<u8>>>>,
        requests: Mutex<Vec<OutgoingRequest>>,
    }

    impl ScriptedTransport {
        pub fn new(responses: impl IntoIterator<Item = Response<Vec<u8>>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub fn push(&self, response: Response<Vec<u8>>) {
            self.responses
                .lock()
                .expect("responses lock")
                .push_back(response);
        }

        pub fn requests(&self) -> Vec<OutgoingRequest> {
            self.requests.lock().expect("requests lock").clone()
        }

        pub fn remaining(&self) -> usize {
            self.responses.lock().expect("responses lock").len()
        }
    }

    #[async_trait]
    impl HttpTransport for ScriptedTransport {
        async fn send(
            &self,
            request: OutgoingRequest,
        ) -> Result<Response<Vec<u8>>, Report<BunqError>> {
            let path = request.path.clone();
            self.requests.lock().expect("requests lock").push(request);
            self.responses
                .lock()
                .expect("responses lock")
                .pop_front()
                .ok_or_else(|| {
                    Report::new(BunqError::Transport {
                        message: format!("no scripted response left for {path}"),
                    })
                })
        }
    }
}
