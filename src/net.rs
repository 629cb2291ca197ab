/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{fmt, sync::Arc, time::Duration};

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::Utc;
use reqwest::{
    header::{AUTHORIZATION, CONTENT_TYPE, WWW_AUTHENTICATE},
    Client, RequestBuilder, StatusCode,
};
use tracing::{debug, trace};
use url::Url;

use crate::{
    config::SecurityMode,
    ntlm::{self, Identity, NtlmError},
    types::Operation,
    xml::UsernameToken,
};

/// Location of the EWS endpoint relative to the server root.
pub const EWS_PATH: &str = "EWS/Exchange.asmx";

const SOAP_CONTENT_TYPE: &str = "text/xml; charset=utf-8";

/// Builds `https://<host>/EWS/Exchange.asmx` from a bare host, optionally
/// followed by a path prefix.
pub fn endpoint_url(host: &str) -> Result<Url, url::ParseError> {
    let host = host.trim();
    let host = host.strip_prefix("https://").unwrap_or(host);

    let mut segments: Vec<&str> = host
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect();
    if segments.is_empty() {
        return Err(url::ParseError::EmptyHost);
    }
    segments.extend(EWS_PATH.split('/'));

    Url::parse(&format!("https://{}", segments.join("/")))
}

/// The active credential, applied to every request.
#[derive(Clone)]
pub struct Security {
    pub username: String,
    pub password: String,
    pub mode: SecurityMode,
}

impl Security {
    /// The SOAP header token, when requests authenticate with WS-Security.
    pub fn username_token(&self) -> Option<UsernameToken<'_>> {
        match self.mode {
            SecurityMode::Ws => Some(UsernameToken {
                username: &self.username,
                password: &self.password,
                created: Utc::now(),
            }),
            SecurityMode::Basic | SecurityMode::Ntlm => None,
        }
    }
}

impl fmt::Debug for Security {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Security")
            .field("username", &self.username)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("server answered with HTTP {status}")]
    Status { status: u16, body: String },

    #[error("unable to resolve host `{host}`")]
    HostNotFound { host: String },

    #[error("server did not answer the NTLM negotiation")]
    NoNtlm,

    #[error("invalid NTLM challenge: {0}")]
    Ntlm(#[from] NtlmError),

    #[error(transparent)]
    Request(reqwest::Error),
}

/// Carries serialized SOAP envelopes to the server.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Posts `envelope` as `operation`, authenticating with `security`, and
    /// returns the response body.
    async fn send(
        &self,
        operation: Operation,
        security: &Security,
        envelope: Vec<u8>,
    ) -> Result<String, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn send(
        &self,
        operation: Operation,
        security: &Security,
        envelope: Vec<u8>,
    ) -> Result<String, TransportError> {
        (**self).send(operation, security, envelope).await
    }
}

/// Sends requests over HTTPS with reqwest.
pub struct HttpTransport {
    client: Client,
    endpoint: Url,
}

impl HttpTransport {
    pub fn new(endpoint: Url, timeout: Option<Duration>) -> Result<Self, TransportError> {
        // NTLM authenticates the connection rather than the request, so both
        // legs must share one HTTP/1.1 socket.
        let mut builder = Client::builder().http1_only();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder.build().map_err(TransportError::Request)?;

        Ok(Self::with_client(client, endpoint))
    }

    pub fn with_client(client: Client, endpoint: Url) -> Self {
        Self { client, endpoint }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn post(&self) -> RequestBuilder {
        self.client
            .post(self.endpoint.clone())
            .header(CONTENT_TYPE, SOAP_CONTENT_TYPE)
    }

    fn request(&self, operation: Operation, envelope: Vec<u8>) -> RequestBuilder {
        self.post()
            .header("SOAPAction", operation.soap_action())
            .body(envelope)
    }

    async fn execute(&self, request: RequestBuilder) -> Result<String, TransportError> {
        let response = request.send().await.map_err(|err| self.classify(err))?;
        let status = response.status();
        let body = response.text().await.map_err(|err| self.classify(err))?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn send_ntlm(
        &self,
        operation: Operation,
        security: &Security,
        envelope: Vec<u8>,
    ) -> Result<String, TransportError> {
        let negotiate = format!("NTLM {}", STANDARD.encode(ntlm::negotiate_message()));
        let response = self
            .post()
            .header(AUTHORIZATION, negotiate)
            .send()
            .await
            .map_err(|err| self.classify(err))?;

        let status = response.status();
        if status != StatusCode::UNAUTHORIZED {
            // Anything but a challenge means the negotiation did not happen.
            let body = response.text().await.map_err(|err| self.classify(err))?;
            debug!("server answered NTLM negotiation with HTTP {status}");
            return Err(if status.is_success() {
                TransportError::NoNtlm
            } else {
                TransportError::Status {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let challenge = response
            .headers()
            .get_all(WWW_AUTHENTICATE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .find_map(|value| value.strip_prefix("NTLM "))
            .map(|value| value.trim().to_string());

        // The authenticate leg reuses this connection once the body is read.
        response.bytes().await.map_err(|err| self.classify(err))?;

        let challenge = challenge.ok_or(TransportError::NoNtlm)?;
        let challenge = STANDARD
            .decode(challenge)
            .map_err(|_| TransportError::NoNtlm)?;
        let challenge = ntlm::Challenge::parse(&challenge)?;

        let identity = Identity::from_login(&security.username, &security.password);
        let authenticate = ntlm::authenticate_message(
            &challenge,
            &identity,
            rand::random(),
            ntlm::current_timestamp(),
        );

        let request = self
            .request(operation, envelope)
            .header(AUTHORIZATION, format!("NTLM {}", STANDARD.encode(authenticate)));

        self.execute(request).await
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        if err.is_connect() && is_lookup_failure(&err) {
            return TransportError::HostNotFound {
                host: self.endpoint.host_str().unwrap_or_default().to_string(),
            };
        }

        TransportError::Request(err)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        operation: Operation,
        security: &Security,
        envelope: Vec<u8>,
    ) -> Result<String, TransportError> {
        debug!(
            operation = operation.name(),
            endpoint = %self.endpoint,
            security = %security.mode,
            "sending request"
        );

        let body = match security.mode {
            SecurityMode::Basic => {
                let request = self
                    .request(operation, envelope)
                    .basic_auth(&security.username, Some(&security.password));
                self.execute(request).await?
            }
            SecurityMode::Ws => self.execute(self.request(operation, envelope)).await?,
            SecurityMode::Ntlm => self.send_ntlm(operation, security, envelope).await?,
        };

        trace!(operation = operation.name(), "response body: {body}");

        Ok(body)
    }
}

/// Whether a connection error was caused by the host name not resolving.
fn is_lookup_failure(err: &(dyn std::error::Error + 'static)) -> bool {
    let mut source = Some(err);
    while let Some(err) = source {
        let message = err.to_string();
        if message.contains("dns error") || message.contains("failed to lookup address") {
            return true;
        }

        source = err.source();
    }

    false
}
