/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

use std::{fmt, fs, path::Path, str::FromStr};

use serde::Deserialize;

use crate::error::{Error, Result};

/// The authentication scheme attached to outgoing requests.
#[derive(Clone, Copy, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SecurityMode {
    /// HTTP Basic authentication.
    #[default]
    Basic,

    /// NTLMv2 challenge/response over HTTP.
    Ntlm,

    /// A WS-Security `UsernameToken` carried in the SOAP header.
    Ws,
}

impl SecurityMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SecurityMode::Basic => "basic",
            SecurityMode::Ntlm => "ntlm",
            SecurityMode::Ws => "ws",
        }
    }
}

impl fmt::Display for SecurityMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown security mode `{0}`")]
pub struct UnknownSecurityMode(pub String);

impl FromStr for SecurityMode {
    type Err = UnknownSecurityMode;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "basic" => Ok(Self::Basic),
            "ntlm" => Ok(Self::Ntlm),
            "ws" => Ok(Self::Ws),
            _ => Err(UnknownSecurityMode(s.to_string())),
        }
    }
}

/// Connection settings for an Exchange server.
#[derive(Clone, Deserialize)]
pub struct Settings {
    pub username: String,
    pub password: String,

    /// Bare host of the server, optionally followed by a path prefix, e.g.
    /// `mail.example.com` or `mail.example.com/owa`.
    pub url: String,

    #[serde(default)]
    pub security: SecurityMode,

    /// Overall timeout applied to each HTTP request, if any.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl Settings {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        url: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            url: url.into(),
            security: SecurityMode::default(),
            timeout_secs: None,
        }
    }

    pub fn with_security(mut self, security: SecurityMode) -> Self {
        self.security = security;
        self
    }

    pub fn from_toml_str(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|err| Error::Config(err.to_string()))
    }

    /// Reads settings from a TOML file such as `config.toml`.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|err| Error::Config(format!("unable to read {}: {err}", path.display())))?;

        Self::from_toml_str(&contents)
    }
}

// Keep the password out of logs.
impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("url", &self.url)
            .field("security", &self.security)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}
