/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! A small client for Exchange Web Services.
//!
//! [`ExchangeClient`] is the entry point: initialize it with [`Settings`],
//! then list mail, resolve names or read calendars. Each call is a single
//! SOAP round trip whose response is projected into the plain records of the
//! [`records`] module.

/// The `client` module holds the [`ExchangeClient`] facade.
pub mod client;

/// The `config` module defines connection settings and security modes.
pub mod config;

/// The `error` module defines the error type shared by every operation.
pub mod error;

/// The `net` module is responsible for making requests to the Exchange Web
/// Services API.
pub mod net;

/// The `ntlm` module encodes and decodes NTLMv2 authentication messages.
pub mod ntlm;

/// The `records` module defines the flattened records returned to callers.
pub mod records;

/// The `types` module defines the various data structures used for EWS requests
/// and responses. It also provides serialization and deserialization routines
/// for these types.
pub mod types;

/// The `xml` module provides utilities for processing of XML.
pub mod xml;

pub use client::ExchangeClient;
pub use config::{SecurityMode, Settings};
pub use error::{Error, Result};
