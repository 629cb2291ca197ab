/* This Source Code Form is subject to the terms of the Mozilla Public
 * License, v. 2.0. If a copy of the MPL was not distributed with this
 * file, You can obtain one at http://mozilla.org/MPL/2.0/. */

//! NTLMv2 messages as exchanged over HTTP.
//!
//! The client sends a negotiate message, the server answers with a
//! challenge, and the client proves knowledge of the password in an
//! authenticate message. Only the NTLMv2 response is computed; no session
//! security is negotiated.
//!
//! See <https://learn.microsoft.com/en-us/openspecs/windows_protocols/ms-nlmp>.

use std::time::{SystemTime, UNIX_EPOCH};

use hmac::{Hmac, Mac};
use md4::{Digest, Md4};
use md5::Md5;

type HmacMd5 = Hmac<Md5>;

const SIGNATURE: &[u8; 8] = b"NTLMSSP\0";

const NEGOTIATE_UNICODE: u32 = 0x0000_0001;
const REQUEST_TARGET: u32 = 0x0000_0004;
const NEGOTIATE_NTLM: u32 = 0x0000_0200;
const NEGOTIATE_ALWAYS_SIGN: u32 = 0x0000_8000;
const NEGOTIATE_EXTENDED_SESSIONSECURITY: u32 = 0x0008_0000;
const NEGOTIATE_TARGET_INFO: u32 = 0x0080_0000;
const NEGOTIATE_128: u32 = 0x2000_0000;
const NEGOTIATE_56: u32 = 0x8000_0000;

const NEGOTIATE_FLAGS: u32 = NEGOTIATE_UNICODE
    | REQUEST_TARGET
    | NEGOTIATE_NTLM
    | NEGOTIATE_ALWAYS_SIGN
    | NEGOTIATE_EXTENDED_SESSIONSECURITY
    | NEGOTIATE_TARGET_INFO
    | NEGOTIATE_128
    | NEGOTIATE_56;

const AV_EOL: u16 = 0;
const AV_TIMESTAMP: u16 = 7;

/// Seconds between 1601-01-01 and the Unix epoch.
const FILETIME_EPOCH_OFFSET: u64 = 11_644_473_600;

#[derive(Debug, thiserror::Error)]
pub enum NtlmError {
    #[error("NTLM message is truncated")]
    Truncated,

    #[error("missing NTLMSSP signature")]
    BadSignature,

    #[error("expected NTLM message type {expected}, got {actual}")]
    UnexpectedType { expected: u32, actual: u32 },
}

/// The credentials used to answer a challenge.
#[derive(Clone, Copy, Debug)]
pub struct Identity<'a> {
    pub domain: &'a str,
    pub username: &'a str,
    pub password: &'a str,
    pub workstation: &'a str,
}

impl<'a> Identity<'a> {
    /// Builds an identity from a login that may be written `DOMAIN\user`.
    /// Any other form, including `user@domain`, is sent as-is with an empty
    /// domain.
    pub fn from_login(login: &'a str, password: &'a str) -> Self {
        let (domain, username) = login.split_once('\\').unwrap_or(("", login));

        Self {
            domain,
            username,
            password,
            workstation: "",
        }
    }
}

/// A decoded challenge (type 2) message.
#[derive(Clone, Debug)]
pub struct Challenge {
    pub flags: u32,
    pub server_challenge: [u8; 8],
    pub target_info: Vec<u8>,
}

impl Challenge {
    pub fn parse(bytes: &[u8]) -> Result<Self, NtlmError> {
        check_header(bytes, 2, 32)?;

        let flags = read_u32(bytes, 20)?;
        let mut server_challenge = [0u8; 8];
        server_challenge.copy_from_slice(&bytes[24..32]);

        // Target info is absent from the shortest form of the message.
        let target_info = if bytes.len() >= 48 {
            read_security_buffer(bytes, 40)?.to_vec()
        } else {
            Vec::new()
        };

        Ok(Self {
            flags,
            server_challenge,
            target_info,
        })
    }

    /// The server's `MsvAvTimestamp`, if the target info carries one.
    pub fn timestamp(&self) -> Option<u64> {
        let mut pairs = self.target_info.as_slice();
        while pairs.len() >= 4 {
            let id = u16::from_le_bytes([pairs[0], pairs[1]]);
            let len = u16::from_le_bytes([pairs[2], pairs[3]]) as usize;
            let value = pairs.get(4..4 + len)?;

            match id {
                AV_EOL => return None,
                AV_TIMESTAMP if len == 8 => {
                    let mut raw = [0u8; 8];
                    raw.copy_from_slice(value);
                    return Some(u64::from_le_bytes(raw));
                }
                _ => pairs = &pairs[4 + len..],
            }
        }

        None
    }
}

/// Encodes the negotiate (type 1) message.
pub fn negotiate_message() -> Vec<u8> {
    let mut message = Vec::with_capacity(32);
    message.extend_from_slice(SIGNATURE);
    message.extend_from_slice(&1u32.to_le_bytes());
    message.extend_from_slice(&NEGOTIATE_FLAGS.to_le_bytes());

    // Empty domain and workstation buffers.
    message.extend_from_slice(&[0u8; 16]);

    message
}

/// Encodes the authenticate (type 3) message answering `challenge`.
///
/// `client_challenge` must be random; `timestamp` is in 100ns ticks since
/// 1601 and is only used when the server did not provide one.
pub fn authenticate_message(
    challenge: &Challenge,
    identity: &Identity<'_>,
    client_challenge: [u8; 8],
    timestamp: u64,
) -> Vec<u8> {
    let response_key = ntowf_v2(identity.password, identity.username, identity.domain);
    let timestamp = challenge.timestamp().unwrap_or(timestamp);

    let mut blob = Vec::with_capacity(32 + challenge.target_info.len());
    blob.extend_from_slice(&[0x01, 0x01, 0x00, 0x00]);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&timestamp.to_le_bytes());
    blob.extend_from_slice(&client_challenge);
    blob.extend_from_slice(&[0u8; 4]);
    blob.extend_from_slice(&challenge.target_info);
    blob.extend_from_slice(&[0u8; 4]);

    let nt_proof = hmac_md5(&response_key, &[&challenge.server_challenge[..], &blob[..]]);
    let mut nt_response = nt_proof.to_vec();
    nt_response.extend_from_slice(&blob);

    let lm_response = lmv2_response(&response_key, &challenge.server_challenge, &client_challenge);

    let domain = utf16le(identity.domain);
    let username = utf16le(identity.username);
    let workstation = utf16le(identity.workstation);

    let payloads: [&[u8]; 6] = [
        &lm_response,
        &nt_response,
        &domain,
        &username,
        &workstation,
        // Encrypted random session key, unused without key exchange.
        &[],
    ];

    const HEADER_LEN: usize = 64;
    let mut message = Vec::with_capacity(
        HEADER_LEN + payloads.iter().map(|payload| payload.len()).sum::<usize>(),
    );
    message.extend_from_slice(SIGNATURE);
    message.extend_from_slice(&3u32.to_le_bytes());

    let mut offset = HEADER_LEN;
    for payload in payloads {
        let len = payload.len() as u16;
        message.extend_from_slice(&len.to_le_bytes());
        message.extend_from_slice(&len.to_le_bytes());
        message.extend_from_slice(&(offset as u32).to_le_bytes());
        offset += payload.len();
    }
    message.extend_from_slice(&NEGOTIATE_FLAGS.to_le_bytes());

    for payload in payloads {
        message.extend_from_slice(payload);
    }

    message
}

/// The current time in 100ns ticks since 1601-01-01.
pub fn current_timestamp() -> u64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();

    (since_epoch.as_secs() + FILETIME_EPOCH_OFFSET) * 10_000_000
        + u64::from(since_epoch.subsec_nanos() / 100)
}

/// MD4 of the UTF-16LE password.
pub fn nt_hash(password: &str) -> [u8; 16] {
    let digest = Md4::digest(utf16le(password));

    let mut hash = [0u8; 16];
    hash.copy_from_slice(&digest);
    hash
}

pub fn ntowf_v2(password: &str, username: &str, domain: &str) -> [u8; 16] {
    let identity = utf16le(&format!("{}{}", username.to_uppercase(), domain));
    hmac_md5(&nt_hash(password), &[identity.as_slice()])
}

fn lmv2_response(
    response_key: &[u8; 16],
    server_challenge: &[u8; 8],
    client_challenge: &[u8; 8],
) -> Vec<u8> {
    let proof = hmac_md5(response_key, &[&server_challenge[..], &client_challenge[..]]);

    let mut response = proof.to_vec();
    response.extend_from_slice(client_challenge);
    response
}

fn hmac_md5(key: &[u8], parts: &[&[u8]]) -> [u8; 16] {
    let mut mac = HmacMd5::new_from_slice(key).expect("HMAC accepts keys of any length");
    for part in parts {
        mac.update(part);
    }

    let mut out = [0u8; 16];
    out.copy_from_slice(&mac.finalize().into_bytes());
    out
}

fn utf16le(value: &str) -> Vec<u8> {
    value.encode_utf16().flat_map(u16::to_le_bytes).collect()
}

fn check_header(bytes: &[u8], expected: u32, min_len: usize) -> Result<(), NtlmError> {
    if bytes.len() < min_len {
        return Err(NtlmError::Truncated);
    }

    if &bytes[0..8] != SIGNATURE {
        return Err(NtlmError::BadSignature);
    }

    let actual = read_u32(bytes, 8)?;
    if actual != expected {
        return Err(NtlmError::UnexpectedType { expected, actual });
    }

    Ok(())
}

fn read_u32(bytes: &[u8], at: usize) -> Result<u32, NtlmError> {
    let raw = bytes.get(at..at + 4).ok_or(NtlmError::Truncated)?;
    Ok(u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]))
}

fn read_security_buffer(bytes: &[u8], at: usize) -> Result<&[u8], NtlmError> {
    let raw = bytes.get(at..at + 8).ok_or(NtlmError::Truncated)?;
    let len = u16::from_le_bytes([raw[0], raw[1]]) as usize;
    let offset = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]) as usize;

    bytes.get(offset..offset + len).ok_or(NtlmError::Truncated)
}
