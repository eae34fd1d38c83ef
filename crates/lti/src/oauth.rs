// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! OAuth 1.0a `HMAC-SHA1` signing as used by LTI 1.1.
//!
//! Signatures are computed over
//! `METHOD&encode(base_url)&encode(sorted_parameters)` with the key
//! `encode(consumer_secret)&` (LTI never uses token secrets).

use std::collections::BTreeMap;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use sha1::{Digest, Sha1};

use crate::error::LtiError;

type HmacSha1 = Hmac<Sha1>;

/// Characters left unescaped by OAuth: `ALPHA / DIGIT / "-" / "." / "_" / "~"`.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// The signature parameter name.
pub const OAUTH_SIGNATURE: &str = "oauth_signature";
/// The consumer key parameter name.
pub const OAUTH_CONSUMER_KEY: &str = "oauth_consumer_key";
/// The body hash parameter name.
pub const OAUTH_BODY_HASH: &str = "oauth_body_hash";

/// Percent-encodes a value per RFC 3986 as OAuth requires.
#[must_use]
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}

/// Strips query and fragment, lowercases scheme and host, and drops
/// default ports.
#[must_use]
pub fn normalize_base_url(url: &str) -> String {
    let without_fragment: &str = url.split('#').next().unwrap_or(url);
    let without_query: &str = without_fragment
        .split('?')
        .next()
        .unwrap_or(without_fragment);

    let Some((scheme, rest)) = without_query.split_once("://") else {
        return without_query.to_string();
    };
    let scheme: String = scheme.to_ascii_lowercase();
    let (authority, path) = rest.find('/').map_or((rest, "/"), |index| rest.split_at(index));

    let mut authority: String = authority.to_ascii_lowercase();
    let default_port: &str = if scheme == "https" { ":443" } else { ":80" };
    if authority.ends_with(default_port) {
        authority.truncate(authority.len() - default_port.len());
    }

    format!("{scheme}://{authority}{path}")
}

/// Decodes the `application/x-www-form-urlencoded` query of a URL.
#[must_use]
pub fn query_parameters(url: &str) -> Vec<(String, String)> {
    let Some((_, query)) = url.split('#').next().unwrap_or(url).split_once('?') else {
        return Vec::new();
    };

    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (form_decode(key), form_decode(value))
        })
        .collect()
}

fn form_decode(value: &str) -> String {
    percent_decode_str(&value.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Builds the OAuth signature base string.
///
/// `oauth_signature` is excluded from the parameters if present.
#[must_use]
pub fn signature_base_string(method: &str, url: &str, parameters: &[(String, String)]) -> String {
    let mut encoded: Vec<(String, String)> = parameters
        .iter()
        .filter(|(key, _)| key != OAUTH_SIGNATURE)
        .map(|(key, value)| (percent_encode(key), percent_encode(value)))
        .collect();
    encoded.sort();

    let normalized: String = encoded
        .iter()
        .map(|(key, value)| format!("{key}={value}"))
        .collect::<Vec<String>>()
        .join("&");

    format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&normalize_base_url(url)),
        percent_encode(&normalized)
    )
}

/// Base64 encoded SHA-1 digest of a request body.
#[must_use]
pub fn body_hash(body: &[u8]) -> String {
    STANDARD.encode(Sha1::digest(body))
}

fn signing_mac(consumer_secret: &str, base_string: &str) -> Result<HmacSha1, LtiError> {
    let key: String = format!("{}&", percent_encode(consumer_secret));
    let mut mac: HmacSha1 = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| LtiError::SigningKey(e.to_string()))?;
    mac.update(base_string.as_bytes());
    Ok(mac)
}

/// Signs and verifies OAuth 1.0a requests for one consumer.
#[derive(Clone)]
pub struct OAuthSigner {
    consumer_key: String,
    consumer_secret: String,
}

impl std::fmt::Debug for OAuthSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthSigner")
            .field("consumer_key", &self.consumer_key)
            .finish_non_exhaustive()
    }
}

impl OAuthSigner {
    /// Creates a signer for the given consumer credentials.
    #[must_use]
    pub fn new(consumer_key: impl Into<String>, consumer_secret: impl Into<String>) -> Self {
        Self {
            consumer_key: consumer_key.into(),
            consumer_secret: consumer_secret.into(),
        }
    }

    /// Returns the consumer key.
    #[must_use]
    pub fn consumer_key(&self) -> &str {
        &self.consumer_key
    }

    /// Computes the base64 signature of a base string.
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC key is rejected.
    pub fn signature(&self, base_string: &str) -> Result<String, LtiError> {
        let mac: HmacSha1 = signing_mac(&self.consumer_secret, base_string)?;
        Ok(STANDARD.encode(mac.finalize().into_bytes()))
    }

    /// Adds the OAuth protocol parameters and the signature to `parameters`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC key is rejected.
    pub fn sign(
        &self,
        method: &str,
        url: &str,
        mut parameters: BTreeMap<String, String>,
        nonce: &str,
        timestamp: i64,
    ) -> Result<BTreeMap<String, String>, LtiError> {
        parameters.insert(OAUTH_CONSUMER_KEY.to_string(), self.consumer_key.clone());
        parameters.insert(String::from("oauth_nonce"), nonce.to_string());
        parameters.insert(
            String::from("oauth_signature_method"),
            String::from("HMAC-SHA1"),
        );
        parameters.insert(String::from("oauth_timestamp"), timestamp.to_string());
        parameters.insert(String::from("oauth_version"), String::from("1.0"));
        parameters.remove(OAUTH_SIGNATURE);

        let mut signed_over: Vec<(String, String)> = query_parameters(url);
        signed_over.extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));

        let base_string: String = signature_base_string(method, url, &signed_over);
        let signature: String = self.signature(&base_string)?;
        parameters.insert(OAUTH_SIGNATURE.to_string(), signature);
        Ok(parameters)
    }

    /// Signs with a fresh random nonce and the current time.
    ///
    /// # Errors
    ///
    /// Returns an error if the HMAC key is rejected.
    pub fn sign_now(
        &self,
        method: &str,
        url: &str,
        parameters: BTreeMap<String, String>,
    ) -> Result<BTreeMap<String, String>, LtiError> {
        let nonce: String = format!("{:016x}", rand::random::<u64>());
        let timestamp: i64 = time::OffsetDateTime::now_utc().unix_timestamp();
        self.sign(method, url, parameters, &nonce, timestamp)
    }

    /// Checks the HMAC-SHA1 signature of a request whose OAuth parameters
    /// travel in `parameters` (query and form parameters combined, including
    /// `oauth_signature`). The request body is not covered.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is absent or wrong.
    pub fn verify_signature(
        &self,
        method: &str,
        url: &str,
        parameters: &[(String, String)],
    ) -> Result<(), LtiError> {
        let provided: &str = find_parameter(parameters, OAUTH_SIGNATURE)
            .ok_or_else(|| LtiError::MissingParameter(OAUTH_SIGNATURE.to_string()))?;
        let provided: Vec<u8> = STANDARD
            .decode(provided)
            .map_err(|_| LtiError::InvalidSignature)?;

        let base_string: String = signature_base_string(method, url, parameters);
        signing_mac(&self.consumer_secret, &base_string)?
            .verify_slice(&provided)
            .map_err(|_| LtiError::InvalidSignature)
    }

    /// Verifies a signed request together with its body.
    ///
    /// The signature only binds the body through `oauth_body_hash`, so the
    /// parameter is required and must match `body`.
    ///
    /// # Errors
    ///
    /// Returns an error if the signature is absent or wrong, or the body
    /// hash is absent or does not match.
    pub fn verify(
        &self,
        method: &str,
        url: &str,
        parameters: &[(String, String)],
        body: &[u8],
    ) -> Result<(), LtiError> {
        self.verify_signature(method, url, parameters)?;

        let hash: &str = find_parameter(parameters, OAUTH_BODY_HASH)
            .ok_or_else(|| LtiError::MissingParameter(OAUTH_BODY_HASH.to_string()))?;
        if hash != body_hash(body) {
            return Err(LtiError::BodyHashMismatch);
        }

        Ok(())
    }
}

/// Looks up a parameter by name.
#[must_use]
pub fn find_parameter<'a>(parameters: &'a [(String, String)], name: &str) -> Option<&'a str> {
    parameters
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}
