//! OAuth 1.0a request signing for the BrickLink store API.
//!
//! BrickLink issues a consumer key/secret and a token/secret pair per
//! registered IP; every request carries an `HMAC-SHA1` signature over the
//! method, URL and parameters.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::http::HttpMethod;
use crate::platform::{PlatformError, Result};

type HmacSha1 = Hmac<Sha1>;

/// Credentials issued on the BrickLink API registration page.
#[derive(Clone)]
pub struct OAuthCredentials {
    pub consumer_key: String,
    pub consumer_secret: String,
    pub token: String,
    pub token_secret: String,
}

impl std::fmt::Debug for OAuthCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OAuthCredentials")
            .field("consumer_key", &self.consumer_key)
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

impl OAuthCredentials {
    pub fn is_complete(&self) -> bool {
        [
            &self.consumer_key,
            &self.consumer_secret,
            &self.token,
            &self.token_secret,
        ]
        .iter()
        .all(|v| !v.trim().is_empty())
    }

    /// Build the `Authorization` header value for one request.
    ///
    /// Query parameters already in `url` are folded into the signature base.
    pub fn authorization_header(
        &self,
        method: HttpMethod,
        url: &str,
        nonce: &str,
        timestamp: i64,
    ) -> Result<String> {
        let parsed = url::Url::parse(url)
            .map_err(|e| PlatformError::internal(format!("invalid URL {url}: {e}")))?;
        let mut base_url = parsed.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        let timestamp = timestamp.to_string();
        let oauth_params = [
            ("oauth_consumer_key", self.consumer_key.as_str()),
            ("oauth_nonce", nonce),
            ("oauth_signature_method", "HMAC-SHA1"),
            ("oauth_timestamp", timestamp.as_str()),
            ("oauth_token", self.token.as_str()),
            ("oauth_version", "1.0"),
        ];

        let mut params: Vec<(String, String)> = parsed
            .query_pairs()
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v)))
            .chain(
                oauth_params
                    .iter()
                    .map(|(k, v)| (percent_encode(k), percent_encode(v))),
            )
            .collect();
        params.sort();
        let param_string = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");

        let base_string = format!(
            "{}&{}&{}",
            method.as_str(),
            percent_encode(base_url.as_str()),
            percent_encode(&param_string)
        );
        let key = format!(
            "{}&{}",
            percent_encode(&self.consumer_secret),
            percent_encode(&self.token_secret)
        );

        let mut mac = HmacSha1::new_from_slice(key.as_bytes())
            .map_err(|e| PlatformError::internal(format!("invalid signing key: {e}")))?;
        mac.update(base_string.as_bytes());
        let signature = STANDARD.encode(mac.finalize().into_bytes());

        let mut header: Vec<(&str, &str)> = oauth_params.to_vec();
        header.push(("oauth_signature", signature.as_str()));
        header.sort();
        let fields = header
            .iter()
            .map(|(k, v)| format!("{k}=\"{}\"", percent_encode(v)))
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!("OAuth {fields}"))
    }
}

/// RFC 3986 percent-encoding: everything but unreserved characters.
fn percent_encode(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'.' | b'_' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}
