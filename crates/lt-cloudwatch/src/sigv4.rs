//! AWS Signature Version 4 for JSON-protocol POST requests.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

use crate::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";

/// Signs requests for one service in one region.
#[derive(Debug, Clone)]
pub(crate) struct Signer {
    credentials: Credentials,
    region: String,
    service: &'static str,
}

/// Headers to attach to a signed request, in canonical (sorted) order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SignedHeaders {
    pub headers: Vec<(&'static str, String)>,
    pub authorization: String,
}

impl Signer {
    pub(crate) const fn new(credentials: Credentials, region: String, service: &'static str) -> Self {
        Self {
            credentials,
            region,
            service,
        }
    }

    /// Signs a `POST` to `path` with the given host, content type, target and body.
    pub(crate) fn sign(
        &self,
        host: &str,
        path: &str,
        content_type: &str,
        target: &str,
        payload: &[u8],
        now: DateTime<Utc>,
    ) -> SignedHeaders {
        let amz_date = now.format("%Y%m%dT%H%M%SZ").to_string();
        let date = now.format("%Y%m%d").to_string();

        // Must stay sorted by header name.
        let mut headers: Vec<(&'static str, String)> = vec![
            ("content-type", content_type.to_string()),
            ("host", host.to_string()),
            ("x-amz-date", amz_date.clone()),
        ];
        if let Some(token) = self.credentials.session_token() {
            headers.push(("x-amz-security-token", token.to_string()));
        }
        headers.push(("x-amz-target", target.to_string()));

        let signed_header_names = headers
            .iter()
            .map(|(name, _)| *name)
            .collect::<Vec<_>>()
            .join(";");
        let canonical = canonical_request(path, &headers, &signed_header_names, payload);
        let scope = format!("{date}/{}/{}/aws4_request", self.region, self.service);
        let to_sign = string_to_sign(&amz_date, &scope, &canonical);
        let key = signing_key(
            self.credentials.secret_access_key(),
            &date,
            &self.region,
            self.service,
        );
        let signature = hex::encode(hmac_sha256(&key, to_sign.as_bytes()));

        let authorization = format!(
            "{ALGORITHM} Credential={}/{scope}, SignedHeaders={signed_header_names}, Signature={signature}",
            self.credentials.access_key_id()
        );

        SignedHeaders {
            headers,
            authorization,
        }
    }
}

fn canonical_request(
    path: &str,
    headers: &[(&'static str, String)],
    signed_header_names: &str,
    payload: &[u8],
) -> String {
    let canonical_headers: String = headers
        .iter()
        .map(|(name, value)| format!("{name}:{}\n", value.trim()))
        .collect();
    format!(
        "POST\n{}\n\n{canonical_headers}\n{signed_header_names}\n{}",
        canonical_uri(path),
        hex::encode(Sha256::digest(payload))
    )
}

/// Encodes every segment of an already percent-encoded request path once more,
/// as required for every service except S3.
fn canonical_uri(path: &str) -> String {
    if path.is_empty() {
        return "/".to_string();
    }
    path.split('/').map(uri_encode).collect::<Vec<_>>().join("/")
}

fn uri_encode(segment: &str) -> String {
    let mut encoded = String::with_capacity(segment.len());
    for byte in segment.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~') {
            encoded.push(char::from(byte));
        } else {
            encoded.push_str(&format!("%{byte:02X}"));
        }
    }
    encoded
}

fn string_to_sign(amz_date: &str, scope: &str, canonical_request: &str) -> String {
    format!(
        "{ALGORITHM}\n{amz_date}\n{scope}\n{}",
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    )
}

fn signing_key(secret: &str, date: &str, region: &str, service: &str) -> Vec<u8> {
    let k_date = hmac_sha256(format!("AWS4{secret}").as_bytes(), date.as_bytes());
    let k_region = hmac_sha256(&k_date, region.as_bytes());
    let k_service = hmac_sha256(&k_region, service.as_bytes());
    hmac_sha256(&k_service, b"aws4_request")
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    let mut mac = HmacSha256::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}
