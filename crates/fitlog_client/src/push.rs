//! Web Push delivery: RFC 8291 (`aes128gcm`) payload encryption and RFC 8292
//! VAPID authorisation over reqwest.

use aes_gcm::Aes128Gcm;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit};
use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use hkdf::Hkdf;
use jwt_simple::algorithms::{ECDSAP256KeyPairLike, ES256KeyPair};
use jwt_simple::claims::Claims;
use p256::elliptic_curve::sec1::ToEncodedPoint;
use p256::{PublicKey, SecretKey};
use rand::Rng;
use reqwest::Url;
use secrecy::ExposeSecret;
use serde::Serialize;
use sha2::Sha256;

use crate::config::VapidConfig;
use crate::{FitLogError, PushSubscription};

const RECORD_SIZE: u32 = 4096;
/// Largest plaintext that keeps the encrypted body within one 4096-byte push message.
pub const MAX_PAYLOAD_BYTES: usize = 3993;
const DEFAULT_TTL_SECS: u32 = 24 * 60 * 60;
const VAPID_VALIDITY_HOURS: u64 = 12;
const DEFAULT_ICON: &str = "/pwa-192x192.png";

#[derive(Clone, Debug, Serialize, PartialEq)]
pub struct NotificationPayload {
    pub title: String,
    pub body: String,
    pub icon: String,
    pub badge: String,
    pub url: String,
}

impl NotificationPayload {
    pub fn new(title: impl Into<String>, body: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
            icon: DEFAULT_ICON.into(),
            badge: DEFAULT_ICON.into(),
            url: url.into(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PushDelivery {
    Delivered,
    /// The push service answered 404/410: the subscription no longer exists.
    Gone,
}

#[async_trait]
pub trait PushTransport: Send + Sync + 'static {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<PushDelivery, FitLogError>;
}

/// Accepts base64url with or without padding, and standard base64 as stored by older clients.
pub fn decode_key(s: &str) -> Result<Vec<u8>, FitLogError> {
    let normalized: String = s
        .trim()
        .trim_end_matches('=')
        .chars()
        .map(|c| match c {
            '+' => '-',
            '/' => '_',
            c => c,
        })
        .collect();
    URL_SAFE_NO_PAD
        .decode(normalized)
        .map_err(|e| FitLogError::InvalidInput(format!("invalid base64 key: {e}")))
}

fn hkdf_expand<const N: usize>(hk: &Hkdf<Sha256>, info: &[u8]) -> Result<[u8; N], FitLogError> {
    let mut okm = [0u8; N];
    hk.expand(info, &mut okm)
        .map_err(|e| FitLogError::Push(format!("hkdf expand: {e}")))?;
    Ok(okm)
}

/// Derive the content encryption key and nonce shared with the user agent.
fn derive_keys(
    ecdh_secret: &[u8],
    auth_secret: &[u8],
    ua_public: &[u8],
    as_public: &[u8],
    salt: &[u8; 16],
) -> Result<([u8; 16], [u8; 12]), FitLogError> {
    let prk_key = Hkdf::<Sha256>::new(Some(auth_secret), ecdh_secret);
    let mut key_info = Vec::with_capacity(14 + ua_public.len() + as_public.len());
    key_info.extend_from_slice(b"WebPush: info\0");
    key_info.extend_from_slice(ua_public);
    key_info.extend_from_slice(as_public);
    let ikm: [u8; 32] = hkdf_expand(&prk_key, &key_info)?;

    let prk = Hkdf::<Sha256>::new(Some(salt), &ikm);
    let cek: [u8; 16] = hkdf_expand(&prk, b"Content-Encoding: aes128gcm\0")?;
    let nonce: [u8; 12] = hkdf_expand(&prk, b"Content-Encoding: nonce\0")?;
    Ok((cek, nonce))
}

/// Encrypt `plaintext` as a single `aes128gcm` record for the given subscriber key.
///
/// `as_secret` is the ephemeral application-server key; `salt` must be fresh per message.
pub fn encrypt_payload(
    plaintext: &[u8],
    ua_public: &[u8],
    auth_secret: &[u8],
    as_secret: &SecretKey,
    salt: [u8; 16],
) -> Result<Vec<u8>, FitLogError> {
    if plaintext.len() > MAX_PAYLOAD_BYTES {
        return Err(FitLogError::InvalidInput(format!(
            "push payload is {} bytes, limit is {MAX_PAYLOAD_BYTES}",
            plaintext.len()
        )));
    }
    let subscriber = PublicKey::from_sec1_bytes(ua_public)
        .map_err(|_| FitLogError::InvalidInput("invalid p256dh key".into()))?;
    let shared = p256::ecdh::diffie_hellman(as_secret.to_nonzero_scalar(), subscriber.as_affine());
    let as_public = as_secret.public_key().to_encoded_point(false);

    let (cek, nonce) = derive_keys(
        shared.raw_secret_bytes().as_slice(),
        auth_secret,
        ua_public,
        as_public.as_bytes(),
        &salt,
    )?;

    let mut record = Vec::with_capacity(plaintext.len() + 1);
    record.extend_from_slice(plaintext);
    // last-record delimiter, no padding
    record.push(0x02);

    let cipher = Aes128Gcm::new(GenericArray::from_slice(&cek));
    let ciphertext = cipher
        .encrypt(GenericArray::from_slice(&nonce), record.as_slice())
        .map_err(|e| FitLogError::Push(format!("encrypting payload: {e}")))?;

    let key_id = as_public.as_bytes();
    let mut body = Vec::with_capacity(16 + 4 + 1 + key_id.len() + ciphertext.len());
    body.extend_from_slice(&salt);
    body.extend_from_slice(&RECORD_SIZE.to_be_bytes());
    body.push(key_id.len() as u8);
    body.extend_from_slice(key_id);
    body.extend_from_slice(&ciphertext);
    Ok(body)
}

fn ephemeral_key() -> SecretKey {
    let mut rng = rand::rng();
    loop {
        let mut bytes = [0u8; 32];
        rng.fill(&mut bytes);
        if let Ok(key) = SecretKey::from_slice(&bytes) {
            return key;
        }
    }
}

/// Sends notifications straight to each subscription's push service.
pub struct WebPushSender {
    client: reqwest::Client,
    public_key: String,
    subject: String,
    signing_key: ES256KeyPair,
    ttl_secs: u32,
}

impl WebPushSender {
    pub fn new(vapid: &VapidConfig) -> Result<Self, FitLogError> {
        let raw = decode_key(vapid.private_key.expose_secret())?;
        let signing_key = ES256KeyPair::from_bytes(&raw)
            .map_err(|e| FitLogError::Config(format!("invalid VAPID private key: {e}")))?;
        let client = reqwest::Client::builder()
            .build()
            .map_err(FitLogError::Http)?;
        Ok(Self {
            client,
            public_key: vapid.public_key.trim().trim_end_matches('=').to_string(),
            subject: vapid.subject.clone(),
            signing_key,
            ttl_secs: DEFAULT_TTL_SECS,
        })
    }

    pub fn with_ttl(mut self, ttl_secs: u32) -> Self {
        self.ttl_secs = ttl_secs;
        self
    }

    /// `vapid t=<jwt>, k=<public key>` for the endpoint's origin.
    fn authorization(&self, endpoint: &str) -> Result<String, FitLogError> {
        let url = Url::parse(endpoint)
            .map_err(|e| FitLogError::InvalidInput(format!("invalid push endpoint: {e}")))?;
        let audience = url.origin().ascii_serialization();
        let claims = Claims::create(jwt_simple::prelude::Duration::from_hours(VAPID_VALIDITY_HOURS))
            .with_audience(audience)
            .with_subject(&self.subject);
        let token = self
            .signing_key
            .sign(claims)
            .map_err(|e| FitLogError::Push(format!("signing VAPID token: {e}")))?;
        Ok(format!("vapid t={token}, k={}", self.public_key))
    }
}

#[async_trait]
impl PushTransport for WebPushSender {
    async fn send(
        &self,
        subscription: &PushSubscription,
        payload: &NotificationPayload,
    ) -> Result<PushDelivery, FitLogError> {
        let plaintext = serde_json::to_vec(payload)?;
        let ua_public = decode_key(&subscription.p256dh)?;
        let auth_secret = decode_key(&subscription.auth)?;
        let mut salt = [0u8; 16];
        rand::rng().fill(&mut salt);
        let body = encrypt_payload(&plaintext, &ua_public, &auth_secret, &ephemeral_key(), salt)?;

        let resp = self
            .client
            .post(&subscription.endpoint)
            .header("TTL", self.ttl_secs.to_string())
            .header("Urgency", "normal")
            .header("Content-Encoding", "aes128gcm")
            .header("Content-Type", "application/octet-stream")
            .header("Authorization", self.authorization(&subscription.endpoint)?)
            .body(body)
            .send()
            .await?;

        let status = resp.status().as_u16();
        match status {
            200..=299 => {
                metrics::counter!("fitlog_push_deliveries_total", "outcome" => "delivered")
                    .increment(1);
                Ok(PushDelivery::Delivered)
            }
            404 | 410 => {
                metrics::counter!("fitlog_push_deliveries_total", "outcome" => "gone").increment(1);
                Ok(PushDelivery::Gone)
            }
            _ => {
                metrics::counter!("fitlog_push_deliveries_total", "outcome" => "failed")
                    .increment(1);
                let body = resp.text().await.unwrap_or_default();
                Err(FitLogError::Api {
                    status,
                    message: body.chars().take(256).collect(),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decrypt(body: &[u8], ua_secret: &SecretKey, auth_secret: &[u8]) -> Vec<u8> {
        let salt: [u8; 16] = body[..16].try_into().unwrap();
        let rs = u32::from_be_bytes(body[16..20].try_into().unwrap());
        assert_eq!(rs, RECORD_SIZE);
        let id_len = body[20] as usize;
        let as_public = &body[21..21 + id_len];
        let ciphertext = &body[21 + id_len..];

        let server = PublicKey::from_sec1_bytes(as_public).unwrap();
        let shared = p256::ecdh::diffie_hellman(ua_secret.to_nonzero_scalar(), server.as_affine());
        let ua_public = ua_secret.public_key().to_encoded_point(false);
        let (cek, nonce) = derive_keys(
            shared.raw_secret_bytes().as_slice(),
            auth_secret,
            ua_public.as_bytes(),
            as_public,
            &salt,
        )
        .unwrap();
        let cipher = Aes128Gcm::new(GenericArray::from_slice(&cek));
        let mut plain = cipher
            .decrypt(GenericArray::from_slice(&nonce), ciphertext)
            .unwrap();
        assert_eq!(plain.pop(), Some(0x02));
        plain
    }

    #[test]
    fn subscriber_can_decrypt_payload() {
        let ua_secret = SecretKey::from_slice(&[9u8; 32]).unwrap();
        let ua_public = ua_secret.public_key().to_encoded_point(false);
        let auth_secret = [3u8; 16];
        let as_secret = SecretKey::from_slice(&[5u8; 32]).unwrap();

        let message = br#"{"title":"Morning Reminder","body":"log today"}"#;
        let body = encrypt_payload(message, ua_public.as_bytes(), &auth_secret, &as_secret, [1u8; 16])
            .expect("encrypt");
        assert_eq!(body[20], 65);
        assert_eq!(decrypt(&body, &ua_secret, &auth_secret), message.to_vec());
    }

    #[test]
    fn oversized_payload_is_rejected() {
        let ua_secret = SecretKey::from_slice(&[9u8; 32]).unwrap();
        let ua_public = ua_secret.public_key().to_encoded_point(false);
        let big = vec![b'a'; MAX_PAYLOAD_BYTES + 1];
        let res = encrypt_payload(&big, ua_public.as_bytes(), &[0u8; 16], &ephemeral_key(), [0u8; 16]);
        assert!(matches!(res, Err(FitLogError::InvalidInput(_))));
    }

    #[test]
    fn decode_key_accepts_standard_and_url_safe_forms() {
        let bytes = vec![0xfb, 0xff, 0xfe, 0x10];
        let url_safe = URL_SAFE_NO_PAD.encode(&bytes);
        let standard = base64::engine::general_purpose::STANDARD.encode(&bytes);
        assert_eq!(decode_key(&url_safe).unwrap(), bytes);
        assert_eq!(decode_key(&standard).unwrap(), bytes);
        assert!(decode_key("not base64!").is_err());
    }

    #[test]
    fn payload_serializes_with_default_icons() {
        let p = NotificationPayload::new("Hi", "there", "/dashboard");
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["icon"], "/pwa-192x192.png");
        assert_eq!(v["url"], "/dashboard");
    }
}
