//! A software ES256 authenticator producing browser-shaped WebAuthn responses.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use ciborium::value::{Integer, Value as CborValue};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use serde_json::{Value, json};

pub const RP_ID: &str = "localhost";
pub const ORIGIN: &str = "http://localhost:3000";

pub struct SoftAuthenticator {
    pub credential_id: Vec<u8>,
    key_pair: EcdsaKeyPair,
    rng: SystemRandom,
}

fn b64(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

fn cbor(value: &CborValue) -> Vec<u8> {
    let mut buf = Vec::new();
    ciborium::ser::into_writer(value, &mut buf).expect("CBOR encoding should succeed");
    buf
}

impl SoftAuthenticator {
    pub fn new() -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng)
            .expect("key generation should succeed");
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .expect("generated key should load");
        let mut credential_id = vec![0u8; 32];
        rng.fill(&mut credential_id)
            .expect("random credential id should be generated");
        Self {
            credential_id,
            key_pair,
            rng,
        }
    }

    pub fn credential_id_b64(&self) -> String {
        b64(&self.credential_id)
    }

    pub fn cose_key(&self) -> Vec<u8> {
        let point = self.key_pair.public_key().as_ref();
        cbor(&CborValue::Map(vec![
            (CborValue::Integer(Integer::from(1)), CborValue::Integer(Integer::from(2))),
            (CborValue::Integer(Integer::from(3)), CborValue::Integer(Integer::from(-7))),
            (CborValue::Integer(Integer::from(-1)), CborValue::Integer(Integer::from(1))),
            (CborValue::Integer(Integer::from(-2)), CborValue::Bytes(point[1..33].to_vec())),
            (CborValue::Integer(Integer::from(-3)), CborValue::Bytes(point[33..65].to_vec())),
        ]))
    }

    fn auth_data(&self, flags: u8, counter: u32, attested: bool) -> Vec<u8> {
        let mut data = digest::digest(&digest::SHA256, RP_ID.as_bytes())
            .as_ref()
            .to_vec();
        data.push(flags);
        data.extend_from_slice(&counter.to_be_bytes());
        if attested {
            data.extend_from_slice(&[0u8; 16]);
            data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            data.extend_from_slice(&self.credential_id);
            data.extend_from_slice(&self.cose_key());
        }
        data
    }

    fn client_data(type_: &str, challenge: &str) -> Vec<u8> {
        json!({"type": type_, "challenge": challenge, "origin": ORIGIN, "crossOrigin": false})
            .to_string()
            .into_bytes()
    }

    /// Response to `navigator.credentials.create()` with `none` attestation.
    pub fn register(&self, challenge: &str) -> Value {
        let client_data = Self::client_data("webauthn.create", challenge);
        let attestation = cbor(&CborValue::Map(vec![
            (CborValue::Text("fmt".into()), CborValue::Text("none".into())),
            (CborValue::Text("attStmt".into()), CborValue::Map(vec![])),
            (
                CborValue::Text("authData".into()),
                CborValue::Bytes(self.auth_data(0x45, 0, true)),
            ),
        ]));

        json!({
            "id": self.credential_id_b64(),
            "rawId": self.credential_id_b64(),
            "type": "public-key",
            "response": {
                "clientDataJSON": b64(&client_data),
                "attestationObject": b64(&attestation),
                "transports": ["internal", "hybrid"],
            },
            "clientExtensionResults": {},
        })
    }

    /// Response to `navigator.credentials.get()` reporting `counter`.
    pub fn assert(&self, challenge: &str, counter: u32, user_id: &str) -> Value {
        let client_data = Self::client_data("webauthn.get", challenge);
        let auth_data = self.auth_data(0x05, counter, false);

        let mut signed = auth_data.clone();
        signed.extend_from_slice(digest::digest(&digest::SHA256, &client_data).as_ref());
        let signature = self
            .key_pair
            .sign(&self.rng, &signed)
            .expect("signing should succeed");

        json!({
            "id": self.credential_id_b64(),
            "rawId": self.credential_id_b64(),
            "type": "public-key",
            "response": {
                "clientDataJSON": b64(&client_data),
                "authenticatorData": b64(&auth_data),
                "signature": b64(signature.as_ref()),
                "userHandle": b64(user_id.as_bytes()),
            },
            "clientExtensionResults": {},
        })
    }
}
