//! Software authenticator used by unit tests to produce real WebAuthn responses.

use ciborium::value::{Integer, Value as CborValue};
use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use ring::signature::{ECDSA_P256_SHA256_ASN1_SIGNING, EcdsaKeyPair, KeyPair};
use serde_json::{Value, json};

use crate::utils::base64url_encode;

const FLAG_UP: u8 = 0x01;
const FLAG_UV: u8 = 0x04;
const FLAG_AT: u8 = 0x40;

pub(crate) struct SoftAuthenticator {
    pub(crate) credential_id: Vec<u8>,
    key_pair: EcdsaKeyPair,
    rng: SystemRandom,
    rp_id: String,
    origin: String,
    user_verified: bool,
}

impl SoftAuthenticator {
    pub(crate) fn new(rp_id: &str, origin: &str) -> Self {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, &rng).unwrap();
        let key_pair =
            EcdsaKeyPair::from_pkcs8(&ECDSA_P256_SHA256_ASN1_SIGNING, pkcs8.as_ref(), &rng)
                .unwrap();
        let mut credential_id = vec![0u8; 16];
        rng.fill(&mut credential_id).unwrap();

        Self {
            credential_id,
            key_pair,
            rng,
            rp_id: rp_id.to_string(),
            origin: origin.to_string(),
            user_verified: true,
        }
    }

    pub(crate) fn without_user_verification(mut self) -> Self {
        self.user_verified = false;
        self
    }

    pub(crate) fn public_point(&self) -> Vec<u8> {
        self.key_pair.public_key().as_ref().to_vec()
    }

    pub(crate) fn cose_key(&self) -> Vec<u8> {
        let point = self.public_point();
        let key = CborValue::Map(vec![
            (CborValue::Integer(Integer::from(1)), CborValue::Integer(Integer::from(2))),
            (CborValue::Integer(Integer::from(3)), CborValue::Integer(Integer::from(-7))),
            (CborValue::Integer(Integer::from(-1)), CborValue::Integer(Integer::from(1))),
            (CborValue::Integer(Integer::from(-2)), CborValue::Bytes(point[1..33].to_vec())),
            (CborValue::Integer(Integer::from(-3)), CborValue::Bytes(point[33..65].to_vec())),
        ]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&key, &mut buf).unwrap();
        buf
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Vec<u8> {
        self.key_pair
            .sign(&self.rng, message)
            .unwrap()
            .as_ref()
            .to_vec()
    }

    pub(crate) fn authenticator_data(
        &self,
        flag_bits: u8,
        counter: u32,
        with_attested: bool,
    ) -> Vec<u8> {
        let mut data = digest::digest(&digest::SHA256, self.rp_id.as_bytes())
            .as_ref()
            .to_vec();
        data.push(flag_bits);
        data.extend_from_slice(&counter.to_be_bytes());
        if with_attested {
            data.extend_from_slice(&[0u8; 16]);
            data.extend_from_slice(&(self.credential_id.len() as u16).to_be_bytes());
            data.extend_from_slice(&self.credential_id);
            data.extend_from_slice(&self.cose_key());
        }
        data
    }

    fn presence_flags(&self) -> u8 {
        if self.user_verified {
            FLAG_UP | FLAG_UV
        } else {
            FLAG_UP
        }
    }

    fn client_data(&self, type_: &str, challenge: &str) -> Vec<u8> {
        json!({
            "type": type_,
            "challenge": challenge,
            "origin": self.origin,
            "crossOrigin": false,
        })
        .to_string()
        .into_bytes()
    }

    fn attestation_object(&self, fmt: &str, att_stmt: Vec<(CborValue, CborValue)>) -> Vec<u8> {
        let auth_data = self.authenticator_data(self.presence_flags() | FLAG_AT, 0, true);
        let object = CborValue::Map(vec![
            (CborValue::Text("fmt".into()), CborValue::Text(fmt.into())),
            (CborValue::Text("attStmt".into()), CborValue::Map(att_stmt)),
            (CborValue::Text("authData".into()), CborValue::Bytes(auth_data)),
        ]);
        let mut buf = Vec::new();
        ciborium::ser::into_writer(&object, &mut buf).unwrap();
        buf
    }

    fn registration_json(&self, client_data: &[u8], attestation_object: &[u8]) -> Value {
        let id = base64url_encode(&self.credential_id);
        json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
            "response": {
                "clientDataJSON": base64url_encode(client_data),
                "attestationObject": base64url_encode(attestation_object),
                "transports": ["internal"],
            },
        })
    }

    /// A `navigator.credentials.create()` result with `none` attestation.
    pub(crate) fn registration_response(&self, challenge: &str) -> Value {
        let client_data = self.client_data("webauthn.create", challenge);
        let attestation_object = self.attestation_object("none", vec![]);
        self.registration_json(&client_data, &attestation_object)
    }

    /// A `navigator.credentials.create()` result with packed self attestation.
    pub(crate) fn packed_registration_response(&self, challenge: &str) -> Value {
        let client_data = self.client_data("webauthn.create", challenge);
        let auth_data = self.authenticator_data(self.presence_flags() | FLAG_AT, 0, true);

        let mut signed = auth_data;
        signed.extend_from_slice(digest::digest(&digest::SHA256, &client_data).as_ref());
        let att_stmt = vec![
            (CborValue::Text("alg".into()), CborValue::Integer(Integer::from(-7))),
            (CborValue::Text("sig".into()), CborValue::Bytes(self.sign(&signed))),
        ];

        let attestation_object = self.attestation_object("packed", att_stmt);
        self.registration_json(&client_data, &attestation_object)
    }

    /// A `navigator.credentials.get()` result reporting `counter`.
    pub(crate) fn assertion_response(
        &self,
        challenge: &str,
        counter: u32,
        user_handle: Option<&str>,
    ) -> Value {
        let client_data = self.client_data("webauthn.get", challenge);
        let auth_data = self.authenticator_data(self.presence_flags(), counter, false);

        let mut signed = auth_data.clone();
        signed.extend_from_slice(digest::digest(&digest::SHA256, &client_data).as_ref());
        let signature = self.sign(&signed);

        let id = base64url_encode(&self.credential_id);
        json!({
            "id": id,
            "rawId": id,
            "type": "public-key",
            "response": {
                "clientDataJSON": base64url_encode(&client_data),
                "authenticatorData": base64url_encode(&auth_data),
                "signature": base64url_encode(&signature),
                "userHandle": user_handle,
            },
        })
    }
}
