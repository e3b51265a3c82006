use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::idp::TokenBundle;
use crate::passkey::{CeremonyOptions, CeremonyType};

use super::errors::CoordinationError;

/// Body of `POST /auth/passkey/init`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InitRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InitResponse {
    #[serde(rename = "type")]
    pub ceremony_type: CeremonyType,
    pub options: CeremonyOptions,
    #[serde(rename = "userId")]
    pub user_id: String,
}

/// Body of `POST /auth/passkey/verify`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifyRequest {
    #[serde(rename = "userId")]
    pub user_id: String,
    #[serde(rename = "type")]
    pub ceremony_type: CeremonyType,
    /// The `PublicKeyCredential` as serialized by the browser
    pub response: Value,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub success: bool,
    pub tokens: TokenBundle,
}

fn required_string(body: &Value, field: &str) -> Result<String, CoordinationError> {
    match body.get(field) {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::String(_)) | Some(Value::Null) | None => Err(
            CoordinationError::InputValidation(format!("{field} is required")),
        ),
        Some(_) => Err(CoordinationError::InputValidation(format!(
            "{field} must be a string"
        ))),
    }
}

impl TryFrom<Value> for InitRequest {
    type Error = CoordinationError;

    fn try_from(body: Value) -> Result<Self, Self::Error> {
        Ok(Self {
            email: required_string(&body, "email")?,
        })
    }
}

impl TryFrom<Value> for VerifyRequest {
    type Error = CoordinationError;

    fn try_from(mut body: Value) -> Result<Self, Self::Error> {
        let user_id = required_string(&body, "userId")?;
        let ceremony_type = required_string(&body, "type")?
            .parse::<CeremonyType>()
            .map_err(|e| CoordinationError::InputValidation(e.to_string()))?;
        let email = required_string(&body, "email")?;

        let response = match body.get_mut("response").map(Value::take) {
            Some(response @ Value::Object(_)) => response,
            _ => {
                return Err(CoordinationError::InputValidation(
                    "response is required".to_string(),
                ));
            }
        };

        Ok(Self {
            user_id,
            ceremony_type,
            response,
            email,
        })
    }
}
