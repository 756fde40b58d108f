//! Canned gateway responses for rejected requests.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::cors::canned_response_headers;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseType {
    AccessDenied,
    Unauthorized,
}

impl ResponseType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseType::AccessDenied => "ACCESS_DENIED",
            ResponseType::Unauthorized => "UNAUTHORIZED",
        }
    }
}

/// Error body returned to API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ErrorBody {
    pub error_message: String,
    pub error_code: String,
    pub errors: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayResponse {
    pub response_type: ResponseType,
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// `application/json` mapping template.
    pub template: String,
}

impl GatewayResponse {
    /// 403 when the authorizer denies the request.
    pub fn access_denied() -> Self {
        Self {
            response_type: ResponseType::AccessDenied,
            status_code: 403,
            headers: canned_response_headers(),
            template: r#"{ "ErrorMessage": "$context.authorizer.errorMessage", "ErrorCode": "$context.error.responseType", "Errors": [] }"#
                .to_string(),
        }
    }

    /// 401 when the credential is missing or invalid.
    pub fn unauthorized() -> Self {
        Self {
            response_type: ResponseType::Unauthorized,
            status_code: 401,
            headers: canned_response_headers(),
            template: r#"{ "ErrorMessage": "Unauthorized", "ErrorCode": "$context.error.responseType", "Errors": [] }"#
                .to_string(),
        }
    }

    /// Header values in the provider's static-value form (`'*'`).
    pub fn header_mappings(&self) -> BTreeMap<String, String> {
        self.headers
            .iter()
            .map(|(k, v)| (k.clone(), format!("'{v}'")))
            .collect()
    }

    /// The body a client receives for this rejection. `authorizer_message`
    /// is whatever the authorizer reported with its deny decision.
    pub fn render(&self, authorizer_message: Option<&str>) -> ErrorBody {
        let error_message = match self.response_type {
            ResponseType::AccessDenied => authorizer_message.unwrap_or_default().to_string(),
            ResponseType::Unauthorized => "Unauthorized".to_string(),
        };
        ErrorBody {
            error_message,
            error_code: self.response_type.as_str().to_string(),
            errors: Vec::new(),
        }
    }
}
