//! Cross-origin policy.
//!
//! Origin is not the trust boundary here (the authorizer is), so the gate
//! accepts any origin, method, and standard header.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use topo_core::HttpMethod;

/// Headers a browser may send without further negotiation.
pub const DEFAULT_HEADERS: [&str; 6] = [
    "Content-Type",
    "X-Amz-Date",
    "Authorization",
    "X-Api-Key",
    "X-Amz-Security-Token",
    "X-Amz-User-Agent",
];

/// Preflight cache for canned gateway responses.
pub const CANNED_MAX_AGE_SECS: u64 = 86_400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CorsPolicy {
    pub allow_origins: Vec<String>,
    pub allow_methods: Vec<HttpMethod>,
    pub allow_headers: Vec<String>,
    pub max_age_secs: u64,
}

impl CorsPolicy {
    pub fn wide_open() -> Self {
        Self {
            allow_origins: vec!["*".to_string()],
            allow_methods: HttpMethod::ALL.to_vec(),
            allow_headers: DEFAULT_HEADERS.iter().map(|h| h.to_string()).collect(),
            max_age_secs: 60,
        }
    }

    /// Response headers for a preflight from `origin`.
    pub fn preflight_headers(&self, origin: &str) -> BTreeMap<String, String> {
        let allow_origin = if self.allow_origins.iter().any(|o| o == "*") {
            "*".to_string()
        } else if self.allow_origins.iter().any(|o| o == origin) {
            origin.to_string()
        } else {
            return BTreeMap::new();
        };

        let methods: Vec<&str> = self.allow_methods.iter().map(|m| m.as_str()).collect();
        BTreeMap::from([
            ("Access-Control-Allow-Origin".to_string(), allow_origin),
            ("Access-Control-Allow-Methods".to_string(), methods.join(",")),
            ("Access-Control-Allow-Headers".to_string(), self.allow_headers.join(",")),
            ("Access-Control-Max-Age".to_string(), self.max_age_secs.to_string()),
        ])
    }
}

/// Headers injected into gateway-level rejections, which never pass
/// through per-route CORS negotiation.
pub fn canned_response_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        ("Access-Control-Allow-Headers".to_string(), "*".to_string()),
        ("Access-Control-Allow-Methods".to_string(), "*".to_string()),
        ("Access-Control-Max-Age".to_string(), CANNED_MAX_AGE_SECS.to_string()),
    ])
}
