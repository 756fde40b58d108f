//! Structured JSON access logging.

use serde::{Deserialize, Serialize};

use topo_core::stage;

/// One field of the access log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessLogField {
    pub key: &'static str,
    /// Provider context variable substituted at request time.
    pub variable: &'static str,
    /// Numeric fields are emitted unquoted.
    pub numeric: bool,
}

const fn field(key: &'static str, variable: &'static str, numeric: bool) -> AccessLogField {
    AccessLogField {
        key,
        variable,
        numeric,
    }
}

/// The fixed field set, in emission order.
pub const FIELDS: [AccessLogField; 14] = [
    field("requestTime", "$context.requestTime", false),
    field("requestId", "$context.requestId", false),
    field("httpMethod", "$context.httpMethod", false),
    field("path", "$context.path", false),
    field("resourcePath", "$context.resourcePath", false),
    field("status", "$context.status", true),
    field("responseLatency", "$context.responseLatency", true),
    field("xrayTraceId", "$context.xrayTraceId", false),
    field("integrationLatency", "$context.integration.latency", false),
    field("integrationStatus", "$context.integration.status", false),
    field("authorizerIntegrationLatency", "$context.authorizer.integrationLatency", false),
    field("sourceIp", "$context.identity.sourceIp", false),
    field("userAgent", "$context.identity.userAgent", false),
    field("principalId", "$context.authorizer.principalId", false),
];

/// Render the single-line JSON template handed to the provider.
pub fn format() -> String {
    let parts: Vec<String> = FIELDS
        .iter()
        .map(|f| {
            if f.numeric {
                format!("\"{}\":{}", f.key, f.variable)
            } else {
                format!("\"{}\":\"{}\"", f.key, f.variable)
            }
        })
        .collect();
    format!("{{{}}}", parts.join(","))
}

/// How long log events are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    OneWeek,
    OneYear,
}

impl Retention {
    /// One year in production, one week everywhere else.
    pub fn for_stage(stage_name: &str) -> Self {
        if stage::is_production(stage_name) {
            Self::OneYear
        } else {
            Self::OneWeek
        }
    }

    pub fn days(&self) -> u32 {
        match self {
            Self::OneWeek => 7,
            Self::OneYear => 365,
        }
    }
}

/// Access log destination for the gate's stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessLog {
    pub log_group: String,
    pub retention: Retention,
    pub format: String,
}

impl AccessLog {
    pub fn new(log_group: String, stage_name: &str) -> Self {
        Self {
            log_group,
            retention: Retention::for_stage(stage_name),
            format: format(),
        }
    }
}
