//! topo-gate: the single request-routing front door.
//!
//! The gate authorizes every request through an external hook, answers CORS
//! preflights for any origin, writes a structured JSON access log, shapes
//! 401/403 rejections into CORS-compliant bodies, and raises one
//! service-wide alarm on server errors.
//!
//! # Components
//!
//! - **`authorizer`**: request authorizer and resource policy
//! - **`cors`**: wide-open cross-origin policy
//! - **`access_log`**: field set, JSON format, and retention
//! - **`responses`**: canned gateway responses and the error body
//! - **`routes`**: the route table and request path resolution
//! - **`gate`**: [`assemble`], route freezing, and base-path mapping

pub mod access_log;
pub mod authorizer;
pub mod cors;
pub mod gate;
pub mod responses;
pub mod routes;

pub use access_log::{AccessLog, Retention};
pub use authorizer::{Authorizer, PolicyStatement, ResourcePolicy};
pub use cors::CorsPolicy;
pub use gate::{BasePathMapping, Gate, assemble};
pub use responses::{ErrorBody, GatewayResponse, ResponseType};
pub use routes::{RouteEntry, RouteTable};
