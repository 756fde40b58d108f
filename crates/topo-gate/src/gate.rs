//! Gate assembly, route freezing, and the custom-domain base-path mapping.

use serde::{Deserialize, Serialize};
use tracing::info;

use topo_alarm::{HealthAlarm, MetricSource, NotificationSink, ThresholdSpec, bind};
use topo_core::{ResourceId, ServiceContext, TopologyError, TopologyResult, roles};

use crate::access_log::AccessLog;
use crate::authorizer::{Authorizer, ResourcePolicy};
use crate::cors::CorsPolicy;
use crate::responses::GatewayResponse;
use crate::routes::RouteTable;

/// Name of the single deployed stage snapshot.
pub const STAGE_NAME: &str = "LIVE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndpointType {
    Regional,
}

/// Maps `{stage}-api.{domain}/{base_path}` onto the deployed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BasePathMapping {
    pub id: ResourceId,
    pub domain_name: String,
    pub base_path: String,
    pub gateway: ResourceId,
    pub stage: String,
    pub certificate_ref: String,
}

impl BasePathMapping {
    /// Mapping for continuously-delivered stages; `None` for any other.
    pub fn for_stage(
        ctx: &ServiceContext,
        gate: &Gate,
        domain: Option<&str>,
        base_path: &str,
        certificate_ref: &str,
    ) -> TopologyResult<Option<Self>> {
        if !ctx.is_continuously_delivered() {
            return Ok(None);
        }
        let id = ctx.derive(roles::MAPPING, None)?;
        let domain = domain.filter(|d| !d.is_empty()).ok_or_else(|| {
            TopologyError::provisioning(id.as_str(), ctx.stage(), "no API domain configured")
        })?;
        if base_path.is_empty() || base_path.contains('/') {
            return Err(TopologyError::provisioning(
                id.as_str(),
                ctx.stage(),
                format!("base path {base_path:?} must be a single non-empty segment"),
            ));
        }
        Ok(Some(Self {
            id,
            domain_name: format!("{}-api.{domain}", ctx.stage()),
            base_path: base_path.to_string(),
            gateway: gate.id.clone(),
            stage: gate.stage_name.clone(),
            certificate_ref: certificate_ref.to_string(),
        }))
    }
}

/// The front door.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Gate {
    pub id: ResourceId,
    pub endpoint_type: EndpointType,
    pub stage_name: String,
    pub tracing_enabled: bool,
    pub authorizer: Authorizer,
    pub policy: ResourcePolicy,
    pub cors: CorsPolicy,
    pub access_log: AccessLog,
    pub responses: Vec<GatewayResponse>,
    pub alarm: HealthAlarm,
    routes: Option<RouteTable>,
    base_path: Option<BasePathMapping>,
}

/// Build the gate and the empty route table endpoints register into.
pub fn assemble(
    ctx: &ServiceContext,
    sink: &NotificationSink,
    authorizer_ref: &str,
) -> TopologyResult<(Gate, RouteTable)> {
    let id = ctx.derive(roles::GATE, None)?;
    let authorizer = Authorizer::request(ctx, authorizer_ref)?;
    let log_group = format!("/aws/api-gateway/{}", ctx.derive(roles::LOGS, None)?);

    let alarm = bind(
        ctx,
        ctx.derive(roles::ALARM, None)?,
        "500 errors > 0",
        MetricSource::GatewayServerErrors {
            gateway: id.clone(),
            stage: STAGE_NAME.to_string(),
        },
        ThresholdSpec::any_error(),
        sink,
    )?;

    let routes = RouteTable::new(authorizer.id.clone());
    let gate = Gate {
        id,
        endpoint_type: EndpointType::Regional,
        stage_name: STAGE_NAME.to_string(),
        tracing_enabled: true,
        authorizer,
        policy: ResourcePolicy::allow_invoke_from_anyone(),
        cors: CorsPolicy::wide_open(),
        access_log: AccessLog::new(log_group, ctx.stage()),
        responses: vec![GatewayResponse::access_denied(), GatewayResponse::unauthorized()],
        alarm,
        routes: None,
        base_path: None,
    };

    info!(
        gate = %gate.id,
        retention_days = gate.access_log.retention.days(),
        "gate planned"
    );
    Ok((gate, routes))
}

impl Gate {
    /// Freeze the route table into the gate's deployed stage. Happens once.
    pub fn deploy(&mut self, ctx: &ServiceContext, routes: RouteTable) -> TopologyResult<()> {
        if self.routes.is_some() {
            return Err(TopologyError::provisioning(
                self.id.as_str(),
                ctx.stage(),
                "gate stage already deployed",
            ));
        }
        info!(gate = %self.id, routes = routes.len(), "gate stage deployed");
        self.routes = Some(routes);
        Ok(())
    }

    /// Attach the base-path mapping. The mapping binds to the deployed
    /// stage snapshot, so the stage must be deployed first.
    pub fn map_base_path(&mut self, ctx: &ServiceContext, mapping: BasePathMapping) -> TopologyResult<()> {
        if self.routes.is_none() {
            return Err(TopologyError::provisioning(
                mapping.id.as_str(),
                ctx.stage(),
                "base path mapped before the gate stage was deployed",
            ));
        }
        info!(domain = %mapping.domain_name, base_path = %mapping.base_path, "base path mapped");
        self.base_path = Some(mapping);
        Ok(())
    }

    pub fn routes(&self) -> Option<&RouteTable> {
        self.routes.as_ref()
    }

    pub fn base_path(&self) -> Option<&BasePathMapping> {
        self.base_path.as_ref()
    }

    pub fn is_deployed(&self) -> bool {
        self.routes.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_log::Retention;
    use crate::responses::ResponseType;

    const AUTHZ: &str = "arn:aws:lambda:eu-west-1:111122223333:function:authz";

    fn ctx(stage: &str) -> ServiceContext {
        ServiceContext::new("users", stage, "111122223333", "eu-west-1").unwrap()
    }

    #[test]
    fn gate_shape() {
        let ctx = ctx("production");
        let sink = NotificationSink::create(&ctx).unwrap();
        let (gate, routes) = assemble(&ctx, &sink, AUTHZ).unwrap();

        assert!(routes.is_empty());
        assert_eq!(gate.stage_name, "LIVE");
        assert_eq!(gate.access_log.retention, Retention::OneYear);
        assert_eq!(gate.access_log.log_group, "/aws/api-gateway/users-production-logs");
        assert_eq!(gate.cors.max_age_secs, 60);
        assert_eq!(gate.authorizer.cache_ttl_secs, 300);

        let types: Vec<_> = gate.responses.iter().map(|r| r.response_type).collect();
        assert_eq!(types, [ResponseType::AccessDenied, ResponseType::Unauthorized]);

        assert_eq!(gate.alarm.actions(), [sink.id().clone()]);
        assert!(matches!(gate.alarm.metric(), MetricSource::GatewayServerErrors { .. }));
        assert!(!gate.is_deployed());
    }

    #[test]
    fn ephemeral_retention_is_one_week() {
        let ctx = ctx("pr-4");
        let sink = NotificationSink::create(&ctx).unwrap();
        let (gate, _) = assemble(&ctx, &sink, AUTHZ).unwrap();
        assert_eq!(gate.access_log.retention, Retention::OneWeek);
    }

    #[test]
    fn bad_authorizer_aborts() {
        let ctx = ctx("staging");
        let sink = NotificationSink::create(&ctx).unwrap();
        assert!(assemble(&ctx, &sink, "not-an-arn").is_err());
    }

    #[test]
    fn mapping_requires_deployed_stage() {
        let ctx = ctx("staging");
        let sink = NotificationSink::create(&ctx).unwrap();
        let (mut gate, routes) = assemble(&ctx, &sink, AUTHZ).unwrap();
        let mapping = BasePathMapping::for_stage(&ctx, &gate, Some("example.com"), "user", "cert")
            .unwrap()
            .unwrap();
        assert_eq!(mapping.domain_name, "staging-api.example.com");

        assert!(gate.map_base_path(&ctx, mapping.clone()).is_err());
        gate.deploy(&ctx, routes.clone()).unwrap();
        gate.map_base_path(&ctx, mapping).unwrap();
        assert!(gate.base_path().is_some());

        assert!(gate.deploy(&ctx, routes).is_err());
    }

    #[test]
    fn no_mapping_for_ephemeral_stage() {
        let ctx = ctx("pr-123");
        let sink = NotificationSink::create(&ctx).unwrap();
        let (gate, _) = assemble(&ctx, &sink, AUTHZ).unwrap();
        let mapping = BasePathMapping::for_stage(&ctx, &gate, None, "user", "cert").unwrap();
        assert!(mapping.is_none());
    }

    #[test]
    fn delivery_stage_without_domain_fails() {
        let ctx = ctx("development");
        let sink = NotificationSink::create(&ctx).unwrap();
        let (gate, _) = assemble(&ctx, &sink, AUTHZ).unwrap();
        assert!(BasePathMapping::for_stage(&ctx, &gate, None, "user", "cert").is_err());
        assert!(BasePathMapping::for_stage(&ctx, &gate, Some("example.com"), "a/b", "cert").is_err());
    }
}
