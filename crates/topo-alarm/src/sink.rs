//! Notification sink: the one topic every alarm publishes to.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use topo_core::{ResourceId, ServiceContext, TopologyError, TopologyResult, roles};

/// Delivery protocol of a human-facing subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Https,
    Email,
}

/// A human-facing channel attached to the sink.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    pub id: ResourceId,
    pub protocol: Protocol,
    pub endpoint: String,
}

/// Fan-out point for alarm state changes. One per topology.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSink {
    id: ResourceId,
    subscription: Option<Subscription>,
}

impl NotificationSink {
    pub fn create(ctx: &ServiceContext) -> TopologyResult<Self> {
        let id = ctx.derive(roles::SINK, None)?;
        debug!(sink = %id, "notification sink planned");
        Ok(Self {
            id,
            subscription: None,
        })
    }

    pub fn id(&self) -> &ResourceId {
        &self.id
    }

    pub fn subscription(&self) -> Option<&Subscription> {
        self.subscription.as_ref()
    }

    /// Attach the human-facing subscription. A sink carries at most one.
    pub fn subscribe(&mut self, ctx: &ServiceContext, target: &str) -> TopologyResult<&Subscription> {
        if self.subscription.is_some() {
            return Err(TopologyError::provisioning(
                self.id.as_str(),
                ctx.stage(),
                "sink already has a subscription",
            ));
        }
        let protocol = protocol_for(target).ok_or_else(|| {
            TopologyError::provisioning(
                self.id.as_str(),
                ctx.stage(),
                format!("subscription target {target:?} is neither an https URL nor an email address"),
            )
        })?;
        let id = ctx.derive(roles::SUBSCRIPTION, None)?;
        info!(sink = %self.id, ?protocol, "subscription attached");
        Ok(self.subscription.insert(Subscription {
            id,
            protocol,
            endpoint: target.to_string(),
        }))
    }
}

fn protocol_for(target: &str) -> Option<Protocol> {
    if let Some(rest) = target.strip_prefix("https://") {
        return (!rest.is_empty()).then_some(Protocol::Https);
    }
    let (local, domain) = target.split_once('@')?;
    let valid = !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !target.contains(char::is_whitespace);
    valid.then_some(Protocol::Email)
}
