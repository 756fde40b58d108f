//! Route table: maps (path template, method) to a function alias.
//!
//! Entries are appended as endpoints are provisioned. Resolution picks the
//! most specific matching template: reading left to right, the first
//! segment where two candidates differ decides, and a literal beats a
//! parameter there. The order entries were registered in never changes
//! which alias serves a request.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use topo_core::{AliasRef, HttpMethod, ResourceId, ServiceContext, TopologyError, TopologyResult};

/// One routed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteEntry {
    pub path: String,
    pub method: HttpMethod,
    pub alias: AliasRef,
    /// Authorizer guarding this route; `None` only for routes that opt out.
    pub authorizer: Option<ResourceId>,
}

impl RouteEntry {
    pub fn is_protected(&self) -> bool {
        self.authorizer.is_some()
    }
}

/// Ordered (path, method, alias) entries with unique (path, method) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteTable {
    authorizer: ResourceId,
    entries: Vec<RouteEntry>,
}

impl RouteTable {
    /// New table whose routes are all guarded by `authorizer`.
    pub fn new(authorizer: ResourceId) -> Self {
        Self {
            authorizer,
            entries: Vec::new(),
        }
    }

    /// Register one route. Rejects malformed paths and duplicate
    /// (path, method) pairs.
    pub fn register(
        &mut self,
        ctx: &ServiceContext,
        path: &str,
        method: HttpMethod,
        alias: AliasRef,
    ) -> TopologyResult<()> {
        let route = format!("{method} {path}");
        validate_path(path)
            .map_err(|reason| TopologyError::provisioning(&route, ctx.stage(), reason))?;

        let wanted = shape(path);
        if self
            .entries
            .iter()
            .any(|e| e.method == method && shape(&e.path) == wanted)
        {
            return Err(TopologyError::provisioning(
                &route,
                ctx.stage(),
                "route already registered",
            ));
        }

        debug!(%route, alias = %alias, "route registered");
        self.entries.push(RouteEntry {
            path: path.to_string(),
            method,
            alias,
            authorizer: Some(self.authorizer.clone()),
        });
        Ok(())
    }

    pub fn entries(&self) -> &[RouteEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find the entry serving a concrete request path.
    pub fn resolve(&self, method: HttpMethod, path: &str) -> Option<&RouteEntry> {
        let request: Vec<&str> = segments(path).collect();
        self.entries
            .iter()
            .filter(|e| e.method == method)
            .filter_map(|e| match_template(&e.path, &request).map(|key| (key, e)))
            .min_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, e)| e)
    }

    /// Methods registered for the template matching `path`. Empty when no
    /// route matches, in which case a preflight is rejected.
    pub fn allowed_methods(&self, path: &str) -> BTreeSet<HttpMethod> {
        let request: Vec<&str> = segments(path).collect();
        self.entries
            .iter()
            .filter(|e| match_template(&e.path, &request).is_some())
            .map(|e| e.method)
            .collect()
    }

    /// Every resource node of the gate's path tree, parents included.
    pub fn resources(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        for entry in &self.entries {
            let mut prefix = String::new();
            for seg in segments(&entry.path) {
                prefix.push('/');
                prefix.push_str(seg);
                out.insert(prefix.clone());
            }
        }
        out
    }
}

fn segments(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

fn is_param(segment: &str) -> bool {
    segment.len() > 2 && segment.starts_with('{') && segment.ends_with('}')
}

/// Template with parameter names erased, so `/a/{x}` and `/a/{y}` collide.
fn shape(path: &str) -> Vec<&str> {
    segments(path)
        .map(|seg| if is_param(seg) { "{}" } else { seg })
        .collect()
}

fn validate_path(path: &str) -> Result<(), String> {
    if !path.starts_with('/') {
        return Err("path must start with '/'".to_string());
    }
    if path.len() > 1 && path.ends_with('/') {
        return Err("path must not end with '/'".to_string());
    }
    if path == "/" {
        return Ok(());
    }
    for seg in path[1..].split('/') {
        if seg.is_empty() {
            return Err("path contains an empty segment".to_string());
        }
        if (seg.contains('{') || seg.contains('}')) && !is_param(seg) {
            return Err(format!("malformed path parameter {seg:?}"));
        }
    }
    Ok(())
}

/// Specificity of a matched template. Orders most specific first.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
struct Specificity {
    /// One flag per segment, `true` for a parameter. Compared
    /// lexicographically, so a literal wins at the first differing segment.
    params_at: Vec<bool>,
    params: usize,
}

/// Match a template against request segments.
fn match_template(template: &str, request: &[&str]) -> Option<Specificity> {
    let tmpl: Vec<&str> = segments(template).collect();
    if tmpl.len() != request.len() {
        return None;
    }
    let mut params_at = Vec::with_capacity(tmpl.len());
    for (t, r) in tmpl.iter().zip(request) {
        let param = is_param(t);
        if !param && t != r {
            return None;
        }
        params_at.push(param);
    }
    let params = params_at.iter().filter(|p| **p).count();
    Some(Specificity { params_at, params })
}

#[cfg(test)]
mod tests {
    use super::*;
    use topo_core::roles;

    fn ctx() -> ServiceContext {
        ServiceContext::new("users", "staging", "1", "eu-west-1").unwrap()
    }

    fn alias(ctx: &ServiceContext, name: &str) -> AliasRef {
        AliasRef {
            function: ctx.derive(roles::FUNCTION, Some(name)).unwrap(),
            alias: "LIVE".to_string(),
        }
    }

    fn table() -> RouteTable {
        RouteTable::new(ctx().derive(roles::AUTHORIZER, None).unwrap())
    }

    #[test]
    fn resolves_templates() {
        let ctx = ctx();
        let mut routes = table();
        routes.register(&ctx, "/v1/users", HttpMethod::Get, alias(&ctx, "list-users")).unwrap();
        routes.register(&ctx, "/v1/users/{userId}", HttpMethod::Get, alias(&ctx, "get-user")).unwrap();

        let hit = routes.resolve(HttpMethod::Get, "/v1/users/42").unwrap();
        assert_eq!(hit.alias, alias(&ctx, "get-user"));
        assert!(hit.is_protected());

        let hit = routes.resolve(HttpMethod::Get, "/v1/users").unwrap();
        assert_eq!(hit.alias, alias(&ctx, "list-users"));

        assert!(routes.resolve(HttpMethod::Post, "/v1/users").is_none());
        assert!(routes.resolve(HttpMethod::Get, "/v1/users/42/extra").is_none());
    }

    #[test]
    fn literal_beats_parameter_regardless_of_order() {
        let ctx = ctx();
        for reversed in [false, true] {
            let mut routes = table();
            let mut regs = vec![
                ("/v1/users/{userId}", alias(&ctx, "get-user")),
                ("/v1/users/me", alias(&ctx, "get-me")),
            ];
            if reversed {
                regs.reverse();
            }
            for (path, a) in regs {
                routes.register(&ctx, path, HttpMethod::Get, a).unwrap();
            }
            let hit = routes.resolve(HttpMethod::Get, "/v1/users/me").unwrap();
            assert_eq!(hit.alias, alias(&ctx, "get-me"));
        }

        // Equal parameter counts: the earlier literal segment decides.
        for reversed in [false, true] {
            let mut routes = table();
            let mut regs = vec![
                ("/v1/users/{userId}", alias(&ctx, "get-user")),
                ("/v1/{group}/me", alias(&ctx, "group-me")),
            ];
            if reversed {
                regs.reverse();
            }
            for (path, a) in regs {
                routes.register(&ctx, path, HttpMethod::Get, a).unwrap();
            }
            let hit = routes.resolve(HttpMethod::Get, "/v1/users/me").unwrap();
            assert_eq!(hit.alias, alias(&ctx, "get-user"), "reversed={reversed}");
            let hit = routes.resolve(HttpMethod::Get, "/v1/teams/me").unwrap();
            assert_eq!(hit.alias, alias(&ctx, "group-me"), "reversed={reversed}");
        }
    }

    #[test]
    fn duplicate_path_method_rejected() {
        let ctx = ctx();
        let mut routes = table();
        routes.register(&ctx, "/v1/users", HttpMethod::Get, alias(&ctx, "a")).unwrap();
        let err = routes
            .register(&ctx, "/v1/users", HttpMethod::Get, alias(&ctx, "b"))
            .unwrap_err();
        assert!(matches!(err, TopologyError::Provisioning { .. }));
        assert!(routes
            .register(&ctx, "/v1/users/{id}", HttpMethod::Get, alias(&ctx, "d"))
            .is_ok());
        // Same shape under another parameter name is still a duplicate.
        assert!(routes
            .register(&ctx, "/v1/users/{userId}", HttpMethod::Get, alias(&ctx, "e"))
            .is_err());
        // Same path, other method is fine.
        routes.register(&ctx, "/v1/users", HttpMethod::Post, alias(&ctx, "c")).unwrap();
        assert_eq!(routes.len(), 3);
    }

    #[test]
    fn malformed_paths_rejected() {
        let ctx = ctx();
        for path in ["v1/users", "/v1//users", "/v1/users/", "/v1/{userId", "/v1/{}"] {
            let mut routes = table();
            assert!(
                routes.register(&ctx, path, HttpMethod::Get, alias(&ctx, "a")).is_err(),
                "{path}"
            );
        }
    }

    #[test]
    fn resource_tree_and_methods() {
        let ctx = ctx();
        let mut routes = table();
        routes.register(&ctx, "/v1/users", HttpMethod::Get, alias(&ctx, "a")).unwrap();
        routes.register(&ctx, "/v1/users/{userId}", HttpMethod::Put, alias(&ctx, "b")).unwrap();
        routes.register(&ctx, "/v1/users/{userId}", HttpMethod::Delete, alias(&ctx, "c")).unwrap();

        let resources: Vec<_> = routes.resources().into_iter().collect();
        assert_eq!(resources, ["/v1", "/v1/users", "/v1/users/{userId}"]);

        let methods = routes.allowed_methods("/v1/users/7");
        assert_eq!(methods, BTreeSet::from([HttpMethod::Put, HttpMethod::Delete]));
        assert!(routes.allowed_methods("/v2").is_empty());
    }
}
