//! Operation resolution from HTTP requests.
//!
//! This module provides the [`PathRouter`] which maps incoming HTTP requests
//! (method + path) to contract operations.

use std::collections::HashMap;
use std::sync::Arc;

use covenant_core::coerce::coerce_parameter;
use covenant_core::{
    Contract, Operation, OperationMatch, OperationResolver, ParameterLocation, ParameterSet,
    RawPathParams, ValidationError, ValidatorOptions,
};
use http::Method;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::error::RouterError;

/// Resolves HTTP requests to contract operations.
///
/// The router builds a routing table from the contract and provides path
/// matching with parameter extraction. Methods compare case-insensitively
/// and a single trailing slash is ignored.
#[derive(Debug)]
pub struct PathRouter {
    /// Routes indexed by uppercase HTTP method.
    routes: HashMap<String, Vec<CompiledRoute>>,
}

/// A compiled route for efficient matching.
#[derive(Debug)]
struct CompiledRoute {
    /// Original path template.
    template: String,
    /// Regex for matching paths.
    pattern: Regex,
    /// Parameter names in capture order.
    param_names: Vec<String>,
    /// The operation this route leads to.
    operation: Arc<Operation>,
}

impl PathRouter {
    /// Creates a router for every operation of `contract`.
    pub fn new(contract: &Contract) -> Result<Self, RouterError> {
        let mut routes: HashMap<String, Vec<CompiledRoute>> = HashMap::new();

        for op in contract.operations() {
            if op.path.is_empty() {
                continue;
            }

            let (pattern, param_names) = compile_path(&op.path)?;
            routes
                .entry(op.method.as_str().to_ascii_uppercase())
                .or_default()
                .push(CompiledRoute {
                    template: op.path.clone(),
                    pattern,
                    param_names,
                    operation: Arc::clone(op),
                });
        }

        // More specific paths first
        for method_routes in routes.values_mut() {
            method_routes.sort_by(|a, b| route_specificity(&a.template, &b.template));
        }

        debug!(
            methods = routes.len(),
            total_routes = routes.values().map(Vec::len).sum::<usize>(),
            "operation router initialized"
        );

        Ok(Self { routes })
    }

    /// Check if a route exists for the given method and path.
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.resolve(method, path).is_some()
    }

    /// Get all routes for a specific method, most specific first.
    pub fn routes_for_method(&self, method: &Method) -> Vec<&str> {
        self.routes
            .get(&method.as_str().to_ascii_uppercase())
            .map(|routes| routes.iter().map(|r| r.template.as_str()).collect())
            .unwrap_or_default()
    }
}

impl OperationResolver for PathRouter {
    fn resolve(&self, method: &Method, path: &str) -> Option<OperationMatch> {
        let routes = self.routes.get(&method.as_str().to_ascii_uppercase())?;

        routes.iter().find_map(|route| {
            let captures = route.pattern.captures(path)?;
            let path_params: RawPathParams = route
                .param_names
                .iter()
                .enumerate()
                .filter_map(|(i, name)| {
                    captures
                        .get(i + 1)
                        .map(|value| (name.clone(), value.as_str().to_string()))
                })
                .collect();
            Some(OperationMatch::new(Arc::clone(&route.operation), path_params))
        })
    }

    fn coerce_path_params(
        &self,
        matched: &OperationMatch,
        _options: &ValidatorOptions,
    ) -> Result<ParameterSet, ValidationError> {
        let mut params = ParameterSet::new();

        for (name, raw) in &matched.path_params {
            let decoded = urlencoding::decode(raw)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| raw.clone());

            let value = match matched.operation.parameter(name, ParameterLocation::Path) {
                Some(spec) => coerce_parameter(&Value::String(decoded.clone()), spec)
                    .map_err(|failure| ValidationError::coercion(name, failure.expected, decoded))?,
                None => Value::String(decoded),
            };
            params.insert(name, value);
        }

        Ok(params)
    }
}

fn compile_path(template: &str) -> Result<(Regex, Vec<String>), RouterError> {
    let invalid = |reason: &str| RouterError::InvalidTemplate {
        template: template.to_string(),
        reason: reason.to_string(),
    };

    let mut pattern = String::from("^");
    let mut param_names = Vec::new();

    for segment in template.split('/') {
        if segment.is_empty() {
            continue;
        }

        pattern.push('/');

        // A segment may mix literals and placeholders, e.g. `{name}.{ext}`
        let mut rest = segment;
        while let Some(open) = rest.find('{') {
            pattern.push_str(&regex::escape(&rest[..open]));
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| invalid("unterminated '{'"))?;
            let name = &rest[open + 1..close];
            if name.is_empty() {
                return Err(invalid("empty parameter name"));
            }
            param_names.push(name.to_string());
            pattern.push_str("([^/]+?)");
            rest = &rest[close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
    }

    if template == "/" {
        pattern = String::from("^/$");
    } else {
        pattern.push_str("/?$");
    }

    let regex = Regex::new(&pattern).map_err(|source| RouterError::Pattern {
        template: template.to_string(),
        source,
    })?;
    Ok((regex, param_names))
}

/// More specific routes (fewer parameters, longer literals) sort first.
fn route_specificity(a: &str, b: &str) -> std::cmp::Ordering {
    let a_params = a.matches('{').count();
    let b_params = b.matches('{').count();

    if a_params != b_params {
        return a_params.cmp(&b_params);
    }

    b.len().cmp(&a.len())
}
