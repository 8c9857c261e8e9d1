use axum::http::{header::USER_AGENT, Request};

/// User agent sent by AWS load balancer health checks
pub const ELB_HEALTH_CHECKER: &str = "ELB-HealthChecker";

/// Liveness route that is never logged
pub const STATUS_ROUTE: &str = "/status";

/// Decides which requests are left out of the request log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthCheckFilter {
    user_agent_patterns: Vec<String>,
    ignored_routes: Vec<String>,
}

impl Default for HealthCheckFilter {
    fn default() -> Self {
        Self {
            user_agent_patterns: vec![ELB_HEALTH_CHECKER.to_string()],
            ignored_routes: vec![STATUS_ROUTE.to_string()],
        }
    }
}

impl HealthCheckFilter {
    pub fn new(user_agent_patterns: Vec<String>, ignored_routes: Vec<String>) -> Self {
        Self {
            user_agent_patterns,
            ignored_routes,
        }
    }

    /// Parse a comma separated list of user agent patterns.
    ///
    /// Blank entries are dropped; an unset or blank value keeps the default.
    pub fn from_patterns(value: Option<&str>) -> Self {
        let patterns: Vec<String> = value
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|pattern| !pattern.is_empty())
            .map(str::to_owned)
            .collect();

        if patterns.is_empty() {
            return Self::default();
        }

        Self {
            user_agent_patterns: patterns,
            ..Self::default()
        }
    }

    pub fn user_agent_patterns(&self) -> &[String] {
        &self.user_agent_patterns
    }

    pub fn is_health_check(&self, user_agent: Option<&str>) -> bool {
        user_agent.is_some_and(|agent| {
            self.user_agent_patterns
                .iter()
                .any(|pattern| agent.contains(pattern.as_str()))
        })
    }

    pub fn is_ignored_route(&self, path: &str) -> bool {
        self.ignored_routes.iter().any(|route| route == path)
    }

    pub fn should_skip<B>(&self, request: &Request<B>) -> bool {
        let user_agent = request
            .headers()
            .get(USER_AGENT)
            .and_then(|v| v.to_str().ok());

        self.is_health_check(user_agent) || self.is_ignored_route(request.uri().path())
    }
}
