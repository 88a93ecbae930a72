//! Role-based filtering of the route tree and the guard run before every navigation.

use std::sync::Arc;

use store::models::route::RouteNode;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{account::UserSession, notification::Notifier};

pub const NOT_FOUND_ROUTE: &str = "notfound";
pub const LOGIN_ROUTE: &str = "login";

/// A route without `meta.roles` is open to everyone; otherwise any shared role grants access.
pub fn has_permission(route: &RouteNode, roles: &[String]) -> bool {
    match route.required_roles() {
        Some(required) => roles.iter().any(|role| required.contains(role)),
        None => true,
    }
}

/// Keep the routes `roles` may access, in order. A denied route takes its subtree with it.
pub fn filter_async_routes(routes: &[RouteNode], roles: &[String]) -> Vec<RouteNode> {
    routes
        .iter()
        .filter(|route| has_permission(route, roles))
        .map(|route| {
            let mut kept = route.clone();
            if let Some(children) = &route.children {
                kept.children = Some(filter_async_routes(children, roles));
            }
            kept
        })
        .collect()
}

/// Routes produced for one user.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneratedRoutes {
    /// Permitted async routes, to be added to the live router.
    pub added: Vec<RouteNode>,
    /// Constant routes, then `added`, then the not-found fallback.
    pub routes: Vec<RouteNode>,
}

/// The application's route table: always-present routes, role-gated routes registered by
/// feature modules, and the catch-all not-found route.
#[derive(Debug, Clone)]
pub struct RouteTable {
    constant: Vec<RouteNode>,
    async_routes: Vec<RouteNode>,
    not_found: Vec<RouteNode>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    pub fn new() -> Self {
        let constant = vec![
            RouteNode::new("/redirect")
                .hidden()
                .allow_anonymous()
                .with_children(vec![RouteNode::new("/redirect/:path*")]),
            RouteNode::new("/login/")
                .named(LOGIN_ROUTE)
                .hidden()
                .allow_anonymous(),
        ];
        let mut not_found = RouteNode::new("*")
            .named(NOT_FOUND_ROUTE)
            .hidden()
            .allow_anonymous();
        not_found.redirect = Some("/404/".to_string());

        Self::with_routes(constant, vec![not_found])
    }

    pub fn with_routes(constant: Vec<RouteNode>, not_found: Vec<RouteNode>) -> Self {
        Self {
            constant,
            async_routes: Vec::new(),
            not_found,
        }
    }

    /// Append a feature module's routes. Must happen before routes are generated.
    pub fn register_routes(&mut self, routes: Vec<RouteNode>) {
        debug!(count = routes.len(), "registering async routes");
        self.async_routes.extend(routes);
    }

    pub fn async_routes(&self) -> &[RouteNode] {
        &self.async_routes
    }

    pub fn generate_routes(&self, roles: &[String]) -> GeneratedRoutes {
        let added = filter_async_routes(&self.async_routes, roles);
        let routes = self
            .constant
            .iter()
            .chain(&added)
            .chain(&self.not_found)
            .cloned()
            .collect();
        GeneratedRoutes { added, routes }
    }
}

/// What the router should do with a pending navigation.
#[derive(Debug, Clone, PartialEq)]
pub enum Navigation {
    Proceed,
    NotFound,
    Login { redirect: String },
    /// User info was just loaded: add these routes and resolve the target again.
    Reload { added_routes: Vec<RouteNode> },
    /// The navigation is abandoned; the user has been told.
    NetworkError,
}

pub struct NavigationGuard {
    session: Arc<UserSession>,
    table: Arc<RouteTable>,
    notifier: Arc<dyn Notifier>,
    routes: RwLock<GeneratedRoutes>,
}

impl NavigationGuard {
    pub fn new(
        session: Arc<UserSession>,
        table: Arc<RouteTable>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            session,
            table,
            notifier,
            routes: RwLock::new(GeneratedRoutes::default()),
        }
    }

    /// The last routes generated for the signed-in user.
    pub async fn routes(&self) -> GeneratedRoutes {
        self.routes.read().await.clone()
    }

    pub async fn before_each(&self, target: &RouteNode) -> Navigation {
        if self.session.authenticated().await {
            let roles = self.session.roles().await;
            if has_permission(target, &roles) {
                return Navigation::Proceed;
            }
            debug!(path = %target.path, "route not permitted");
            return Navigation::NotFound;
        }

        if target.is_anonymous() {
            return Navigation::Proceed;
        }

        match self.session.get_user_info().await {
            Ok(info) => {
                let generated = self.table.generate_routes(&self.session.roles().await);
                info!(
                    username = %info.username,
                    added = generated.added.len(),
                    "routes generated"
                );
                let added_routes = generated.added.clone();
                *self.routes.write().await = generated;
                Navigation::Reload { added_routes }
            }
            Err(e) if e.is_unauthorized() => Navigation::Login {
                redirect: target.path.clone(),
            },
            Err(e) => {
                warn!(path = %target.path, error = %e, "could not load user info");
                self.notifier.error("network error");
                Navigation::NetworkError
            }
        }
    }
}
