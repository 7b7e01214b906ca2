//! Render-time enforcement.
//!
//! Every time a location is rendered it goes through [`resolve_location`],
//! which applies the router rules (login bounce, catch-all) and the route
//! guard. The guard decides from [`authorize`], the same predicate the
//! navigator uses, so the two cannot drift apart.

use tracing::debug;

use crate::access::{authorize, Access};
use crate::auth::User;
use crate::routes::{Params, RouteDescriptor, RouteName, RouteTable};

/// Upper bound on chained redirects for one render.
const MAX_REDIRECTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Render,
    Redirect(RouteName),
}

/// Unauthenticated viewers go to login, under-permissioned ones to 403.
pub fn guard(user: Option<&User>, route: &RouteDescriptor) -> GuardDecision {
    match authorize(user, route) {
        Access::Granted => GuardDecision::Render,
        Access::Unauthenticated => GuardDecision::Redirect(RouteName::Login),
        Access::Forbidden => GuardDecision::Redirect(RouteName::Forbidden),
    }
}

/// Where a requested path ends up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub route: &'static RouteDescriptor,
    pub params: Params,
    /// Final concrete path.
    pub path: String,
    /// Paths left behind on the way, in order.
    pub redirected_from: Vec<String>,
}

impl Resolution {
    pub fn was_redirected(&self) -> bool {
        !self.redirected_from.is_empty()
    }
}

/// Resolves `path` to the route that will actually render for `user`.
///
/// Rules, applied until a route renders:
/// - an unknown path goes to `/404` when logged in, else `/login`;
/// - `/login` while logged in goes to `/`;
/// - otherwise the route guard decides.
///
/// # Panics
///
/// If the table produces a redirect cycle.
pub fn resolve_location(table: &RouteTable, user: Option<&User>, path: &str) -> Resolution {
    let mut current = path.to_string();
    let mut redirected_from = Vec::new();

    for _ in 0..MAX_REDIRECTS {
        let target = match table.match_path(&current) {
            None if user.is_some() => RouteName::NotFound,
            None => RouteName::Login,
            Some(m) if m.route.name == RouteName::Login && user.is_some() => RouteName::Dashboard,
            Some(m) => match guard(user, m.route) {
                GuardDecision::Render => {
                    return Resolution {
                        route: m.route,
                        params: m.params,
                        path: current,
                        redirected_from,
                    }
                }
                GuardDecision::Redirect(target) => target,
            },
        };
        let next = table.get(target).path.to_string();
        debug!(from = %current, to = %next, "redirect");
        redirected_from.push(std::mem::replace(&mut current, next));
    }

    panic!("redirect loop while resolving '{path}': {redirected_from:?}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::permissions::Permission;

    fn table() -> RouteTable {
        RouteTable::standard()
    }

    #[test]
    fn guard_redirects() {
        let t = table();
        let posts = t.get(RouteName::Posts);
        assert_eq!(guard(None, posts), GuardDecision::Redirect(RouteName::Login));
        let nobody = User::new("n", [Permission::EditPost]);
        assert_eq!(
            guard(Some(&nobody), posts),
            GuardDecision::Redirect(RouteName::Forbidden)
        );
        assert_eq!(guard(Some(&User::demo()), posts), GuardDecision::Render);
    }

    #[test]
    fn logged_out_root_goes_to_login() {
        let r = resolve_location(&table(), None, "/");
        assert_eq!(r.route.name, RouteName::Login);
        assert_eq!(r.path, "/login");
        assert_eq!(r.redirected_from, vec!["/"]);
    }

    #[test]
    fn login_bounces_authenticated_user_home() {
        let user = User::demo();
        let r = resolve_location(&table(), Some(&user), "/login");
        assert_eq!(r.route.name, RouteName::Dashboard);
        assert_eq!(r.path, "/");
    }

    #[test]
    fn unknown_paths_depend_on_login() {
        let t = table();
        assert_eq!(resolve_location(&t, None, "/x/y").path, "/login");
        let user = User::demo();
        assert_eq!(resolve_location(&t, Some(&user), "/x/y").path, "/404");
    }

    #[test]
    fn under_permissioned_goes_to_403() {
        let user = User::demo();
        let r = resolve_location(&table(), Some(&user), "/posts/create");
        assert_eq!(r.route.name, RouteName::Forbidden);
        assert_eq!(r.redirected_from, vec!["/posts/create"]);
    }

    #[test]
    fn permitted_path_keeps_params() {
        let user = User::demo();
        let r = resolve_location(&table(), Some(&user), "/posts/5/comments");
        assert!(!r.was_redirected());
        assert_eq!(r.route.name, RouteName::PostComments);
        assert_eq!(r.params.get("id"), Some("5"));
    }

    #[test]
    fn user_without_dashboard_rights_lands_on_403() {
        let reader = User::new("reader", [Permission::ViewPosts]);
        let r = resolve_location(&table(), Some(&reader), "/login");
        assert_eq!(r.redirected_from, vec!["/login", "/"]);
        assert_eq!(r.path, "/403");
    }
}
