//! The navigator and the render-time guard must reach the same verdict for
//! every user and every route.

use std::sync::Arc;

use proptest::prelude::*;

use postboard::{
    guard, resolve_location, GuardDecision, MemoryHistory, NavigationError, Navigator, Params,
    Permission, PermissionSet, RecordingNotifier, RouteName, RouteTable, User, ROUTES,
};

/// All 16 subsets of the permission set.
fn power_set() -> Vec<PermissionSet> {
    (0u8..16)
        .map(|mask| {
            Permission::ALL
                .iter()
                .enumerate()
                .filter(|(bit, _)| mask & (1 << bit) != 0)
                .map(|(_, p)| *p)
                .collect()
        })
        .collect()
}

fn users() -> Vec<Option<User>> {
    std::iter::once(None)
        .chain(power_set().into_iter().map(|set| Some(User::new("u", set))))
        .collect()
}

fn navigator_for(user: Option<User>) -> (Navigator, Arc<MemoryHistory>) {
    let history = Arc::new(MemoryHistory::new("/start"));
    let navigator = Navigator::new(
        RouteTable::standard(),
        Arc::new(move || user.clone()),
        history.clone(),
        Arc::new(RecordingNotifier::new()),
    );
    (navigator, history)
}

fn params() -> Params {
    Params::new().with("id", 1)
}

#[tokio::test]
async fn go_agrees_with_guard_for_every_user_and_route() {
    for user in users() {
        let (navigator, history) = navigator_for(user.clone());
        for route in ROUTES.iter() {
            let rendered = guard(user.as_ref(), route) == GuardDecision::Render;
            assert_eq!(navigator.can_go(route.name), rendered, "{:?} {}", user, route.name);

            let before = history.entries().len();
            match navigator.go(route.name, &params()).await {
                Ok(path) => {
                    assert!(rendered, "go allowed {} for {:?}", route.name, user);
                    assert_eq!(path, route.path_for(&params()));
                    assert_eq!(history.entries().len(), before + 1);
                }
                Err(NavigationError::Denied { .. }) => {
                    assert!(!rendered, "go refused {} for {:?}", route.name, user);
                    assert_eq!(history.entries().len(), before);
                }
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }
}

#[test]
fn public_routes_render_for_everyone() {
    for user in users() {
        for route in ROUTES.iter().filter(|r| r.public) {
            assert_eq!(guard(user.as_ref(), route), GuardDecision::Render);
        }
    }
}

fn any_user() -> impl Strategy<Value = Option<User>> {
    proptest::option::of(
        proptest::collection::btree_set(proptest::sample::select(Permission::ALL.to_vec()), 0..=4)
            .prop_map(|set| User::new("p", set.into_iter().collect::<PermissionSet>())),
    )
}

proptest! {
    /// Typing a route's path renders that route exactly when navigation to
    /// it would be allowed (login is bounced home for signed-in users).
    #[test]
    fn location_renders_iff_navigation_allowed(
        user in any_user(),
        index in 0..ROUTES.len(),
        id in 1u64..1000,
    ) {
        let route = &ROUTES[index];
        prop_assume!(!(route.name == RouteName::Login && user.is_some()));

        let table = RouteTable::standard();
        let path = route.path_for(&Params::new().with("id", id));
        let resolution = resolve_location(&table, user.as_ref(), &path);

        let (navigator, _) = navigator_for(user.clone());
        let allowed = navigator.can_go(route.name);
        prop_assert_eq!(resolution.route.name == route.name, allowed);
        if !allowed {
            let expected = if user.is_none() { RouteName::Login } else { RouteName::Forbidden };
            prop_assert_eq!(resolution.route.name, expected);
        }
    }
}
