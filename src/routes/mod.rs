//! Route table
//!
//! A fixed, ordered list of [`RouteDescriptor`]s. Every other layer reads it:
//! the navigator interpolates paths from it, the guard looks up requirements
//! in it, and the shell matches typed locations against it.
//!
//! Looking up a route that is not in the table is a definition bug and
//! panics.

pub mod pattern;

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::permissions::Permission;

pub use pattern::{interpolate, interpolate_strict, MissingParameter, Params};

/// Unique key of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteName {
    Login,
    Dashboard,
    Posts,
    Post,
    EditPost,
    PostComments,
    CreatePost,
    Forbidden,
    NotFound,
}

impl RouteName {
    pub fn as_str(&self) -> &'static str {
        match self {
            RouteName::Login => "login",
            RouteName::Dashboard => "dashboard",
            RouteName::Posts => "posts",
            RouteName::Post => "post",
            RouteName::EditPost => "editPost",
            RouteName::PostComments => "postComments",
            RouteName::CreatePost => "createPost",
            RouteName::Forbidden => "forbidden",
            RouteName::NotFound => "notFound",
        }
    }
}

impl fmt::Display for RouteName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("no route named '{0}'")]
pub struct UnknownRoute(pub String);

impl FromStr for RouteName {
    type Err = UnknownRoute;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ROUTES
            .iter()
            .map(|r| r.name)
            .find(|name| name.as_str() == s)
            .ok_or_else(|| UnknownRoute(s.to_string()))
    }
}

/// Page rendered for a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Login,
    Dashboard,
    PostList,
    PostDetail,
    PostEditor,
    PostComments,
    PostCreator,
    Forbidden,
    NotFound,
}

/// Lazy views show a loading line before their first render.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Eager,
    Lazy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteDescriptor {
    pub name: RouteName,
    pub path: &'static str,
    pub view: View,
    pub render: RenderMode,
    /// Required permissions; empty means no requirement.
    pub permissions: &'static [Permission],
    /// Reachable without a logged-in user.
    pub public: bool,
    /// Locale namespaces to warm up before transitioning.
    pub preload: &'static [&'static str],
}

impl RouteDescriptor {
    pub fn path_for(&self, params: &Params) -> String {
        interpolate(self.path, params)
    }

    pub fn try_path_for(&self, params: &Params) -> Result<String, MissingParameter> {
        interpolate_strict(self.path, params)
    }

    pub fn parameter_names(&self) -> Vec<&'static str> {
        pattern::parameter_names(self.path)
    }
}

pub static ROUTES: [RouteDescriptor; 9] = [
    RouteDescriptor {
        name: RouteName::Login,
        path: "/login",
        view: View::Login,
        render: RenderMode::Eager,
        permissions: &[],
        public: true,
        preload: &[],
    },
    RouteDescriptor {
        name: RouteName::Dashboard,
        path: "/",
        view: View::Dashboard,
        render: RenderMode::Eager,
        permissions: &[Permission::ViewPosts, Permission::ViewComments],
        public: false,
        preload: &["dashboard"],
    },
    RouteDescriptor {
        name: RouteName::Posts,
        path: "/posts",
        view: View::PostList,
        render: RenderMode::Lazy,
        permissions: &[Permission::ViewPosts],
        public: false,
        preload: &["posts"],
    },
    RouteDescriptor {
        name: RouteName::Post,
        path: "/posts/:id",
        view: View::PostDetail,
        render: RenderMode::Lazy,
        permissions: &[Permission::ViewPosts],
        public: false,
        preload: &["post"],
    },
    RouteDescriptor {
        name: RouteName::EditPost,
        path: "/posts/:id/edit",
        view: View::PostEditor,
        render: RenderMode::Lazy,
        permissions: &[Permission::EditPost],
        public: false,
        preload: &["editPost"],
    },
    RouteDescriptor {
        name: RouteName::PostComments,
        path: "/posts/:id/comments",
        view: View::PostComments,
        render: RenderMode::Lazy,
        permissions: &[Permission::ViewComments],
        public: false,
        preload: &["postComments"],
    },
    RouteDescriptor {
        name: RouteName::CreatePost,
        path: "/posts/create",
        view: View::PostCreator,
        render: RenderMode::Lazy,
        permissions: &[Permission::CreatePost],
        public: false,
        preload: &["createPost"],
    },
    RouteDescriptor {
        name: RouteName::Forbidden,
        path: "/403",
        view: View::Forbidden,
        render: RenderMode::Lazy,
        permissions: &[],
        public: true,
        preload: &[],
    },
    RouteDescriptor {
        name: RouteName::NotFound,
        path: "/404",
        view: View::NotFound,
        render: RenderMode::Eager,
        permissions: &[],
        public: true,
        preload: &[],
    },
];

/// A concrete path resolved to its route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteMatch {
    pub route: &'static RouteDescriptor,
    pub params: Params,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteTable {
    routes: &'static [RouteDescriptor],
}

impl RouteTable {
    /// Builds a table over `routes`.
    ///
    /// # Panics
    ///
    /// If two descriptors share a name or a path.
    pub fn new(routes: &'static [RouteDescriptor]) -> Self {
        for (i, a) in routes.iter().enumerate() {
            for b in &routes[i + 1..] {
                assert!(a.name != b.name, "duplicate route name '{}'", a.name);
                assert!(a.path != b.path, "duplicate route path '{}'", a.path);
            }
        }
        Self { routes }
    }

    /// The application's routes.
    pub fn standard() -> Self {
        Self::new(&ROUTES)
    }

    pub fn routes(&self) -> &'static [RouteDescriptor] {
        self.routes
    }

    pub fn find(&self, name: RouteName) -> Option<&'static RouteDescriptor> {
        self.routes.iter().find(|r| r.name == name)
    }

    /// # Panics
    ///
    /// If `name` is not in this table.
    pub fn get(&self, name: RouteName) -> &'static RouteDescriptor {
        match self.find(name) {
            Some(route) => route,
            None => panic!("route '{name}' is not defined in the route table"),
        }
    }

    /// Looks a route up by its string key.
    ///
    /// # Panics
    ///
    /// If no route has that name.
    pub fn by_name(&self, name: &str) -> &'static RouteDescriptor {
        match self.routes.iter().find(|r| r.name.as_str() == name) {
            Some(route) => route,
            None => panic!("route '{name}' is not defined in the route table"),
        }
    }

    /// Resolves a concrete path. When several patterns match, the one with
    /// the most literal segments wins, so `/posts/create` beats `/posts/:id`.
    pub fn match_path(&self, path: &str) -> Option<RouteMatch> {
        self.routes
            .iter()
            .filter_map(|route| pattern::match_path(route.path, path).map(|p| (route, p)))
            .max_by_key(|(route, _)| pattern::specificity(route.path))
            .map(|(route, params)| RouteMatch { route, params })
    }
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_table_is_well_formed() {
        let table = RouteTable::standard();
        assert_eq!(table.routes().len(), 9);
        for route in table.routes() {
            assert_eq!(table.get(route.name), route);
            assert_eq!(route.name.as_str().parse::<RouteName>().unwrap(), route.name);
        }
    }

    #[test]
    fn public_routes_have_no_requirements() {
        for route in RouteTable::standard().routes() {
            if route.public {
                assert!(route.permissions.is_empty(), "{}", route.name);
            }
        }
    }

    #[test]
    fn requirements_match_route_list() {
        let table = RouteTable::standard();
        let req = |name| table.get(name).permissions.to_vec();
        assert_eq!(
            req(RouteName::Dashboard),
            vec![Permission::ViewPosts, Permission::ViewComments]
        );
        assert_eq!(req(RouteName::Posts), vec![Permission::ViewPosts]);
        assert_eq!(req(RouteName::CreatePost), vec![Permission::CreatePost]);
        assert_eq!(req(RouteName::Post), vec![Permission::ViewPosts]);
        assert_eq!(req(RouteName::EditPost), vec![Permission::EditPost]);
        assert_eq!(req(RouteName::PostComments), vec![Permission::ViewComments]);
        assert!(req(RouteName::Login).is_empty());
    }

    #[test]
    fn literal_segments_beat_parameters() {
        let table = RouteTable::standard();
        let m = table.match_path("/posts/create").unwrap();
        assert_eq!(m.route.name, RouteName::CreatePost);

        let m = table.match_path("/posts/12").unwrap();
        assert_eq!(m.route.name, RouteName::Post);
        assert_eq!(m.params.get("id"), Some("12"));

        let m = table.match_path("/posts/12/comments").unwrap();
        assert_eq!(m.route.name, RouteName::PostComments);

        assert!(table.match_path("/nowhere").is_none());
    }

    #[test]
    fn path_for_post() {
        let route = RouteTable::standard().by_name("post");
        assert_eq!(route.path_for(&Params::new().with("id", 42)), "/posts/42");
        assert_eq!(route.parameter_names(), vec!["id"]);
    }

    #[test]
    #[should_panic(expected = "route 'bogus' is not defined")]
    fn unknown_name_panics() {
        RouteTable::standard().by_name("bogus");
    }

    #[test]
    #[should_panic(expected = "route 'notFound' is not defined")]
    fn missing_descriptor_panics() {
        static PARTIAL: [RouteDescriptor; 1] = [RouteDescriptor {
            name: RouteName::Login,
            path: "/login",
            view: View::Login,
            render: RenderMode::Eager,
            permissions: &[],
            public: true,
            preload: &[],
        }];
        RouteTable::new(&PARTIAL).get(RouteName::NotFound);
    }

    #[test]
    #[should_panic(expected = "duplicate route name")]
    fn duplicate_names_panic() {
        static TWICE: [RouteDescriptor; 2] = [
            RouteDescriptor {
                name: RouteName::Login,
                path: "/login",
                view: View::Login,
                render: RenderMode::Eager,
                permissions: &[],
                public: true,
                preload: &[],
            },
            RouteDescriptor {
                name: RouteName::Login,
                path: "/signin",
                view: View::Login,
                render: RenderMode::Eager,
                permissions: &[],
                public: true,
                preload: &[],
            },
        ];
        RouteTable::new(&TWICE);
    }
}
