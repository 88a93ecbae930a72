use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Route metadata consumed by the sidebar, breadcrumb and permission checks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
pub struct RouteMeta {
    /// Roles allowed to open the route. `None` means any authenticated user.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<bool>,
    /// Login page, 404 page, ...
    #[serde(default)]
    pub allow_anonymous: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteNode {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub hidden: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<RouteNode>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<RouteMeta>,
}

impl RouteNode {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.meta_mut().roles = Some(roles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.meta_mut().title = Some(title.into());
        self
    }

    pub fn allow_anonymous(mut self) -> Self {
        self.meta_mut().allow_anonymous = true;
        self
    }

    pub fn with_children(mut self, children: Vec<RouteNode>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn required_roles(&self) -> Option<&[String]> {
        self.meta.as_ref().and_then(|meta| meta.roles.as_deref())
    }

    pub fn is_anonymous(&self) -> bool {
        self.meta.as_ref().is_some_and(|meta| meta.allow_anonymous)
    }

    fn meta_mut(&mut self) -> &mut RouteMeta {
        self.meta.get_or_insert_with(RouteMeta::default)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_route_tree_from_json() {
        let routes: Vec<RouteNode> = serde_json::from_value(json!([
            {
                "path": "/media",
                "name": "media",
                "meta": { "title": "Media", "roles": ["admin"], "icon": "media" },
                "children": [
                    { "path": "presentation/new", "name": "media-presentation-new", "hidden": true,
                      "meta": { "title": "New presentation", "roles": ["admin"] } }
                ]
            },
            { "path": "/login/", "name": "login", "hidden": true, "meta": { "allowAnonymous": true } }
        ]))
        .unwrap();

        assert_eq!(routes[0].required_roles(), Some(&["admin".to_string()][..]));
        let child = &routes[0].children.as_ref().unwrap()[0];
        assert!(child.hidden);
        assert!(routes[1].is_anonymous());
        assert_eq!(routes[1].required_roles(), None);
    }
}
