//! Manifest schema definitions.
//!
//! Field names follow the manifest's camelCase YAML keys. Unknown fields are
//! ignored so newer manifests still load.

use serde::{Deserialize, Serialize};

use crate::manifest::ordered::{string_values, OrderedMap};

/// Root of a parsed manifest.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Manifest {
    /// Deployable artifact holding the handler implementations.
    pub location: String,

    /// Default authorization context merged into every route.
    pub authorization: GlobalAuthorization,

    /// Request path → handler binding, in document order.
    pub paths: OrderedMap<PathEntry>,
}

/// Global authorization defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GlobalAuthorization {
    #[serde(deserialize_with = "string_values")]
    pub extensions: OrderedMap<String>,
}

/// A single path binding.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct PathEntry {
    /// Fully qualified handler identifier.
    pub handler: String,

    #[serde(default)]
    pub authorization: AuthEntry,
}

/// Per-path authorization metadata.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthEntry {
    /// JSON pointer locating the object id inside the request body.
    #[serde(alias = "objectIdPtr", skip_serializing_if = "Option::is_none")]
    pub object_id_pointer: Option<String>,

    #[serde(deserialize_with = "string_values")]
    pub extensions: OrderedMap<String>,
}

impl Manifest {
    /// Parse a manifest from YAML text.
    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn entry(&self, path: &str) -> Option<&PathEntry> {
        self.paths.get(path)
    }

    /// Handler identifiers in path order.
    pub fn handlers(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(|(_, entry)| entry.handler.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MANIFEST: &str = r#"
location: build/functions.jar
authorization:
  extensions:
    namespace_service: orders
    tier: 2
paths:
  /orders/create:
    handler: com.example.orders.CreateOrder
    authorization:
      objectIdPointer: /orderId
      extensions:
        relation: editor
  /orders/list:
    handler: com.example.orders.ListOrders
  /legacy:
    handler: com.example.Legacy
    authorization:
      objectIdPtr: /id
unknownField: ignored
"#;

    #[test]
    fn parses_full_manifest() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();

        assert_eq!(manifest.location, "build/functions.jar");
        assert_eq!(
            manifest.authorization.extensions.get("tier").map(String::as_str),
            Some("2")
        );

        let paths: Vec<_> = manifest.paths.keys().collect();
        assert_eq!(paths, vec!["/orders/create", "/orders/list", "/legacy"]);

        let create = manifest.entry("/orders/create").unwrap();
        assert_eq!(create.handler, "com.example.orders.CreateOrder");
        assert_eq!(create.authorization.object_id_pointer.as_deref(), Some("/orderId"));
        assert_eq!(
            create.authorization.extensions.get("relation").map(String::as_str),
            Some("editor")
        );

        let list = manifest.entry("/orders/list").unwrap();
        assert!(list.authorization.object_id_pointer.is_none());
        assert!(list.authorization.extensions.is_empty());
    }

    #[test]
    fn accepts_legacy_pointer_key() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let legacy = manifest.entry("/legacy").unwrap();
        assert_eq!(legacy.authorization.object_id_pointer.as_deref(), Some("/id"));
    }

    #[test]
    fn rejects_duplicate_paths() {
        let text = "paths:\n  /a:\n    handler: x.A\n  /a:\n    handler: x.B\n";
        assert!(Manifest::from_yaml(text).is_err());
    }

    #[test]
    fn handlers_in_order() {
        let manifest = Manifest::from_yaml(MANIFEST).unwrap();
        let handlers: Vec<_> = manifest.handlers().collect();
        assert_eq!(handlers[0], "com.example.orders.CreateOrder");
        assert_eq!(handlers.len(), 3);
    }
}
