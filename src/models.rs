use serde::{Deserialize, Serialize};
use uuid::Uuid;
use zeroize::Zeroize;

/// Identifier for a new node or credential.
///
/// UUIDv7 strings: random enough to never collide in practice, and ordered by
/// creation time so they double as a creation-order tie-breaker.
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq, Zeroize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    #[serde(default = "new_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub show_value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Credential {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            id: new_id(),
            name: name.to_string(),
            value: value.to_string(),
            show_value: false,
            description: None,
        }
    }
}

impl Default for Credential {
    fn default() -> Self {
        Self::new("", "")
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq, Zeroize)]
pub struct NodeData {
    pub title: String,
    #[serde(default)]
    pub credentials: Vec<Credential>,
}

impl NodeData {
    pub fn titled(title: &str) -> Self {
        Self {
            title: title.to_string(),
            credentials: Vec::new(),
        }
    }
}

/// One item of the tree. `children` is `None` unless the node has at least one child.
#[derive(Serialize, Deserialize, Debug, Clone, Zeroize)]
pub struct Node {
    #[serde(default = "new_id")]
    pub id: String,
    pub data: NodeData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<Node>>,
}

impl Node {
    pub fn new(data: NodeData) -> Self {
        Self {
            id: new_id(),
            data,
            children: None,
        }
    }

    pub fn titled(title: &str) -> Self {
        Self::new(NodeData::titled(title))
    }

    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = if children.is_empty() {
            None
        } else {
            Some(children)
        };
        self
    }

    pub fn children(&self) -> &[Node] {
        self.children.as_deref().unwrap_or(&[])
    }

    pub fn has_children(&self) -> bool {
        !self.children().is_empty()
    }

    /// Child list, created on demand.
    pub fn children_mut(&mut self) -> &mut Vec<Node> {
        self.children.get_or_insert_with(Vec::new)
    }
}

// A missing child list and an empty one are the same tree.
impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id && self.data == other.data && self.children() == other.children()
    }
}

impl Eq for Node {}

/// On-disk envelope around a sealed payload.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct EncryptedBlob {
    pub version: u8,
    pub nonce: String,
    pub data: String,
}

/// Parses a JSON item list of any nesting depth. Each tree level nests two
/// JSON values, so serde_json's default limit would cap trees near 63 levels.
pub fn forest_from_json(bytes: &[u8]) -> serde_json::Result<Vec<Node>> {
    let mut json = serde_json::Deserializer::from_slice(bytes);
    json.disable_recursion_limit();
    let forest = Vec::<Node>::deserialize(serde_stacker::Deserializer::new(&mut json))?;
    json.end()?;
    Ok(forest)
}

pub fn zeroize_forest(forest: &mut Vec<Node>) {
    forest.zeroize();
    forest.shrink_to_fit();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_creation_ordered() {
        let ids: Vec<String> = (0..2_000).map(|_| new_id()).collect();
        let distinct: HashSet<&String> = ids.iter().collect();
        assert_eq!(distinct.len(), ids.len());

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids);
    }

    #[test]
    fn empty_children_equal_missing_children() {
        let mut a = Node::titled("a");
        let mut b = a.clone();
        b.children = Some(Vec::new());
        assert_eq!(a, b);

        a.children_mut().push(Node::titled("child"));
        assert_ne!(a, b);
    }

    #[test]
    fn serializes_in_camel_case_without_empty_optionals() {
        let node = Node::new(NodeData {
            title: "mail".into(),
            credentials: vec![Credential::new("user", "secret")],
        });
        let json = serde_json::to_value(&node).unwrap();
        let credential = &json["data"]["credentials"][0];
        assert_eq!(credential["showValue"], false);
        assert!(credential.get("description").is_none());
        assert!(json.get("children").is_none());
    }

    #[test]
    fn deserializes_nested_items_and_fills_missing_ids() {
        let raw = r#"[{"data":{"title":"root","credentials":[{"name":"pin","value":"1234","showValue":true}]},
                      "children":[{"id":"fixed","data":{"title":"leaf"}}]}]"#;
        let forest: Vec<Node> = serde_json::from_str(raw).unwrap();
        assert_eq!(forest.len(), 1);
        assert!(!forest[0].id.is_empty());
        assert!(forest[0].data.credentials[0].show_value);
        assert_eq!(forest[0].children()[0].id, "fixed");
        assert!(forest[0].children()[0].data.credentials.is_empty());
    }

    #[test]
    fn zeroize_clears_secrets() {
        let mut forest = vec![Node::new(NodeData {
            title: "bank".into(),
            credentials: vec![Credential::new("login", "hunter2")],
        })];
        zeroize_forest(&mut forest);
        assert!(forest.is_empty());
    }
}
