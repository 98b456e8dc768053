use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// Custom deserializer for HashMap<String, String> that filters out null values.
/// Page scanners emit every known attribute and use null for the absent ones.
fn deserialize_nullable_string_map<'de, D>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: HashMap<String, Option<String>> = HashMap::deserialize(deserializer)?;
    Ok(map
        .into_iter()
        .filter_map(|(k, v)| v.map(|val| (k, val)))
        .collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PageInfo {
    pub url: String,
    pub title: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// Straight-line distance between the top-left corners of two rects.
    pub fn top_left_distance(&self, other: &Rect) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One element of a scanned page.
///
/// Nodes are owned by the [`PageSnapshot`]; everything downstream refers to
/// them by id only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: u32,
    pub tag: String,
    #[serde(default, deserialize_with = "deserialize_nullable_string_map")]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub rect: Rect,
    #[serde(default)]
    pub parent: Option<u32>,
    #[serde(default)]
    pub children: Vec<u32>,
    /// Current value for form controls.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl Node {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// Attribute value lowercased, or an empty string when absent.
    pub fn attr_lower(&self, name: &str) -> String {
        self.attr(name).unwrap_or_default().to_lowercase()
    }
}

/// Flat arena of page nodes, as produced by a page scanner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PageSnapshot {
    #[serde(default)]
    pub page: PageInfo,
    pub nodes: Vec<Node>,
}

impl PageSnapshot {
    pub fn node(&self, id: u32) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: u32) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Id of the document root: the one node without a parent.
    pub fn root(&self) -> Option<u32> {
        self.nodes.iter().find(|n| n.parent.is_none()).map(|n| n.id)
    }

    /// Pre-order traversal of `root` and everything below it.
    pub fn descendants(&self, root: u32) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if let Some(node) = self.node(id) {
                out.push(node);
                for child in node.children.iter().rev() {
                    stack.push(*child);
                }
            }
        }
        out
    }

    /// Ancestor chain from the node's parent up to the document root.
    pub fn ancestors(&self, id: u32) -> Vec<&Node> {
        let mut out = Vec::new();
        let mut current = self.node(id).and_then(|n| n.parent);
        while let Some(pid) = current {
            match self.node(pid) {
                Some(parent) => {
                    out.push(parent);
                    current = parent.parent;
                }
                None => break,
            }
        }
        out
    }

    /// Attach a node under an existing parent, keeping child links consistent.
    pub fn insert(&mut self, mut node: Node) -> u32 {
        let id = node.id;
        if let Some(pid) = node.parent
            && let Some(parent) = self.node_mut(pid)
            && !parent.children.contains(&id)
        {
            parent.children.push(id);
        }
        node.children.retain(|c| self.node(*c).is_some());
        self.nodes.push(node);
        id
    }
}

/// A structural change to the page: a subtree was added under `added_root`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMutation {
    pub added_root: u32,
}
