use std::collections::BTreeMap;

use serde::Serialize;
use serde_yaml::{Mapping, Value};

use super::error::{ProfileError, ProfileResult};

/// Key whose string values accumulate instead of being replaced.
pub const CONFIGURE_KEY: &str = "configure";

pub type Tree = BTreeMap<String, Node>;

/// One node of a profile document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Node {
    Null,
    Scalar(String),
    Mapping(Tree),
}

impl Node {
    pub fn from_yaml(value: Value) -> ProfileResult<Self> {
        match value {
            Value::Null => Ok(Node::Null),
            Value::Bool(b) => Ok(Node::Scalar(b.to_string())),
            Value::Number(n) => Ok(Node::Scalar(n.to_string())),
            Value::String(s) => Ok(Node::Scalar(s)),
            Value::Mapping(map) => tree_from_mapping(map).map(Node::Mapping),
            Value::Sequence(_) => Err(ProfileError::UnexpectedNode(
                "sequences are not allowed in profiles".into(),
            )),
            Value::Tagged(tagged) => Err(ProfileError::UnexpectedNode(format!(
                "tagged value {}",
                tagged.tag
            ))),
        }
    }

    pub fn as_mapping(&self) -> Option<&Tree> {
        match self {
            Node::Mapping(tree) => Some(tree),
            _ => None,
        }
    }

    pub fn as_scalar(&self) -> Option<&str> {
        match self {
            Node::Scalar(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Node::Null)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Node::Null => "null",
            Node::Scalar(_) => "scalar",
            Node::Mapping(_) => "mapping",
        }
    }
}

impl From<&str> for Node {
    fn from(value: &str) -> Self {
        Node::Scalar(value.to_string())
    }
}

impl From<Tree> for Node {
    fn from(value: Tree) -> Self {
        Node::Mapping(value)
    }
}

/// Parses one YAML document. An empty document is an empty tree.
pub fn parse_document(contents: &str) -> ProfileResult<Tree> {
    let value: Value = serde_yaml::from_str(contents).map_err(ProfileError::parse)?;
    match value {
        Value::Null => Ok(Tree::new()),
        Value::Mapping(map) => tree_from_mapping(map),
        other => Err(ProfileError::UnexpectedNode(format!(
            "document root must be a mapping, found {}",
            Node::from_yaml(other).map(|n| n.kind()).unwrap_or("sequence")
        ))),
    }
}

fn tree_from_mapping(map: Mapping) -> ProfileResult<Tree> {
    let mut tree = Tree::new();
    for (key, value) in map {
        let key = match key {
            Value::String(s) => s,
            Value::Bool(b) => b.to_string(),
            Value::Number(n) => n.to_string(),
            other => {
                return Err(ProfileError::UnexpectedNode(format!(
                    "non-scalar mapping key {:?}",
                    other
                )));
            }
        };
        tree.insert(key, Node::from_yaml(value)?);
    }
    Ok(tree)
}

/// Appends `addition` to `current` for the property `key`.
///
/// `configure` values are space-separated argument lists: a single space
/// separates the two parts unless `current` is blank. Every other key is
/// concatenated as is.
pub fn accumulate(key: &str, current: &str, addition: &str) -> String {
    if key != CONFIGURE_KEY {
        return format!("{}{}", current, addition);
    }
    if current.trim().is_empty() {
        addition.to_string()
    } else {
        format!("{} {}", current, addition)
    }
}

/// Pretty YAML dump used for the verbose effective profile.
pub fn dump(tree: &Tree) -> ProfileResult<String> {
    serde_yaml::to_string(tree).map_err(ProfileError::parse)
}
