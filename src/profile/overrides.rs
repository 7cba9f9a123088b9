use std::fmt;
use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;

use super::error::{ProfileError, ProfileResult};
use super::node::{Node, Tree, accumulate};

const PATH_PATTERN: &str = r"[a-zA-Z0-9_-]+(?:\.[a-zA-Z0-9_-]+)*";

static REPLACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({PATH_PATTERN})=(.+)$")).expect("valid regex"));
static APPEND_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^({PATH_PATTERN})\+=(.+)$")).expect("valid regex"));
static REMOVE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(&format!(r"^!({PATH_PATTERN})$")).expect("valid regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverrideOp {
    Replace,
    Append,
    Remove,
}

/// A path-addressed mutation of the merged profile tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Override {
    path: Vec<String>,
    op: OverrideOp,
    replacement: Option<String>,
}

impl Override {
    pub fn new(path: Vec<String>, op: OverrideOp, replacement: Option<String>) -> ProfileResult<Self> {
        if path.is_empty() {
            return Err(ProfileError::InvalidOverride("empty override path".into()));
        }
        Ok(Self {
            path,
            op,
            replacement,
        })
    }

    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn op(&self) -> OverrideOp {
        self.op
    }

    pub fn replacement(&self) -> Option<&str> {
        self.replacement.as_deref()
    }

    pub fn apply(&self, root: &mut Tree) -> ProfileResult<()> {
        let (leaf, parents) = self
            .path
            .split_last()
            .ok_or_else(|| ProfileError::InvalidOverride("empty override path".into()))?;

        // Descend through the existing part of the path.
        let mut node = root;
        let mut remaining = parents;
        while let Some((key, rest)) = remaining.split_first() {
            if !node.contains_key(key) {
                break;
            }
            node = match node.get_mut(key) {
                Some(Node::Mapping(child)) => child,
                _ => return Err(not_a_mapping(key)),
            };
            remaining = rest;
        }

        let append = match self.op {
            OverrideOp::Remove => {
                if !remaining.is_empty() || node.remove(leaf).is_none() {
                    return Err(ProfileError::KeyNotFound(self.path.join(".")));
                }
                return Ok(());
            }
            OverrideOp::Replace => false,
            OverrideOp::Append => true,
        };

        // Whatever is left of the path is new structure.
        for key in remaining {
            node = match node
                .entry(key.clone())
                .or_insert_with(|| Node::Mapping(Tree::new()))
            {
                Node::Mapping(child) => child,
                _ => return Err(not_a_mapping(key)),
            };
        }

        let replacement = self.replacement.as_deref().unwrap_or_default();
        let slot = node
            .entry(leaf.clone())
            .or_insert_with(|| Node::Scalar(String::new()));
        if append {
            let current = match &*slot {
                Node::Scalar(current) => current.as_str(),
                Node::Null => "",
                Node::Mapping(_) => {
                    return Err(ProfileError::InvalidOverride(format!(
                        "cannot append to mapping property \"{}\"",
                        leaf
                    )));
                }
            };
            *slot = Node::Scalar(accumulate(leaf, current, replacement));
        } else {
            *slot = Node::Scalar(replacement.to_string());
        }
        Ok(())
    }
}

fn not_a_mapping(key: &str) -> ProfileError {
    ProfileError::InvalidOverride(format!(
        "cannot override non-mapping property \"{}\" with a mapping",
        key
    ))
}

impl FromStr for Override {
    type Err = ProfileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let arg = s.trim();
        let split = |path: &str| path.split('.').map(str::to_string).collect::<Vec<_>>();

        if let Some(caps) = APPEND_RE.captures(arg) {
            return Override::new(split(&caps[1]), OverrideOp::Append, Some(caps[2].to_string()));
        }
        if let Some(caps) = REPLACE_RE.captures(arg) {
            return Override::new(split(&caps[1]), OverrideOp::Replace, Some(caps[2].to_string()));
        }
        if let Some(caps) = REMOVE_RE.captures(arg) {
            return Override::new(split(&caps[1]), OverrideOp::Remove, None);
        }
        Err(ProfileError::InvalidOverride(format!(
            "malformed override: \"{}\"",
            arg
        )))
    }
}

impl fmt::Display for Override {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self.path.join(".");
        let rep = self.replacement.as_deref().unwrap_or_default();
        match self.op {
            OverrideOp::Replace => write!(f, "{}={}", path, rep),
            OverrideOp::Append => write!(f, "{}+={}", path, rep),
            OverrideOp::Remove => write!(f, "!{}", path),
        }
    }
}

/// clap value parser for `--override`.
pub fn parse_override(s: &str) -> Result<Override, String> {
    s.parse::<Override>().map_err(|err| err.to_string())
}
