use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::{ProfileError, ProfileResult};
use super::node::{Node, Tree};

pub const DEFAULT_CHECKOUT: &str = "master";

const ARCHIVE_PREFIXES: &[&str] = &["http://", "https://", "ftp://"];

/// Where the code of a project comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Source {
    Git { clone_url: String, checkout: String },
    Archive { url: String },
}

impl Source {
    /// File name of a downloaded archive.
    pub fn archive_file_name(&self) -> Option<&str> {
        match self {
            Source::Archive { url } => url.rsplit('/').find(|part| !part.is_empty()),
            Source::Git { .. } => None,
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Source::Git {
                clone_url,
                checkout,
            } => write!(f, "git {} ({})", clone_url, checkout),
            Source::Archive { url } => write!(f, "archive {}", url),
        }
    }
}

/// Classifies the `source` property of a project node.
///
/// A `git://` URL, a `.git` suffix or an explicit `checkout` property all
/// make a Git source, whatever the URL scheme. Otherwise HTTP(S) and FTP
/// URLs are archives.
pub fn classify(project_name: &str, project_node: &Tree) -> ProfileResult<Source> {
    let source = match project_node.get("source") {
        Some(Node::Scalar(source)) => source,
        Some(other) => {
            return Err(ProfileError::UnexpectedNode(format!(
                "project \"{}\": source must be a string, found {}",
                project_name,
                other.kind()
            )));
        }
        None => {
            return Err(ProfileError::UnexpectedNode(format!(
                "project \"{}\" has no source",
                project_name
            )));
        }
    };

    let checkout = project_node.get("checkout");
    if source.starts_with("git://") || source.ends_with(".git") || checkout.is_some() {
        let checkout = match checkout {
            Some(Node::Scalar(checkout)) => checkout.clone(),
            Some(Node::Null) | None => DEFAULT_CHECKOUT.to_string(),
            Some(Node::Mapping(_)) => {
                return Err(ProfileError::UnexpectedNode(format!(
                    "project \"{}\": checkout must be a string",
                    project_name
                )));
            }
        };
        return Ok(Source::Git {
            clone_url: source.clone(),
            checkout,
        });
    }

    if ARCHIVE_PREFIXES.iter().any(|prefix| source.starts_with(prefix)) {
        return Ok(Source::Archive {
            url: source.clone(),
        });
    }

    Err(ProfileError::UnknownSourceFormat(source.clone()))
}
