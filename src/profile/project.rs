use std::collections::BTreeMap;

use super::error::{ProfileError, ProfileResult};
use super::model::{Env, Project};
use super::node::{CONFIGURE_KEY, Node, Tree};
use super::source::classify;

const BUILD_ENV_KEY: &str = "build-env";

/// Builds the projects found under the `projects` node of a merged profile.
///
/// Ignored names and null project nodes are skipped. Each project gets its
/// own copy of `build_env`, overlaid with its `build-env` property.
pub fn build_projects(
    projects_node: &Tree,
    build_env: &Env,
    ignored: &[String],
) -> ProfileResult<BTreeMap<String, Project>> {
    let mut projects = BTreeMap::new();
    for (name, node) in projects_node {
        if ignored.iter().any(|ignored| ignored == name) {
            log::debug!("ignoring project {}", name);
            continue;
        }
        let node = match node {
            Node::Null => continue,
            Node::Mapping(node) => node,
            Node::Scalar(_) => {
                return Err(ProfileError::UnexpectedNode(format!(
                    "project \"{}\" must be a mapping",
                    name
                )));
            }
        };
        projects.insert(name.clone(), build_project(name, node, build_env)?);
    }
    Ok(projects)
}

fn build_project(name: &str, node: &Tree, base_env: &Env) -> ProfileResult<Project> {
    let source = classify(name, node)?;
    let configure = match node.get(CONFIGURE_KEY) {
        Some(Node::Scalar(configure)) => configure.clone(),
        Some(Node::Null) | None => String::new(),
        Some(Node::Mapping(_)) => {
            return Err(ProfileError::UnexpectedNode(format!(
                "project \"{}\": configure must be a string",
                name
            )));
        }
    };
    let build_env = match node.get(BUILD_ENV_KEY) {
        Some(Node::Mapping(overlay)) => {
            let mut env = base_env.clone();
            env.extend(env_from_tree(overlay, name)?);
            env
        }
        Some(Node::Null) => Env::new(),
        Some(Node::Scalar(_)) => {
            return Err(ProfileError::UnexpectedNode(format!(
                "project \"{}\": build-env must be a mapping",
                name
            )));
        }
        None => base_env.clone(),
    };
    Ok(Project::new(name.to_string(), source, configure, build_env))
}

/// Flattens an environment mapping. Null values become empty strings.
pub fn env_from_tree(tree: &Tree, context: &str) -> ProfileResult<Env> {
    tree.iter()
        .map(|(key, value)| match value {
            Node::Scalar(value) => Ok((key.clone(), value.clone())),
            Node::Null => Ok((key.clone(), String::new())),
            Node::Mapping(_) => Err(ProfileError::UnexpectedNode(format!(
                "{}: environment variable \"{}\" must be a string",
                context, key
            ))),
        })
        .collect()
}
