use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::error::{ProfileError, ProfileResult};
use super::source::Source;

/// Environment variable name to value.
pub type Env = BTreeMap<String, String>;

/// Projects vlttng knows how to build.
pub const KNOWN_PROJECTS: &[&str] = &[
    "babeltrace",
    "elfutils",
    "glib",
    "libxml2",
    "lttng-analyses",
    "lttng-modules",
    "lttng-tools",
    "lttng-ust",
    "popt",
    "tracecompass",
    "urcu",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    name: String,
    source: Source,
    configure: String,
    build_env: Env,
}

impl Project {
    pub fn new(name: String, source: Source, configure: String, build_env: Env) -> Self {
        Self {
            name,
            source,
            configure,
            build_env,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> &Source {
        &self.source
    }

    pub fn configure(&self) -> &str {
        &self.configure
    }

    pub fn set_configure(&mut self, configure: String) {
        self.configure = configure;
    }

    pub fn build_env(&self) -> &Env {
        &self.build_env
    }
}

/// A fully resolved profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub virt_env: Env,
    pub build_env: Env,
    pub projects: BTreeMap<String, Project>,
}

impl Profile {
    pub fn has_project(&self, name: &str) -> bool {
        self.projects.contains_key(name)
    }

    pub fn project(&self, name: &str) -> Option<&Project> {
        self.projects.get(name)
    }

    pub fn project_mut(&mut self, name: &str) -> Option<&mut Project> {
        self.projects.get_mut(name)
    }

    pub(crate) fn validate(&self) -> ProfileResult<()> {
        if let Some(name) = self
            .projects
            .keys()
            .find(|name| !KNOWN_PROJECTS.contains(&name.as_str()))
        {
            return Err(ProfileError::InvalidProfile(format!(
                "unknown project name: \"{}\"",
                name
            )));
        }
        Ok(())
    }
}
