use anyhow::{Context, Result};
use handlebars::Handlebars;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::json;

use super::env::quote_path;
use super::paths::VenvPaths;
use crate::profile::Profile;

const ACTIVATE_TEMPLATE: &str = include_str!("activate.sh.hbs");

/// Variables the activation script manages itself.
const RESERVED_KEYS: &[&str] = &[
    "VLTTNG",
    "PATH",
    "CPPFLAGS",
    "LDFLAGS",
    "LD_LIBRARY_PATH",
    "MANPATH",
    "PKG_CONFIG_PATH",
    "PYTHONPATH",
    "LTTNG_HOME",
    "PS1",
    "MODPROBE_OPTIONS",
];

static ENV_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("valid regex"));

/// Renders the `activate` script of a virtual environment.
pub fn render_activate(profile: &Profile, paths: &VenvPaths) -> Result<String> {
    let mut env_lines = Vec::new();
    let mut unenv_lines = Vec::new();
    for (key, value) in &profile.virt_env {
        let key = key.trim();
        if RESERVED_KEYS.contains(&key) {
            log::debug!("skipping reserved virtual environment variable {}", key);
            continue;
        }
        if !ENV_NAME_RE.is_match(key) {
            anyhow::bail!("invalid environment variable name in virt-env: \"{}\"", key);
        }
        env_lines.push(format!("vlttng-save-env {}", key));
        env_lines.push(format!("export {}={}", key, shell_words::quote(value)));
        unenv_lines.push(format!("    vlttng-restore-env {}", key));
    }

    let has_java = profile
        .project("lttng-ust")
        .is_some_and(|ust| ust.configure().contains("--enable-java-agent"));

    let mut handlebars = Handlebars::new();
    handlebars.register_escape_fn(handlebars::no_escape);
    let data = json!({
        "venv_path": quote_path(paths.venv()),
        "has_modules": flag(profile.has_project("lttng-modules")),
        "has_java": flag(has_java),
        "env": env_lines.join("\n"),
        "unenv": unenv_lines.join("\n"),
    });
    handlebars
        .render_template(ACTIVATE_TEMPLATE, &data)
        .context("failed to render activation script")
}

fn flag(value: bool) -> &'static str {
    if value { "1" } else { "0" }
}
