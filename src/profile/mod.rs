mod bundled;
mod error;
mod manager;
mod merge;
mod model;
mod node;
mod overrides;
mod project;
mod resolve;
mod source;

use std::io;

use anyhow::{Context, Result};

use crate::cli::{OutputFormat, ProfileArgs, ProfileCommand, ProfileSelection, ProfileShowArgs};
use crate::config::{ConfigManager, VlttngConfig};

pub use error::ProfileError;
pub use manager::{ProfileLocation, ProfileManager};
pub use model::{Env, Profile, Project};
pub use overrides::{Override, OverrideOp, parse_override};
pub use resolve::{resolve, resolve_locations};
pub use source::Source;

pub fn handle_profile(
    args: ProfileArgs,
    manager: &ConfigManager,
    config: &mut VlttngConfig,
) -> Result<()> {
    let profile_manager = ProfileManager::new(manager.profile_dirs(config)).with_bundled();
    match args.command {
        ProfileCommand::List => {
            for name in profile_manager.list()? {
                println!("{}", name);
            }
        }
        ProfileCommand::Show(ProfileShowArgs { selection, format }) => {
            let profile = resolve_selection(&profile_manager, &selection)?;
            let encoded = match format {
                OutputFormat::Text => describe(&profile),
                OutputFormat::Json => serde_json::to_string_pretty(&profile)
                    .context("failed to serialize profile to JSON")?,
                OutputFormat::Yaml => serde_yaml::to_string(&profile)
                    .context("failed to serialize profile to YAML")?,
            };
            println!("{}", encoded);
        }
    }
    Ok(())
}

/// Resolves the profiles, ignored projects and overrides of a command line.
pub fn resolve_selection(
    profile_manager: &ProfileManager,
    selection: &ProfileSelection,
) -> Result<Profile> {
    if selection.profiles.is_empty() {
        anyhow::bail!("no profile specified (use -p/--profile)");
    }
    let locations = profile_manager.find_all(&selection.profiles)?;
    resolve_locations(
        &locations,
        &selection.ignored,
        &selection.overrides,
        selection.verbose,
        &mut io::stdout(),
    )
    .map_err(|err| user_error(err, selection.verbose))
}

/// Turns a resolution error into the message shown to the user, keeping the
/// cause chain only when verbose.
fn user_error(err: ProfileError, verbose: bool) -> anyhow::Error {
    let message = match &err {
        ProfileError::UnknownSourceFormat(source) => {
            format!("Unknown source format: \"{}\"", source)
        }
        ProfileError::InvalidProfile(reason) => format!("Invalid profile: {}", reason),
        _ => "Malformed YAML profile".to_string(),
    };
    if verbose {
        anyhow::Error::new(err).context(message)
    } else {
        anyhow::anyhow!(message)
    }
}

fn describe(profile: &Profile) -> String {
    let mut out = String::new();
    describe_env(&mut out, "virt-env", &profile.virt_env, "");
    describe_env(&mut out, "build-env", &profile.build_env, "");
    out.push_str("projects:\n");
    for project in profile.projects.values() {
        out.push_str(&format!("  {}:\n", project.name()));
        out.push_str(&format!("    source: {}\n", project.source()));
        if !project.configure().is_empty() {
            out.push_str(&format!("    configure: {}\n", project.configure()));
        }
        describe_env(&mut out, "build-env", project.build_env(), "    ");
    }
    out.trim_end().to_string()
}

fn describe_env(out: &mut String, title: &str, env: &Env, indent: &str) {
    if env.is_empty() {
        return;
    }
    out.push_str(&format!("{}{}:\n", indent, title));
    for (key, value) in env {
        out.push_str(&format!("{}  {}={}\n", indent, key, value));
    }
}
