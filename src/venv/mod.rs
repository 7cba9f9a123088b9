pub mod activate;
pub mod creator;
pub mod env;
pub mod paths;

use anyhow::Result;
use log::info;

use crate::cli::CreateArgs;
use crate::config::{ConfigManager, VlttngConfig};
use crate::profile::{ProfileManager, resolve_selection};

pub use creator::{CreateOptions, VenvCreator};

pub fn handle_create(
    args: CreateArgs,
    manager: &ConfigManager,
    config: &mut VlttngConfig,
) -> Result<()> {
    let profile_manager = ProfileManager::new(manager.profile_dirs(config)).with_bundled();
    let profile = resolve_selection(&profile_manager, &args.selection)?;
    let options = CreateOptions {
        force: args.force,
        verbose: args.selection.verbose,
        hide_export: args.hide_export || config.build.hide_export,
        jobs: args.jobs.unwrap_or(config.build.jobs),
        dry_run: args.dry_run,
    };
    info!(
        "creating virtual environment {:?} with {} project(s)",
        args.path,
        profile.projects.len()
    );
    let mut creator = VenvCreator::new(&args.path, profile, options)?;
    creator.create()
}
