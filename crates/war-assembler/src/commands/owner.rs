use camino::Utf8Path;
use colored::Colorize;
use war_overlay::{OverlayId, PathRegistry, RegistryCache, RelativePath};
use war_project::WarProject;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{load_project, resolve_config_path};

#[derive(Debug)]
pub struct ShowOwnerArgs {
    pub path: String,
    pub config_path: Option<String>,
}

pub fn show_owner(args: ShowOwnerArgs) -> miette::Result<()> {
    let config_path = resolve_config_path(args.config_path)?;
    let project = load_project(&config_path)?;

    let cache = RegistryCache::load(&project.cache_file)
        .map_err(CliError::from)?
        .ok_or_else(|| CliError::cache_not_found(project.cache_file.clone()))?;
    let registry = cache.into_registry();

    let path = webapp_relative_path(&project, &args.path)?;
    let owned = owned_paths(&registry, &path);
    if owned.is_empty() {
        return Err(CliError::path_not_owned(path.as_str()).into());
    }

    for (path, owner) in owned {
        println_pad!(
            "{} {}",
            path.as_str().bright_white(),
            format!("<- [{owner}]").bright_cyan()
        );
    }

    Ok(())
}

/// Accepts paths relative to the webapp directory or absolute paths inside it.
fn webapp_relative_path(project: &WarProject, raw: &str) -> miette::Result<RelativePath> {
    let raw_path = Utf8Path::new(raw);
    let relative = match raw_path.strip_prefix(&project.webapp_directory) {
        Ok(stripped) if raw_path.is_absolute() => stripped.as_str(),
        _ => raw,
    };
    Ok(RelativePath::new(relative).map_err(CliError::from)?)
}

/// The exact path, or every path below it when it names a directory.
fn owned_paths<'a>(
    registry: &'a PathRegistry,
    path: &RelativePath,
) -> Vec<(&'a RelativePath, &'a OverlayId)> {
    if let Some(exact) = registry.iter().find(|(candidate, _)| *candidate == path) {
        return vec![exact];
    }

    let prefix = format!("{}/", path.as_str());
    registry
        .iter()
        .filter(|(candidate, _)| candidate.as_str().starts_with(&prefix))
        .collect()
}
