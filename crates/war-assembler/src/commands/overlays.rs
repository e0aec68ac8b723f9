use colored::Colorize;
use war_overlay::{MappingRegistry, Overlay, OverlaySource, WebappAssembler};

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{load_project, resolve_config_path};

#[derive(Debug)]
pub struct ListOverlaysArgs {
    pub config_path: Option<String>,
}

pub fn list_overlays(args: ListOverlaysArgs) -> miette::Result<()> {
    let config_path = resolve_config_path(args.config_path)?;
    let project = load_project(&config_path)?;

    let assembler =
        WebappAssembler::from_project(&project, &MappingRegistry::default()).map_err(CliError::from)?;
    let overlays = assembler.resolve().map_err(CliError::from)?;

    println_pad!(
        "{} {} {}",
        "🗂️  Overlays of".bright_blue().bold(),
        project.name.bright_cyan().bold(),
        "(highest priority first)".dimmed()
    );

    for (index, overlay) in overlays.iter().enumerate() {
        let name = if overlay.skip() {
            overlay.id().to_string().dimmed()
        } else {
            overlay.id().to_string().bright_cyan().bold()
        };
        println_pad!("{:>3}. {} {}", index + 1, name, describe_source(overlay).dimmed());

        for detail in overlay_details(overlay) {
            println_pad!("       {} {}", "•".bright_cyan(), detail);
        }
    }

    Ok(())
}

fn describe_source(overlay: &Overlay) -> String {
    match overlay.source() {
        OverlaySource::CurrentBuild => "(project sources)".to_string(),
        OverlaySource::Artifact {
            artifact: Some(artifact),
            ..
        } => match &artifact.file {
            Some(file) => format!("({file})"),
            None => format!("({}:{})", artifact.artifact_id, artifact.version),
        },
        OverlaySource::Artifact { artifact: None, .. } => "(not resolved)".to_string(),
    }
}

/// Flags and non-default filters worth showing for an overlay.
fn overlay_details(overlay: &Overlay) -> Vec<String> {
    let mut details = Vec::new();
    if overlay.skip() {
        details.push("skipped".to_string());
    }
    if overlay.filtered() {
        details.push("filtered".to_string());
    }
    if let Some(target_path) = overlay.target_path().filter(|_| !overlay.is_current_build()) {
        details.push(format!("target path: {target_path}"));
    }
    if !overlay.uses_default_filters() {
        if !overlay.includes().is_empty() {
            details.push(format!("includes: {}", overlay.includes().join(", ")));
        }
        if !overlay.excludes().is_empty() {
            details.push(format!("excludes: {}", overlay.excludes().join(", ")));
        }
    }
    details
}
