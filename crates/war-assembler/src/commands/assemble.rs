use colored::Colorize;
use war_overlay::{
    AssemblyPlan, AssemblyProgress, AssemblyResult, AssemblyStage, Conflict, MappingRegistry,
    WebappAssembler,
};

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{load_project, print_ansi_boxed_lines, resolve_config_path};

#[derive(Debug)]
pub struct AssembleArgs {
    pub config_path: Option<String>,
    pub dry_run: bool,
    pub no_cache: bool,
}

pub fn assemble_project(args: AssembleArgs) -> miette::Result<()> {
    let config_path = resolve_config_path(args.config_path)?;
    let mut project = load_project(&config_path)?;
    if args.no_cache {
        project.use_cache = false;
    }

    println_pad!(
        "{} {}",
        "📦 Assembling webapp:".bright_blue().bold(),
        project.name.bright_cyan().bold()
    );

    let assembler =
        WebappAssembler::from_project(&project, &MappingRegistry::default()).map_err(CliError::from)?;

    if args.dry_run {
        let plan = assembler.dry_run().map_err(CliError::from)?;
        print_plan(&plan);
        return Ok(());
    }

    let result = assembler
        .with_progress(print_progress)
        .assemble()
        .map_err(CliError::from)?;

    print_conflicts(&result.report.conflicts);
    print_ansi_boxed_lines(&summary_lines(&result));

    Ok(())
}

fn print_progress(progress: AssemblyProgress) {
    match progress.stage {
        AssemblyStage::Resolving => println_pad!("{}", "🔎 Resolving overlays...".bright_yellow()),
        AssemblyStage::Unpacking => println_pad!(
            "{} {} {}",
            "📂 Preparing".bright_yellow(),
            progress.total,
            "overlay(s)...".bright_yellow()
        ),
        AssemblyStage::Applying => println_pad!(
            "   {} {}",
            format!("[{}/{}]", progress.current, progress.total).dimmed(),
            progress.current_overlay.unwrap_or_default().bright_cyan()
        ),
        AssemblyStage::Complete => {}
    }
}

fn print_conflicts(conflicts: &[Conflict]) {
    if conflicts.is_empty() {
        return;
    }

    println_pad!(
        "{} {}",
        "⚠️  Paths provided by more than one overlay:".bright_yellow(),
        conflicts.len()
    );
    for conflict in conflicts {
        println_pad!(
            "   {} {} {} {}",
            conflict.path.as_str().bright_white(),
            format!("kept [{}]", conflict.winner).bright_green(),
            "over".dimmed(),
            format!("[{}]", conflict.suppressed).dimmed()
        );
    }
}

fn summary_lines(result: &AssemblyResult) -> Vec<String> {
    let report = &result.report;
    let mut lines = vec![
        format!("{}", "Webapp assembled successfully!".bright_green().bold()),
        format!(
            "{} {}",
            "Location:".bright_green(),
            result.webapp_directory.as_str().bright_white().bold()
        ),
        format!(
            "{} {} applied, {} skipped",
            "Overlays:".bright_green(),
            report.applied.len(),
            report.skipped.len()
        ),
        format!(
            "{} {} written, {} refreshed, {} up to date",
            "Files:".bright_green(),
            report.written,
            report.refreshed,
            report.up_to_date
        ),
    ];
    if !result.stale_removed.is_empty() {
        lines.push(format!(
            "{} {}",
            "Removed stale files:".bright_green(),
            result.stale_removed.len()
        ));
    }
    lines.push(format!(
        "{} {:.2?}",
        "Build time:".bright_green(),
        result.build_time
    ));
    lines
}

fn print_plan(plan: &AssemblyPlan) {
    println_pad!(
        "{} {}",
        "🧪 Dry run, nothing was written. Paths to assemble:".bright_magenta().bold(),
        plan.registry.len()
    );
    for (path, owner) in plan.registry.iter() {
        println_pad!(
            "   {} {}",
            path.as_str().bright_white(),
            format!("<- [{owner}]").dimmed()
        );
    }
    print_conflicts(&plan.report.conflicts);
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino::{Utf8Path, Utf8PathBuf};
    use war_project::WarProject;

    fn write_project(root: &Utf8Path) -> Utf8PathBuf {
        let source = root.join("src/main/webapp");
        std::fs::create_dir_all(source.join("WEB-INF")).unwrap();
        std::fs::write(source.join("index.jsp"), "index").unwrap();
        std::fs::write(source.join("WEB-INF/web.xml"), "<web-app/>").unwrap();

        let config = root.join("war.config.toml");
        let project = WarProject::new("shop", "1.0.0");
        std::fs::write(&config, project.to_toml_string().unwrap()).unwrap();
        config
    }

    fn args(config: &Utf8Path, dry_run: bool) -> AssembleArgs {
        AssembleArgs {
            config_path: Some(config.to_string()),
            dry_run,
            no_cache: false,
        }
    }

    #[test]
    fn test_assemble_writes_webapp_and_cache() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let config = write_project(&root);

        assemble_project(args(&config, false)).unwrap();

        assert_eq!(
            std::fs::read_to_string(root.join("target/webapp/index.jsp")).unwrap(),
            "index"
        );
        assert!(root.join("target/war/work/webapp-cache.json").is_file());
    }

    #[test]
    fn test_dry_run_leaves_output_alone() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let config = write_project(&root);

        assemble_project(args(&config, true)).unwrap();

        assert!(!root.join("target/webapp").exists());
    }

    #[test]
    fn test_no_cache_skips_registry_file() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let config = write_project(&root);

        assemble_project(AssembleArgs {
            no_cache: true,
            ..args(&config, false)
        })
        .unwrap();

        assert!(root.join("target/webapp/WEB-INF/web.xml").is_file());
        assert!(!root.join("target/war/work/webapp-cache.json").exists());
    }
}
