use camino::{Utf8Path, Utf8PathBuf};
use colored::Colorize;
use miette::IntoDiagnostic;
use war_project::WarProject;

use crate::errors::CliError;
use crate::println_pad;
use crate::utils::{current_dir, validate_project_name, validate_version_format};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum ConfigFormat {
    Json,
    Toml,
}

impl ConfigFormat {
    fn file_name(self) -> &'static str {
        match self {
            ConfigFormat::Json => "war.config.json",
            ConfigFormat::Toml => "war.config.toml",
        }
    }
}

#[derive(Debug, Clone)]
pub struct InitProjectArgs {
    pub name: String,
    pub version: String,
    pub output_dir: Option<String>,
    pub format: ConfigFormat,
}

pub fn init_project(args: InitProjectArgs) -> miette::Result<()> {
    validate_project_name(&args.name)?;
    validate_version_format(&args.version)?;

    println_pad!(
        "{} {}",
        "🚀 Initializing new project:".bright_blue().bold(),
        args.name.bright_cyan().bold()
    );

    let project_dir = match args.output_dir {
        Some(ref output_dir) => Utf8PathBuf::from(output_dir).join(&args.name),
        None => current_dir()?.join(&args.name),
    };

    if let Some(existing) = WarProject::find_config(&project_dir) {
        return Err(CliError::config_already_exists(existing).into());
    }

    println_pad!(
        "{} {}",
        "📁 Creating project directory at:".bright_yellow(),
        project_dir.as_str().bright_white().bold()
    );
    std::fs::create_dir_all(&project_dir).into_diagnostic()?;

    let project = WarProject::new(&args.name, &args.version);
    let config_path = create_project_file(&project_dir, &project, args.format)?;
    prepare_source_dir(&project_dir, &project).into_diagnostic()?;

    println_pad!(
        "{}\n{} {}",
        "Project initialized successfully!".bright_green().bold(),
        "Project file:".bright_green(),
        config_path.as_str().bright_white().bold()
    );

    Ok(())
}

fn create_project_file(
    project_dir: &Utf8Path,
    project: &WarProject,
    format: ConfigFormat,
) -> miette::Result<Utf8PathBuf> {
    let contents = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(project).into_diagnostic()?,
        ConfigFormat::Toml => project.to_toml_string().into_diagnostic()?,
    };

    let config_path = project_dir.join(format.file_name());
    std::fs::write(&config_path, contents).into_diagnostic()?;

    Ok(config_path)
}

fn prepare_source_dir(project_dir: &Utf8Path, project: &WarProject) -> std::io::Result<()> {
    let web_inf = project_dir
        .join(&project.war_source_directory)
        .join("WEB-INF");
    std::fs::create_dir_all(web_inf)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(name: &str, output_dir: &Utf8Path, format: ConfigFormat) -> InitProjectArgs {
        InitProjectArgs {
            name: name.to_string(),
            version: "1.0.0".to_string(),
            output_dir: Some(output_dir.to_string()),
            format,
        }
    }

    #[test]
    fn test_init_creates_loadable_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        for (name, format) in [("shop", ConfigFormat::Toml), ("admin", ConfigFormat::Json)] {
            init_project(args(name, &root, format)).unwrap();

            let project_dir = root.join(name);
            let config = WarProject::find_config(&project_dir).unwrap();
            assert_eq!(config.file_name(), Some(format.file_name()));
            assert!(project_dir.join("src/main/webapp/WEB-INF").is_dir());

            let project = WarProject::load(&config).unwrap();
            assert_eq!(project.name, name);
            assert_eq!(project.webapp_directory, project_dir.join("target/webapp"));
        }
    }

    #[test]
    fn test_init_refuses_existing_project() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        init_project(args("shop", &root, ConfigFormat::Toml)).unwrap();
        let err = init_project(args("shop", &root, ConfigFormat::Json)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::ConfigAlreadyExists { .. })
        ));
    }

    #[test]
    fn test_init_rejects_invalid_name() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();

        let err = init_project(args("my shop", &root, ConfigFormat::Toml)).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidProjectName { .. })
        ));
        assert!(!root.join("my shop").exists());
    }
}
