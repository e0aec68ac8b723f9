use crate::errors::CliError;
use camino::{Utf8Path, Utf8PathBuf};
use miette::Result;
use regex::Regex;
use war_project::WarProject;

#[macro_export]
macro_rules! println_pad {
    ($($arg:tt)*) => {{
        let __s = format!($($arg)*);
        for __line in __s.lines() {
            println!("    {}", __line);
        }
    }};
}

pub fn is_valid_slug(name: impl AsRef<str>) -> bool {
    Regex::new(r"^[[:word:]-]+$").is_ok_and(|re| re.is_match(name.as_ref()))
}

pub fn validate_project_name(name: impl AsRef<str>) -> Result<()> {
    let name_str = name.as_ref();
    if !is_valid_slug(name_str) {
        return Err(CliError::invalid_project_name(name_str.to_string(), None).into());
    }

    Ok(())
}

pub fn validate_version_format(version: impl AsRef<str>) -> Result<()> {
    let version_str = version.as_ref();
    if semver::Version::parse(version_str).is_err() {
        return Err(CliError::invalid_version(version_str.to_string(), None).into());
    }

    Ok(())
}

pub fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir().map_err(CliError::from)?;
    Ok(Utf8PathBuf::from_path_buf(cwd).map_err(|path| CliError::NonUtf8Path { path })?)
}

/// Use the given project file, or look for one in the working directory.
pub fn resolve_config_path(config_path: Option<String>) -> Result<Utf8PathBuf> {
    match config_path {
        Some(path) => Ok(Utf8PathBuf::from(path)),
        None => find_config_in(&current_dir()?),
    }
}

pub fn find_config_in(project_dir: &Utf8Path) -> Result<Utf8PathBuf> {
    WarProject::find_config(project_dir)
        .ok_or_else(|| CliError::config_not_found(project_dir.to_owned()).into())
}

pub fn load_project(config_path: &Utf8Path) -> Result<WarProject> {
    tracing::debug!("Loading project file {}", config_path);
    Ok(WarProject::load(config_path)
        .map_err(|source| CliError::config_parse_error(config_path.to_owned(), source))?)
}

/// Prints the provided lines inside an ASCII box
pub fn print_ansi_boxed_lines(lines: &[String]) {
    let ansi = Regex::new("\x1b\\[[0-9;]*m").ok();
    let visible_len = |s: &str| match &ansi {
        Some(ansi) => ansi.replace_all(s, "").chars().count(),
        None => s.chars().count(),
    };

    let width = lines
        .iter()
        .map(|s| visible_len(s.as_str()))
        .max()
        .unwrap_or(0);

    let border = "-".repeat(width + 4);
    println_pad!("{}", border);
    for line in lines {
        let pad = width - visible_len(line.as_str());
        println_pad!("| {}{} |", line, " ".repeat(pad));
    }
    println_pad!("{}", border);
}
