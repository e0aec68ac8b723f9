use clap::builder::{styling::AnsiColor, Styles};
use clap::ColorChoice;
use clap::{CommandFactory, FromArgMatches, Parser, Subcommand};
use commands::{
    assemble_project, init_project, list_overlays, show_owner, AssembleArgs, ConfigFormat,
    InitProjectArgs, ListOverlaysArgs, ShowOwnerArgs,
};
use miette::Result;
use tracing_subscriber::EnvFilter;

mod commands;
mod errors;
mod utils;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Log engine decisions (resolution, conflicts, unpacking) to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a new project with a default project file
    Init {
        #[arg(short, long)]
        name: String,
        /// Semantic version written to the project file
        #[arg(long, default_value = "0.1.0")]
        project_version: String,
        #[arg(short, long)]
        output_dir: Option<String>,
        /// Format of the generated project file
        #[arg(long, value_enum, default_value = "toml")]
        format: ConfigFormat,
    },
    /// Show the resolved overlay order without assembling
    Overlays {
        /// The path to the project file
        #[arg(short, long)]
        config_path: Option<String>,
    },
    /// Assemble the webapp directory
    Assemble {
        /// The path to the project file
        #[arg(short, long)]
        config_path: Option<String>,

        /// Compute which overlay provides each path without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Ignore and do not update the registry cache
        #[arg(long)]
        no_cache: bool,
    },
    /// Show which overlay provided a path in the last assembly
    Owner {
        /// Path relative to the webapp directory (a directory lists everything below it)
        path: String,

        /// The path to the project file
        #[arg(short, long)]
        config_path: Option<String>,
    },
}

fn parse_args() -> Args {
    // Configure colored/styled help output
    let styles = Styles::styled()
        .header(AnsiColor::Yellow.on_default().bold())
        .usage(AnsiColor::Green.on_default().bold())
        .literal(AnsiColor::Cyan.on_default())
        .placeholder(AnsiColor::Blue.on_default());

    let matches = Args::command()
        .styles(styles)
        .color(ColorChoice::Auto)
        .get_matches();

    Args::from_arg_matches(&matches).unwrap_or_else(|e| e.exit())
}

fn init_tracing(verbose: bool) {
    let default_directives = if verbose {
        "war_assembler=debug,war_overlay=debug"
    } else {
        "war_overlay=warn"
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| default_directives.into());

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    let args = parse_args();
    init_tracing(args.verbose);

    match args.command {
        Commands::Init {
            name,
            project_version,
            output_dir,
            format,
        } => init_project(InitProjectArgs {
            name,
            version: project_version,
            output_dir,
            format,
        }),
        Commands::Overlays { config_path } => list_overlays(ListOverlaysArgs { config_path }),
        Commands::Assemble {
            config_path,
            dry_run,
            no_cache,
        } => assemble_project(AssembleArgs {
            config_path,
            dry_run,
            no_cache,
        }),
        Commands::Owner { path, config_path } => show_owner(ShowOwnerArgs { path, config_path }),
    }
}
