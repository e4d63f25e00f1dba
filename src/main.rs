mod commands;
mod common;
mod context;
mod error;
mod inventory;
mod mappings;
mod package;
mod project;
mod resolve;
mod ui;

#[cfg(test)]
mod testing;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::env;
use std::path::PathBuf;

use crate::common::config::Config;
use crate::common::paths;
use crate::context::{Context, ContextCell};
use crate::error::ResolveError;
use crate::ui::prelude::*;

static CONTEXT: ContextCell = ContextCell::new();

/// Resolve generic package names for OS build targets
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Activate debug mode
    #[arg(short, long, global = true)]
    debug: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Directory holding targets, mappings and projects
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List the supported targets
    Targets,

    /// Resolve one generic package for a target
    Resolve {
        /// Generic package name
        package: String,
        /// Target id, e.g. debian-12
        #[arg(short, long)]
        target: String,
        /// Architecture to cross compile for
        #[arg(short = 'x', long)]
        cross_arch: Option<String>,
    },

    /// Resolve every package of one or more projects
    Packages {
        /// Project names, e.g. base qemu
        #[arg(required = true)]
        projects: Vec<String>,
        /// Target id, e.g. debian-12
        #[arg(short, long)]
        target: String,
        /// Architecture to cross compile for
        #[arg(short = 'x', long)]
        cross_arch: Option<String>,
    },

    /// Check the data directory for inconsistencies
    Check,
}

fn main() {
    let cli = Cli::parse();

    let debug = cli.debug || env::var("PKGMAP_DEBUG").is_ok_and(|v| !v.is_empty() && v != "0");
    ui::set_debug_mode(debug);
    ui::init(cli.output, !cli.no_color);

    if let Err(e) = run(&cli) {
        let data_defect = e
            .chain()
            .any(|cause| cause.downcast_ref::<ResolveError>().is_some_and(ResolveError::is_data_defect));
        emit(
            Level::Error,
            "pkgmap.error",
            &format!("Error: {e:#}"),
            Some(serde_json::json!({ "data_defect": data_defect })),
        );
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let ctx = CONTEXT.get_or_load(|| {
        let config = Config::load()?;
        let env_dir = env::var(paths::DATA_DIR_ENV).ok();
        let data_dir = paths::resolve_data_dir(cli.data_dir.as_deref(), env_dir.as_deref(), &config);
        emit(
            Level::Debug,
            "pkgmap.data_dir",
            &format!("Using data directory '{}'", data_dir.display()),
            None,
        );
        Context::load(&data_dir, config.native_arch.as_deref())
    })?;

    match &cli.command {
        Commands::Targets => commands::targets(ctx),
        Commands::Resolve {
            package,
            target,
            cross_arch,
        } => commands::resolve(ctx, package, target, cross_arch.as_deref()),
        Commands::Packages {
            projects,
            target,
            cross_arch,
        } => commands::packages(ctx, projects, target, cross_arch.as_deref()),
        Commands::Check => commands::check(ctx),
    }
}
