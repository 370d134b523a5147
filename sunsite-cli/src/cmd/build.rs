use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use sunsite_core::{BuildReport, build_site};
use tracing::info;
use crate::config::{BuildConfig, SunsiteConfig};

pub fn add_build_args(command: Command) -> Command {
    command.arg(super::project_arg()).arg(
        Arg::new("output")
            .short('o')
            .long("output")
            .value_name("DIR")
            .help("Output directory for generated site")
            .default_value("_site"),
    )
}

pub fn make_subcommand() -> Command {
    add_build_args(Command::new("build")).about("Build the static site")
}

/// Run the full build described by `config`.
pub fn run_build(config: &BuildConfig) -> Result<BuildReport> {
    info!(project = %config.project, output = %config.output, "building site");
    build_site(config.project_dir(), config.output_dir())
        .with_context(|| format!("failed to build site in {}", config.project))
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    // Load cascading configuration
    let config = SunsiteConfig::load(args)?;
    let build_config = config.build_config();

    let report = run_build(build_config)?;

    println!(
        "Site built successfully at {} ({} pages)",
        build_config.output,
        report.pages.len()
    );

    Ok(())
}
