use std::path::PathBuf;

use anyhow::Result;
use clap::{Arg, ArgAction, ArgMatches, Command};
use sunsite_core::scaffold::init_project;

pub fn make_subcommand() -> Command {
    Command::new("init")
        .about("Initialize a new project")
        .arg(
            Arg::new("directory")
                .value_name("DIR")
                .help("Project directory")
                .default_value("."),
        )
        .arg(
            Arg::new("force")
                .short('f')
                .long("force")
                .help("Initialize even if the directory already exists")
                .action(ArgAction::SetTrue),
        )
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let directory = args
        .get_one::<String>("directory")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));

    init_project(&directory, args.get_flag("force"))?;

    println!("Project initialized at {}", directory.display());
    Ok(())
}
