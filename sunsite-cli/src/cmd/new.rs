use anyhow::Result;
use clap::{Arg, ArgMatches, Command};
use sunsite_core::scaffold::new_page;

pub fn make_subcommand() -> Command {
    Command::new("new")
        .about("Create a new page")
        .arg(
            Arg::new("path")
                .value_name("PATH")
                .help("Page path, relative to the content directory")
                .required(true),
        )
        .arg(
            Arg::new("title")
                .short('t')
                .long("title")
                .value_name("TITLE")
                .help("Page title"),
        )
        .arg(
            Arg::new("icon")
                .short('i')
                .long("icon")
                .value_name("ICON")
                .help("Page icon (emoji)"),
        )
        .arg(super::project_arg())
}

pub fn execute(args: &ArgMatches) -> Result<()> {
    let project = args.get_one::<String>("project").map(String::as_str).unwrap_or(".");
    let Some(path) = args.get_one::<String>("path") else {
        anyhow::bail!("a page path is required");
    };

    let written = new_page(
        project,
        path,
        args.get_one::<String>("title").map(String::as_str),
        args.get_one::<String>("icon").map(String::as_str),
    )?;

    println!("Created new page at {}", written.display());
    Ok(())
}
