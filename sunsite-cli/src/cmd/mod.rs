pub mod build;
pub mod init;
pub mod new;
pub mod serve;

use clap::Arg;

/// `--project DIR`, shared by every command that works on an existing project.
pub fn project_arg() -> Arg {
    Arg::new("project")
        .short('C')
        .long("project")
        .value_name("DIR")
        .help("Project directory containing sunsite.yaml")
        .default_value(".")
}
