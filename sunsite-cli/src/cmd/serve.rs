use anyhow::Result;
use clap::{Arg, ArgMatches, Command, value_parser};
use sunsite_dev_server::{DevServer, DevServerConfig};
use crate::config::SunsiteConfig;

pub fn make_subcommand() -> Command {
    super::build::add_build_args(Command::new("serve"))
        .about("Build the site and serve it locally")
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .value_name("PORT")
                .help("Port to serve on")
                .value_parser(value_parser!(u16))
                .default_value("8000"),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .value_name("HOST")
                .help("Host to bind to")
                .default_value("127.0.0.1"),
        )
}

pub async fn execute(args: &ArgMatches) -> Result<()> {
    let config = SunsiteConfig::load(args)?;
    let build_config = config.build_config();

    super::build::run_build(build_config)?;
    println!("Site built successfully at {}", build_config.output);

    let server = DevServer::new(DevServerConfig {
        host: build_config.host.clone(),
        port: build_config.port,
        root: build_config.output_dir(),
    });
    server.run().await?;

    Ok(())
}
