use anyhow::Result;
use clap::{App as Cli, Arg};
use sandbox_stores::app::{App, Family};
use sandbox_stores::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
    let matches = Cli::new("sandbox-stores")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Drives the dispatch and closure stores through a scripted session")
        .arg(
            Arg::with_name("config")
                .short("c")
                .long("config")
                .value_name("DIR")
                .help("Directory holding config.yml")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("family")
                .short("f")
                .long("family")
                .value_name("FAMILY")
                .possible_values(&["dispatch", "closure", "both"])
                .default_value("both")
                .help("Which store family to run"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("Log at debug level"),
        )
        .get_matches();

    let mut config = Config::new();
    config.load(matches.value_of("config"))?;
    let family: Family = matches.value_of("family").unwrap_or("both").parse()?;
    App::start(config, family, matches.is_present("verbose")).await
}
