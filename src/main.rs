use anyhow::Result;
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use std::path::Path;
use tagpages::build::{build_site, list_tag_pages};
use tagpages::config::Config;
use tagpages::logging::{init_logging, Verbosity};
use tracing::error;

fn main() {
    let matches = App::new("tagpages")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Generates tag index pages for a Jekyll-style blog")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(with_common_args(
            SubCommand::with_name("build")
                .about("Writes a page for every tag into the output directory")
                .arg(
                    Arg::with_name("output")
                        .short("o")
                        .long("output")
                        .takes_value(true)
                        .value_name("DIR")
                        .help("The output directory (defaults to the site's `destination`)"),
                ),
        ))
        .subcommand(with_common_args(
            SubCommand::with_name("tags").about("Lists the tag pages the site would get"),
        ))
        .get_matches();

    let (name, sub) = matches.subcommand();
    let sub = match sub {
        Some(sub) => sub,
        None => return,
    };
    init_logging(Verbosity::from_flags(
        sub.occurrences_of("verbose"),
        sub.is_present("quiet"),
    ));

    let result = match name {
        "build" => build(sub),
        "tags" => tags(sub),
        _ => Ok(()),
    };
    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn with_common_args<'a, 'b>(app: App<'a, 'b>) -> App<'a, 'b> {
    app.arg(
        Arg::with_name("site")
            .index(1)
            .value_name("SITE_DIR")
            .help("The site directory (or any directory inside it)"),
    )
    .arg(
        Arg::with_name("verbose")
            .short("v")
            .long("verbose")
            .multiple(true)
            .help("Logs more detail; repeat for even more"),
    )
    .arg(
        Arg::with_name("quiet")
            .short("q")
            .long("quiet")
            .help("Only logs errors"),
    )
}

fn config(matches: &ArgMatches) -> Result<Config> {
    let site = Path::new(matches.value_of("site").unwrap_or("."));
    let output = matches.value_of("output").map(Path::new);
    Config::from_directory(site, output)
}

fn build(matches: &ArgMatches) -> Result<()> {
    let config = config(matches)?;
    let summary = build_site(&config)?;
    println!(
        "{} posts, {} tag pages written to {}",
        summary.posts,
        summary.pages,
        config.output_directory.display()
    );
    Ok(())
}

fn tags(matches: &ArgMatches) -> Result<()> {
    for (url_path, title) in list_tag_pages(&config(matches)?)? {
        println!("{}\t{}", url_path, title);
    }
    Ok(())
}
