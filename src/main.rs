use anyhow::{anyhow, Result};
use clap::{App, AppSettings, Arg, ArgMatches, SubCommand};
use skald::build::build_site;
use skald::config::Config;
use skald::mailchimp::Mailchimp;
use skald::subscribe::{parse_assignment, Field, Mode, Widget};
use std::path::{Path, PathBuf};
use tracing::info;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let project_dir = Arg::with_name("PROJECT_DIR")
        .help("The project directory, or any directory below it")
        .default_value(".");

    let matches = App::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommand(
            SubCommand::with_name("build")
                .about("Builds the site")
                .arg(
                    Arg::with_name("output")
                        .long("output")
                        .short("o")
                        .takes_value(true)
                        .help("The output directory (default: `{PROJECT_DIR}/_output`)"),
                )
                .arg(project_dir.clone()),
        )
        .subcommand(
            SubCommand::with_name("subscribe")
                .about("Subscribes an address to the configured mailing list")
                .arg(
                    Arg::with_name("email")
                        .long("email")
                        .takes_value(true)
                        .required(true),
                )
                .arg(
                    Arg::with_name("first-name")
                        .long("first-name")
                        .takes_value(true),
                )
                .arg(
                    Arg::with_name("field")
                        .long("field")
                        .takes_value(true)
                        .multiple(true)
                        .number_of_values(1)
                        .help("Sets a form field, e.g. `FNAME=Jo`"),
                )
                .arg(project_dir),
        )
        .get_matches();

    match matches.subcommand() {
        ("build", Some(matches)) => build(matches),
        ("subscribe", Some(matches)) => subscribe(matches),
        (name, _) => Err(anyhow!("Unknown subcommand `{}`", name)),
    }
}

fn project_dir(matches: &ArgMatches) -> PathBuf {
    PathBuf::from(matches.value_of("PROJECT_DIR").unwrap_or("."))
}

fn build(matches: &ArgMatches) -> Result<()> {
    let project_dir = project_dir(matches);
    let output = match matches.value_of("output") {
        Some(output) => PathBuf::from(output),
        None => project_dir.join("_output"),
    };
    let config = Config::from_directory(&project_dir, &output)?;
    build_site(&config)?;
    Ok(())
}

fn subscribe(matches: &ArgMatches) -> Result<()> {
    let config = Config::from_directory(&project_dir(matches), Path::new("_output"))?;
    let endpoint = match &config.subscribe {
        Some(subscribe) => subscribe.endpoint.as_str(),
        None => return Err(anyhow!("No `subscribe.endpoint` in the project file")),
    };

    let list = Mailchimp::new(endpoint)?;
    info!(endpoint = %list.endpoint(), "subscribing");

    let mut widget = Widget::new(list);
    if let Some(first_name) = matches.value_of("first-name") {
        widget.edit(Field::FirstName, first_name);
    }
    for arg in matches.values_of("field").into_iter().flatten() {
        let (field, value) = parse_assignment(arg)?;
        widget.edit(field, value);
    }
    widget.edit(Field::Email, matches.value_of("email").unwrap_or_default());

    match &widget.submit().mode {
        Mode::Subscribed { message } => {
            println!("{}", message);
            Ok(())
        }
        Mode::Error { detail } => Err(anyhow!("{}", detail)),
        mode => Err(anyhow!("Subscription did not complete ({:?})", mode)),
    }
}
