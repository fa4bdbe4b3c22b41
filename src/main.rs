//! teamcfg
//!
//! Manages layered team configuration files and their secure values.

use anyhow::Result;
use clap::Parser;
use std::io::Write;
use teamcfg::cli::{self, Cli, Command};
use teamcfg::error::Warning;
use teamcfg::format::{OutputFormat, render};
use teamcfg::logging::{self, LogTarget};
use teamcfg::prompt::StdinPrompter;
use teamcfg::service::ConfigService;
use tracing::{debug, warn};

fn main() {
    let cli = Cli::parse();

    if let Err(e) = logging::init(&LogTarget::parse(&cli.log), &cli.app, cli.verbose) {
        eprintln!("Warning: logging disabled: {e:#}");
    }

    if let Err(e) = run(&cli) {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut service = cli.open_service()?;
    let mut prompter = StdinPrompter;
    let format = cli.output_format();
    debug!(app = %cli.app, command = ?cli.command, "running command");

    let output = match &cli.command {
        Command::Init(args) => render(&cli::init::run(&mut service, args, &mut prompter)?, format)?,
        Command::List(args) => render(&cli::list::run(&service, args), format)?,
        Command::Set(args) => render(&cli::set::run(&mut service, args)?, format)?,
        Command::Secure(args) => render(&cli::secure::run(&mut service, args, &mut prompter)?, format)?,
        Command::Import(args) => render(&cli::import::run(&mut service, args)?, format)?,
        Command::Schema => render(&service.schema(), OutputFormat::Json)?,
        Command::UpdateSchemas(args) => render(&cli::schema::run_update(&mut service, args)?, format)?,
        Command::ConvertProfiles(args) => {
            render(&cli::convert::run(&mut service, args, &mut prompter)?, format)?
        }
        Command::Profiles => render(&cli::profiles::run(&service), format)?,
    };

    report_warnings(&mut service);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

fn report_warnings(service: &mut ConfigService) {
    let mut warnings: Vec<Warning> = service.take_warnings();
    for warning in service.validate() {
        if !warnings.contains(&warning) {
            warnings.push(warning);
        }
    }
    for warning in warnings {
        warn!(kind = %warning.kind, "{}", warning.message);
        eprintln!("Warning: {warning}");
    }
}
