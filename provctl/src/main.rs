#![doc = include_str!("../README.md")]
#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

mod args;
mod attr_utils;
mod options;

use std::process::ExitCode;

use clap::Parser;
use log::{debug, error, LevelFilter};
use log4rs::append::console::{ConsoleAppender, Target};
use log4rs::config::{Appender, Config, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::args::*;
use crate::options::*;

fn configure_logging(args: &ProvctlArgs) {
    if let Some(logging_config) = &args.logging_config {
        match log4rs::init_file(logging_config, Default::default()) {
            Ok(_) => return,
            Err(e) => eprintln!(
                "ERROR: failed to configure logging using {} with {:?}. Continuing with default logging.",
                logging_config, e
            ),
        }
    }

    // if there's no config, prepare one using stderr so stdout carries only command output
    let stderr = ConsoleAppender::builder()
        .target(Target::Stderr)
        .encoder(Box::new(PatternEncoder::new("{m}{n}")))
        .build();
    match Config::builder()
        .appender(Appender::builder().build("stderr", Box::new(stderr)))
        .build(Root::builder().appender("stderr").build(LevelFilter::Info))
    {
        Ok(config) => {
            if let Err(e) = log4rs::init_config(config) {
                eprintln!(
                    "ERROR: failed to configure logging for stderr with {:?}. Continuing without logging.",
                    e
                );
            }
        }
        Err(e) => {
            eprintln!("ERROR: failed to prepare default logging configuration with {:?}. Continuing without logging", e);
        }
    }
}

/// Point of entry for provctl application.
fn main() -> ExitCode {
    let args = ProvctlArgs::parse();
    configure_logging(&args);
    debug!("provctl start");

    let result = match &args.command {
        Command::Provisioner(cmd) => provisioner_command(&args, cmd),
    };

    debug!("provctl end");
    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{}", e);
            ExitCode::FAILURE
        }
    }
}
