// SPDX-License-Identifier: GPL-3.0

mod cli;
mod commands;
mod common;
mod output;
mod style;

use crate::{
	cli::traits::Cli as _,
	output::{CliError, CliResponse, OutputMode},
};
use clap::Parser;
use commands::{Command, Project};
use std::{path::PathBuf, process::ExitCode};

#[derive(Parser)]
#[command(author, version, about, styles=style::get_styles())]
pub struct Cli {
	/// Print a single JSON document on stdout instead of human readable output.
	#[arg(long, global = true)]
	json: bool,
	/// Root of the project.
	#[arg(long, global = true, value_name = "DIR", default_value = ".")]
	root: PathBuf,
	#[command(subcommand)]
	command: Command,
}

#[tokio::main]
async fn main() -> ExitCode {
	env_logger::init();
	let args = Cli::parse();
	let mode = OutputMode::from_flag(args.json);
	let mut cli = cli::Cli { json: args.json };

	let result = match Project::load(&args.root) {
		Ok(project) => args.command.execute(&project, &mut cli).await,
		Err(e) => Err(e),
	};
	match result {
		Ok(data) => {
			if mode == OutputMode::Json {
				CliResponse::ok(data).print_json();
			}
			ExitCode::SUCCESS
		},
		Err(e) => {
			log::debug!("command failed: {e:?}");
			match mode {
				OutputMode::Json => CliResponse::err(CliError::from_anyhow(&e)).print_json(),
				OutputMode::Human =>
					if cli.outro_cancel(format!("{e:#}")).is_err() {
						eprintln!("Error: {e:#}");
					},
			}
			ExitCode::FAILURE
		},
	}
}

#[test]
fn verify_cli() {
	// https://docs.rs/clap/latest/clap/_derive/_tutorial/chapter_4/index.html
	use clap::CommandFactory;
	Cli::command().debug_assert()
}
