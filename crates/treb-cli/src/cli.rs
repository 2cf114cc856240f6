// SPDX-License-Identifier: GPL-3.0

use std::{
	fmt::Display,
	io::Result,
	sync::{Arc, Mutex},
};
#[cfg(test)]
pub(crate) use tests::MockCli;

pub(crate) mod traits {
	use std::{fmt::Display, io::Result};

	/// Where commands report progress and outcomes.
	///
	/// Every command opens with [`Cli::intro`] and, when it succeeds, closes with [`Cli::outro`].
	/// Messages in between describe what happened to the forks and the registry.
	pub trait Cli {
		/// Whether a JSON document is printed on stdout once the command completes.
		fn is_json(&self) -> bool;
		/// Reports a failure that does not abort the command.
		fn error(&mut self, text: impl Display) -> Result<()>;
		/// Reports a fact about a fork or a run.
		fn info(&mut self, text: impl Display) -> Result<()>;
		/// Names what the command is about to do.
		fn intro(&mut self, title: impl Display) -> Result<()>;
		/// Summarises a completed command.
		fn outro(&mut self, message: impl Display) -> Result<()>;
		/// Closes a command that failed.
		fn outro_cancel(&mut self, message: impl Display) -> Result<()>;
		/// Reports a step that completed.
		fn success(&mut self, message: impl Display) -> Result<()>;
		/// Reports something needing attention, such as a dead fork.
		fn warning(&mut self, message: impl Display) -> Result<()>;
		/// Prints text verbatim, such as script output or history rows.
		fn plain(&mut self, message: impl Display) -> Result<()>;
		/// Progress indicator for a node start or a script run.
		fn spinner(&mut self) -> Box<dyn Spinner + Send>;
	}

	/// Shows that a long-running step is in progress.
	pub trait Spinner: Send {
		/// Shows `message` while the step runs.
		fn start(&self, message: &str);
		/// Replaces the indicator with `message` once the step completed.
		fn stop(&self, message: &str);
		/// Replaces the indicator with `message` once the step failed.
		fn error(&self, message: &str);
	}
}

/// Terminal output through cliclack. With `--json`, messages go to stderr and stdout is left
/// to the response document.
pub(crate) struct Cli {
	pub(crate) json: bool,
}

impl Cli {
	fn log(&self, message: impl Display, human: impl FnOnce(String) -> Result<()>) -> Result<()> {
		if self.json {
			eprintln!("{message}");
			Ok(())
		} else {
			human(message.to_string())
		}
	}
}

impl traits::Cli for Cli {
	fn is_json(&self) -> bool {
		self.json
	}

	fn error(&mut self, text: impl Display) -> Result<()> {
		self.log(text, cliclack::log::error)
	}

	fn info(&mut self, text: impl Display) -> Result<()> {
		self.log(text, cliclack::log::info)
	}

	fn intro(&mut self, title: impl Display) -> Result<()> {
		if self.json {
			return Ok(());
		}
		cliclack::set_theme(crate::style::Theme);
		cliclack::intro(format!("{}: {title}", console::style(" treb ").black().on_cyan()))
	}

	fn outro(&mut self, message: impl Display) -> Result<()> {
		self.log(message, cliclack::outro)
	}

	fn outro_cancel(&mut self, message: impl Display) -> Result<()> {
		self.log(message, cliclack::outro_cancel)
	}

	fn success(&mut self, message: impl Display) -> Result<()> {
		self.log(message, cliclack::log::success)
	}

	fn warning(&mut self, message: impl Display) -> Result<()> {
		self.log(message, cliclack::log::warning)
	}

	fn plain(&mut self, message: impl Display) -> Result<()> {
		self.log(message, |message| {
			println!("{message}");
			Ok(())
		})
	}

	fn spinner(&mut self) -> Box<dyn traits::Spinner + Send> {
		Box::new(Spinner { bar: Arc::default(), json: self.json })
	}
}

/// A cliclack spinner. In JSON mode its messages are written to stderr instead.
#[derive(Clone)]
struct Spinner {
	bar: Arc<Mutex<Option<cliclack::ProgressBar>>>,
	json: bool,
}

impl Spinner {
	/// Ends the running indicator with `finish`, or writes `message` to stderr in JSON mode.
	fn finish(&self, message: &str, finish: impl FnOnce(&cliclack::ProgressBar, &str)) {
		let Ok(mut bar) = self.bar.lock() else {
			return;
		};
		match bar.take() {
			Some(bar) => finish(&bar, message),
			None if self.json => eprintln!("{message}"),
			None => {},
		}
	}
}

impl traits::Spinner for Spinner {
	fn start(&self, message: &str) {
		if self.json {
			eprintln!("{message}");
			return;
		}
		let bar = cliclack::spinner();
		bar.start(message);
		if let Ok(mut slot) = self.bar.lock() {
			*slot = Some(bar);
		}
	}

	fn stop(&self, message: &str) {
		self.finish(message, |bar, message| bar.stop(message));
	}

	fn error(&self, message: &str) {
		self.finish(message, |bar, message| bar.error(message));
	}
}
