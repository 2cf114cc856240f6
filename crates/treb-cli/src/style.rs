// SPDX-License-Identifier: GPL-3.0

use cliclack::ThemeState;
use console::{Style, style};

pub(crate) fn get_styles() -> clap::builder::Styles {
	use clap::builder::styling::{AnsiColor, Color, Style};
	clap::builder::Styles::styled()
		.usage(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightCyan))))
		.header(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::BrightCyan))))
		.literal(Style::new().fg_color(Some(Color::Ansi(AnsiColor::BrightYellow))))
		.invalid(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
		.error(Style::new().bold().fg_color(Some(Color::Ansi(AnsiColor::Red))))
		.valid(Style::new().bold().underline().fg_color(Some(Color::Ansi(AnsiColor::BrightYellow))))
		.placeholder(Style::new().fg_color(Some(Color::Ansi(AnsiColor::White))))
}

pub(crate) struct Theme;

impl cliclack::Theme for Theme {
	fn bar_color(&self, state: &ThemeState) -> Style {
		match state {
			ThemeState::Active => Style::new().bright().cyan(),
			ThemeState::Error(_) => Style::new().bright().red(),
			_ => Style::new().cyan().dim(),
		}
	}

	fn state_symbol_color(&self, _state: &ThemeState) -> Style {
		Style::new().bright().cyan()
	}
}

/// Formats an URL with bold and underlined style.
pub(crate) fn format_url(url: &str) -> String {
	format!("{}", style(url).bold().underlined())
}

/// Formats a duration in seconds the way fork uptimes are shown, e.g. `2h 5m`.
pub(crate) fn format_uptime(secs: u64) -> String {
	let (days, hours, minutes) = (secs / 86_400, (secs % 86_400) / 3_600, (secs % 3_600) / 60);
	match (days, hours, minutes) {
		(0, 0, 0) => format!("{secs}s"),
		(0, 0, m) => format!("{m}m {}s", secs % 60),
		(0, h, m) => format!("{h}h {m}m"),
		(d, h, _) => format!("{d}d {h}h"),
	}
}
