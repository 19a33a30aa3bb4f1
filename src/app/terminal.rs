use std::io::IsTerminal;

use crate::app::config::VerbositySetting;
use crate::cli::Args;

pub(crate) fn no_color_env_requested() -> bool {
    std::env::var_os("NO_COLOR").is_some_and(|value| !value.is_empty())
}

pub(crate) fn is_dumb_terminal() -> bool {
    std::env::var("TERM")
        .map(|value| value.eq_ignore_ascii_case("dumb"))
        .unwrap_or(false)
}

pub(crate) fn should_disable_color(config_no_color: bool, no_color_env: bool, dumb_terminal: bool) -> bool {
    config_no_color || no_color_env || dumb_terminal
}

pub(crate) fn is_no_color_requested(config_no_color: Option<bool>) -> bool {
    should_disable_color(
        config_no_color.unwrap_or(false),
        no_color_env_requested(),
        is_dumb_terminal(),
    )
}

pub(crate) fn should_use_progress_bar(stderr_is_terminal: bool, quiet: bool, dumb_terminal: bool) -> bool {
    stderr_is_terminal && !quiet && !dumb_terminal
}

pub(crate) fn progress_bar_enabled(args: &Args) -> bool {
    should_use_progress_bar(std::io::stderr().is_terminal(), args.quiet, is_dumb_terminal())
}

/// Default filter level.
///
/// Priority: `-q` > `-v`/`-vv` > config `verbosity` > info. `RUST_LOG`
/// overrides all of these in [`init_tracing`].
pub(crate) fn resolve_default_log_level(quiet: bool, verbose: u8, config: Option<VerbositySetting>) -> &'static str {
    if quiet {
        return "error";
    }
    match verbose {
        0 => config.map_or("info", VerbositySetting::level),
        1 => "debug",
        _ => "trace",
    }
}

pub(crate) fn init_tracing(default_level: &str, no_color: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_ansi(!no_color)
        .with_env_filter(filter)
        .try_init();
}
