//! Untrusted payload to [`AppConfig`] projection.
//!
//! `normalize` is total: every field that is missing, mistyped or out of
//! range is replaced (or clamped) individually, so one bad field never voids
//! its siblings.

use serde_json::{Map, Value};

use super::font::normalize_font_family;
use super::{
    default_config, AppConfig, MultiplexerMode, StartupConfig, TerminalConfig, ThemeMode,
};

type Section<'a> = Option<&'a Map<String, Value>>;

/// Turn an arbitrary payload into a fully populated, valid configuration.
///
/// A non-object payload yields the default configuration unchanged.
pub fn normalize(candidate: &Value) -> AppConfig {
    let Some(root) = candidate.as_object() else {
        return default_config().clone();
    };

    let startup = root.get("startup").and_then(Value::as_object);
    let terminal = root.get("terminal").and_then(Value::as_object);

    AppConfig {
        startup: normalize_startup(startup),
        terminal: normalize_terminal(terminal),
    }
}

fn normalize_startup(section: Section<'_>) -> StartupConfig {
    let defaults = &default_config().startup;

    StartupConfig {
        multiplexer: field(section, "multiplexer")
            .and_then(Value::as_str)
            .and_then(MultiplexerMode::parse)
            .unwrap_or(defaults.multiplexer),
        shell: field(section, "shell")
            .and_then(Value::as_str)
            .map(str::to_string),
        shell_args: as_string_list(field(section, "shell_args"))
            .unwrap_or_else(|| defaults.shell_args.clone()),
        zellij_command: as_command(field(section, "zellij_command"), &defaults.zellij_command),
        tmux_command: as_command(field(section, "tmux_command"), &defaults.tmux_command),
    }
}

fn normalize_terminal(section: Section<'_>) -> TerminalConfig {
    let defaults = &default_config().terminal;

    TerminalConfig {
        theme: field(section, "theme")
            .and_then(Value::as_str)
            .and_then(ThemeMode::parse)
            .unwrap_or(defaults.theme),
        font_family: field(section, "font_family")
            .and_then(Value::as_str)
            .and_then(normalize_font_family)
            .unwrap_or_else(|| defaults.font_family.clone()),
        font_size: as_clamped(field(section, "font_size"), defaults.font_size, 8.0, 72.0),
        letter_spacing: as_clamped(
            field(section, "letter_spacing"),
            defaults.letter_spacing,
            -10.0,
            10.0,
        ),
        line_height: as_clamped(field(section, "line_height"), defaults.line_height, 1.0, 2.5),
        scrollback: as_clamped(
            field(section, "scrollback"),
            f64::from(defaults.scrollback),
            100.0,
            200_000.0,
        )
        .round() as u32,
    }
}

fn field<'a>(section: Section<'a>, key: &str) -> Option<&'a Value> {
    section.and_then(|map| map.get(key))
}

/// Non-blank strings are kept verbatim, anything else falls back
fn as_command(value: Option<&Value>, fallback: &str) -> String {
    value
        .and_then(Value::as_str)
        .filter(|command| !command.trim().is_empty())
        .unwrap_or(fallback)
        .to_string()
}

/// All-or-nothing: one non-string element rejects the whole list
fn as_string_list(value: Option<&Value>) -> Option<Vec<String>> {
    value?
        .as_array()?
        .iter()
        .map(|entry| entry.as_str().map(str::to_string))
        .collect()
}

fn as_clamped(value: Option<&Value>, fallback: f64, min: f64, max: f64) -> f64 {
    match value.and_then(Value::as_f64) {
        Some(number) if number.is_finite() => number.clamp(min, max),
        _ => fallback,
    }
}
