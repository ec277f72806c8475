use crate::http::RequestError;
use crate::profile::Profile;
use anstyle::{AnsiColor, Style};
use std::io::{self, Write};

fn pretty_print_json_colored(value: &serde_json::Value) -> String {
    use colored_json::{Color, ColoredFormatter, PrettyFormatter, Styler};
    let styler = Styler {
        key: Color::Yellow.bold(),
        ..Default::default()
    };
    let formatter = ColoredFormatter::with_styler(PrettyFormatter::new(), styler);
    formatter
        .to_colored_json_auto(value)
        .unwrap_or_else(|_| serde_json::to_string_pretty(value).unwrap_or_default())
}

fn get_status_style(status: u16) -> Style {
    match status {
        400..=499 => Style::new()
            .fg_color(Some(anstyle::Color::Ansi(AnsiColor::Yellow)))
            .bold(),
        500..=599 => Style::new()
            .fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)))
            .bold(),
        _ => Style::new()
            .fg_color(Some(anstyle::Color::Ansi(AnsiColor::White)))
            .bold(),
    }
}

fn format_status_line(err: &RequestError) -> String {
    let status_style = get_status_style(err.status_code());
    format!(
        "{}{}{}\n",
        status_style.render(),
        err,
        anstyle::Reset.render()
    )
}

/// Response body for display: JSON is pretty-printed and colored, anything
/// else (`format=yaml`, `_cat` tables) is shown as received.
pub fn format_body(body: &[u8]) -> String {
    match serde_json::from_slice::<serde_json::Value>(body) {
        Ok(json) => pretty_print_json_colored(&json),
        Err(_) => String::from_utf8_lossy(body).trim_end().to_string(),
    }
}

/// Error status line followed by the server's explanation.
pub fn format_request_error(err: &RequestError) -> String {
    let mut output = format_status_line(err);
    match serde_json::from_slice::<serde_json::Value>(err.raw_body()) {
        Ok(json) if json.is_object() => output.push_str(&pretty_print_json_colored(&json)),
        _ => output.push_str(&err.response()),
    }
    output
}

/// Profile names one per line, or with `long` a table of name, user and
/// endpoint.
pub fn format_profiles(profiles: &[Profile], long: bool) -> String {
    if !long {
        return profiles
            .iter()
            .map(|p| format!("{}\n", p.name))
            .collect();
    }
    let header = ["Name", "UserName", "Endpoint-url"];
    let name_width = profiles
        .iter()
        .map(|p| p.name.len())
        .chain([header[0].len()])
        .max()
        .unwrap_or_default();
    let user_width = profiles
        .iter()
        .map(|p| p.user_name.len())
        .chain([header[1].len()])
        .max()
        .unwrap_or_default();

    let mut output = String::new();
    let mut row = |name: &str, user: &str, endpoint: &str| {
        output.push_str(&format!(
            "{name:<name_width$}    {user:<user_width$}    {endpoint}\n"
        ));
    };
    row(header[0], header[1], header[2]);
    row("----", "--------", "------------");
    for profile in profiles {
        row(&profile.name, &profile.user_name, &profile.endpoint);
    }
    output
}

pub fn print_body(body: &[u8]) {
    let _ = writeln!(io::stdout(), "{}", format_body(body));
}

pub fn print_request_error(err: &RequestError) {
    let _ = writeln!(io::stdout(), "{}", format_request_error(err));
}

pub fn print_profiles(profiles: &[Profile], long: bool) {
    let _ = write!(io::stdout(), "{}", format_profiles(profiles, long));
}

/// `<command> Command failed.` and the reason, on stderr.
pub fn print_failure<W: Write>(
    writer: &mut W,
    command: &str,
    err: &dyn std::fmt::Display,
    suggestion: Option<&str>,
) -> io::Result<()> {
    let style = Style::new().fg_color(Some(anstyle::Color::Ansi(AnsiColor::Red)));
    writeln!(
        writer,
        "{}{command} Command failed.{}",
        style.render(),
        anstyle::Reset.render()
    )?;
    writeln!(writer, "Reason: {err}")?;
    if let Some(suggestion) = suggestion {
        writeln!(writer, "Suggestion: {suggestion}")?;
    }
    Ok(())
}
