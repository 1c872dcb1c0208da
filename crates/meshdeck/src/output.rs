//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};

use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use meshdeck_core::NodeStatus;
use meshdeck_core::format::{breadcrumb_line, breadcrumbs};

use crate::cli::{ColorMode, OutputFormat};

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stdout().is_terminal() && std::env::var_os("NO_COLOR").is_none(),
    }
}

/// Node status, green when online and red when unreachable.
pub fn status(status: NodeStatus, color: bool) -> String {
    let text = status.to_string();
    if !color {
        return text;
    }
    match status {
        NodeStatus::Online => text.green().to_string(),
        NodeStatus::Warning => text.yellow().to_string(),
        NodeStatus::Offline | NodeStatus::Error => text.red().to_string(),
        NodeStatus::Unknown => text.dimmed().to_string(),
    }
}

/// `yes` / `no`, with `yes` highlighted.
pub fn flag(value: bool, color: bool) -> String {
    match (value, color) {
        (true, true) => "yes".cyan().to_string(),
        (true, false) => "yes".into(),
        (false, _) => "no".into(),
    }
}

/// Comma-joined list, `-` when empty.
pub fn join<T: ToString>(items: &[T]) -> String {
    if items.is_empty() {
        "-".into()
    } else {
        items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Context line for a detail view, e.g. `Networks › office › Nodes`.
pub fn context_line(path: &str, params: &[(&str, &str)], color: bool) -> String {
    let params: HashMap<&str, &str> = params.iter().copied().collect();
    let line = breadcrumb_line(&breadcrumbs(path, &params));
    if color {
        line.dimmed().to_string()
    } else {
        line
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
///
/// - `table`: uses the `Tabled` derive to build a pretty table
/// - `json` / `json-compact`: serializes the original data via serde
/// - `yaml`: serializes via serde_yaml
/// - `plain`: calls `id_fn` on each item to emit one identifier per line
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            render_table(&rows)
        }
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => data.iter().map(&id_fn).collect::<Vec<_>>().join("\n"),
    }
}

/// Render a single serde-serializable item in the chosen format.
///
/// Table rendering uses `detail_fn`, since single-item detail views don't
/// use the `Tabled` derive.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> String
where
    T: serde::Serialize + ?Sized,
{
    match format {
        OutputFormat::Table => detail_fn(data),
        OutputFormat::Json => render_json(data, false),
        OutputFormat::JsonCompact => render_json(data, true),
        OutputFormat::Yaml => render_yaml(data),
        OutputFormat::Plain => id_fn(data),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

/// Confirmation line on stderr, respecting quiet mode.
pub fn done(message: &str, quiet: bool) {
    if !quiet {
        eprintln!("✓ {message}");
    }
}

// ── Format-specific renderers ────────────────────────────────────────

fn render_table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

fn render_json<T: serde::Serialize + ?Sized>(data: &T, compact: bool) -> String {
    let rendered = if compact {
        serde_json::to_string(data)
    } else {
        serde_json::to_string_pretty(data)
    };
    rendered.unwrap_or_else(|e| format!("{{\"error\":\"serialization failed: {e}\"}}"))
}

fn render_yaml<T: serde::Serialize + ?Sized>(data: &T) -> String {
    serde_yaml::to_string(data).unwrap_or_else(|e| format!("error: serialization failed: {e}"))
}

#[cfg(test)]
mod tests {
    use serde::Serialize;

    use super::*;

    #[derive(Serialize)]
    struct Item {
        id: &'static str,
        size: u32,
    }

    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: String,
    }

    fn items() -> Vec<Item> {
        vec![Item { id: "a", size: 1 }, Item { id: "b", size: 2 }]
    }

    fn render(format: &OutputFormat) -> String {
        render_list(
            format,
            &items(),
            |i| ItemRow { id: i.id.into() },
            |i| i.id.into(),
        )
    }

    #[test]
    fn compact_json_keeps_field_order() {
        insta::assert_snapshot!(
            render(&OutputFormat::JsonCompact),
            @r#"[{"id":"a","size":1},{"id":"b","size":2}]"#
        );
    }

    #[test]
    fn plain_prints_one_id_per_line() {
        insta::assert_snapshot!(render(&OutputFormat::Plain), @r"
        a
        b
        ");
    }

    #[test]
    fn table_has_header_and_rows() {
        let table = render(&OutputFormat::Table);
        assert!(table.contains("ID"));
        assert!(table.contains('╭'));
        assert!(table.lines().any(|l| l.contains(" a ")));
        assert!(table.lines().any(|l| l.contains(" b ")));
    }

    #[test]
    fn context_line_without_color() {
        assert_eq!(
            context_line("/networks/office/nodes", &[("network", "office")], false),
            "Networks › office › Nodes"
        );
    }

    #[test]
    fn status_without_color_is_plain() {
        assert_eq!(status(NodeStatus::Online, false), "online");
        assert_eq!(flag(true, false), "yes");
        assert_eq!(join::<String>(&[]), "-");
    }
}
