use regex::Regex;
use std::sync::LazyLock;

static BOLD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*").expect("bold pattern"));

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Renders analysis text for the dashboard: escapes HTML, turns `**x**` into
/// `<strong>x</strong>` and line breaks into `<br />`. Bold never spans lines.
pub fn format_analysis_text(text: &str) -> String {
    let escaped = escape_html(text);
    let bolded = BOLD.replace_all(&escaped, "<strong>$1</strong>");
    bolded.replace("\r\n", "\n").replace('\n', "<br />")
}

pub fn current_version() -> String {
    if let Ok(v) = std::env::var("FINCONTRACT_VERSION") {
        let trimmed = v.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }
    format!("v{}", env!("CARGO_PKG_VERSION"))
}
