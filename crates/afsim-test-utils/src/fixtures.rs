//! Writers for text result files.

use std::fmt::Write as _;
use std::path::Path;

/// Write a delimited file with a header row. Cells are written verbatim.
pub fn write_csv(path: &Path, delimiter: char, header: &[&str], rows: &[Vec<String>]) {
    let mut out = String::new();
    out.push_str(&header.join(&delimiter.to_string()));
    out.push('\n');
    for row in rows {
        out.push_str(&row.join(&delimiter.to_string()));
        out.push('\n');
    }
    std::fs::write(path, out).expect("write csv fixture");
}

/// Platform-state CSV with `n` rows: time, platform, lat, lon, alt, speed.
/// Row `i` (0-based) belongs to `blue_<i % 3>` at time `i`.
pub fn platform_state_csv(path: &Path, n: usize) {
    let rows: Vec<Vec<String>> = (0..n)
        .map(|i| {
            vec![
                format!("{i}"),
                format!("blue_{}", i % 3),
                format!("{:.4}", 38.0 + i as f64 * 0.001),
                format!("{:.4}", -77.0 - i as f64 * 0.001),
                format!("{}", 1000 + i * 10),
                format!("{}", 200 + i % 50),
            ]
        })
        .collect();
    write_csv(
        path,
        ',',
        &["time", "platform", "lat", "lon", "alt", "speed"],
        &rows,
    );
}

/// Builds an `.evt` event log line by line.
#[derive(Default)]
pub struct EvtBuilder {
    text: String,
}

impl EvtBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<time> <event> <fields...>`.
    pub fn event(mut self, time: &str, event: &str, fields: &[&str]) -> Self {
        let _ = write!(self.text, "{time} {event}");
        for f in fields {
            let _ = write!(self.text, " {f}");
        }
        self.text.push('\n');
        self
    }

    pub fn comment(mut self, text: &str) -> Self {
        let _ = writeln!(self.text, "# {text}");
        self
    }

    /// A line copied verbatim, for malformed-input tests.
    pub fn raw(mut self, line: &str) -> Self {
        self.text.push_str(line);
        self.text.push('\n');
        self
    }

    pub fn build(self) -> String {
        self.text
    }

    /// Write to `path`, creating parent directories.
    pub fn write(self, path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create evt fixture dir");
        }
        std::fs::write(path, self.text).expect("write evt fixture");
    }
}
