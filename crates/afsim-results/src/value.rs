//! Typing of textual cells and simulation-time parsing.

use afsim_core::FieldValue;

/// Parse `HH:MM:SS[.fff]` into seconds. Hours may exceed 23.
pub fn parse_clock(s: &str) -> Option<f64> {
    let mut parts = s.split(':');
    let h = parts.next()?;
    let m = parts.next()?;
    let sec = parts.next()?;
    if parts.next().is_some() {
        return None;
    }
    let digits = |t: &str| !t.is_empty() && t.bytes().all(|b| b.is_ascii_digit());
    if !digits(h) || !digits(m) {
        return None;
    }
    let (whole, frac) = match sec.split_once('.') {
        Some((w, f)) if digits(f) => (w, Some(f)),
        Some(_) => return None,
        None => (sec, None),
    };
    if !digits(whole) {
        return None;
    }
    let h: f64 = h.parse().ok()?;
    let m: f64 = m.parse().ok()?;
    let s: f64 = match frac {
        Some(f) => format!("{whole}.{f}").parse().ok()?,
        None => whole.parse().ok()?,
    };
    if m >= 60.0 || s >= 60.0 {
        return None;
    }
    Some(h * 3600.0 + m * 60.0 + s)
}

/// Parse a simulation time given as seconds or as a clock.
pub fn parse_time(s: &str) -> Option<f64> {
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Some(v),
        _ => parse_clock(s),
    }
}

/// Whether a column name denotes simulation time.
pub fn is_time_column(name: &str) -> bool {
    let n = name.trim().to_ascii_lowercase();
    matches!(
        n.as_str(),
        "time" | "t" | "sim_time" | "simtime" | "simulation_time" | "time_s" | "timestamp"
    ) || n.ends_with("_time")
}

/// Type a raw cell of column `column`.
///
/// Time columns yield timestamps; other finite numbers yield numbers; a
/// clock literal anywhere yields a timestamp; anything else is text.
pub fn type_cell(column: &str, raw: &str) -> FieldValue {
    let raw = raw.trim();
    if is_time_column(column) {
        if let Some(t) = parse_time(raw) {
            return FieldValue::Timestamp(t);
        }
    }
    match raw.parse::<f64>() {
        Ok(v) if v.is_finite() => FieldValue::Number(v),
        _ => match parse_clock(raw) {
            Some(t) => FieldValue::Timestamp(t),
            None => FieldValue::Text(raw.to_string()),
        },
    }
}
