//! Shared helper functions for CLI commands

/// Truncate a string to `max_chars` characters, adding "..." if truncated
pub fn truncate_str(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_chars.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Escape a string for CSV output
///
/// Handles commas, quotes, and newlines according to RFC 4180.
pub fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

/// Fixed-precision number, "-" when not finite
pub fn format_float(value: f64, precision: usize) -> String {
    if value.is_finite() {
        format!("{:.prec$}", value, prec = precision)
    } else {
        "-".to_string()
    }
}

/// Fixed-precision optional number, "-" when absent or not finite
pub fn format_opt(value: Option<f64>, precision: usize) -> String {
    value.map_or_else(|| "-".to_string(), |v| format_float(v, precision))
}

/// Validate a target yield given on the command line
pub fn parse_yield(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|_| format!("'{}' is not a number", s))?;
    if value > 0.0 && value < 1.0 {
        Ok(value)
    } else {
        Err(format!("yield must lie between 0 and 1 (exclusive), got {}", value))
    }
}
