//! Capture timestamp parsing
//!
//! Inspection reports print the measurement time as a 12-hour clock with a
//! localized forenoon/afternoon marker, e.g. `2023/01/01 下午 01:23:45`. A few
//! plain numeric layouts are accepted as fallbacks.

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use std::sync::OnceLock;

const FALLBACK_FORMATS: [&str; 3] = ["%Y/%m/%d %H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %p %I:%M:%S"];

fn twelve_hour_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d+)/(\d+)/(\d+)\s+(上午|下午|午前|午後|AM|PM)\s*(\d+):(\d+):(\d+)")
            .expect("valid timestamp pattern")
    })
}

/// Pattern locating an embedded 12-hour timestamp inside a longer text line
pub fn embedded_timestamp_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(\d{4}/\d{1,2}/\d{1,2}\s+(?:上午|下午|午前|午後|AM|PM)\s*\d{1,2}:\d{1,2}:\d{1,2})")
            .expect("valid embedded timestamp pattern")
    })
}

/// Forenoon/afternoon marker of a 12-hour clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Meridiem {
    Forenoon,
    Afternoon,
}

impl Meridiem {
    fn parse(token: &str) -> Option<Self> {
        match token {
            "上午" | "午前" | "AM" => Some(Meridiem::Forenoon),
            "下午" | "午後" | "PM" => Some(Meridiem::Afternoon),
            _ => None,
        }
    }

    /// Convert a 12-hour clock hour into 0-23
    fn to_24h(self, hour: u32) -> u32 {
        match self {
            Meridiem::Afternoon if hour < 12 => hour + 12,
            Meridiem::Forenoon if hour == 12 => 0,
            _ => hour,
        }
    }
}

/// Parse a capture timestamp; unparseable input yields `None`
pub fn parse_capture_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    if let Some(caps) = twelve_hour_pattern().captures(text) {
        let num = |i: usize| caps.get(i).and_then(|m| m.as_str().parse::<u32>().ok());
        let year = caps.get(1)?.as_str().parse::<i32>().ok()?;
        let meridiem = Meridiem::parse(caps.get(4)?.as_str())?;
        let hour = meridiem.to_24h(num(5)?);
        return NaiveDate::from_ymd_opt(year, num(2)?, num(3)?)?.and_hms_opt(hour, num(6)?, num(7)?);
    }

    FALLBACK_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
}
