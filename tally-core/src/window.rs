//! Optional search window taken from `--start-date` / `--end-date`.
//!
//! Flags use the human layout `Jan 2, 2006 at 3:04pm (MST)`. The zone is an
//! abbreviation; known ones map to their offset and anything else is read as
//! offset zero. RFC 3339 is accepted as well.
use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use std::sync::OnceLock;
use time::OffsetDateTime;

/// Example of the accepted layout, shown in CLI help.
pub const FLAG_LAYOUT: &str = "Jan 2, 2006 at 3:04pm (MST)";

const LOCAL_FORMAT: &str = "%b %d, %Y at %I:%M%p";

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum WindowError {
    #[error("cannot parse time {input:?}: {reason} (expected e.g. \"{FLAG_LAYOUT}\")")]
    Parse { input: String, reason: String },

    #[error("time window ends ({end}) before it starts ({start})")]
    Inverted {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("timestamp out of range for conversion: {0}")]
    OutOfRange(DateTime<Utc>),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl TimeWindow {
    /// Parse both flags; blank values mean "unbounded".
    pub fn from_flags(start: Option<&str>, end: Option<&str>) -> Result<Self, WindowError> {
        let window = Self {
            start: parse_optional(start)?,
            end: parse_optional(end)?,
        };
        if let (Some(start), Some(end)) = (window.start, window.end) {
            if end < start {
                return Err(WindowError::Inverted { start, end });
            }
        }
        Ok(window)
    }

    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    /// Bounds in the representation the social client expects.
    pub fn to_offsets(
        &self,
    ) -> Result<(Option<OffsetDateTime>, Option<OffsetDateTime>), WindowError> {
        Ok((
            self.start.map(chrono_to_offset).transpose()?,
            self.end.map(chrono_to_offset).transpose()?,
        ))
    }
}

fn parse_optional(raw: Option<&str>) -> Result<Option<DateTime<Utc>>, WindowError> {
    match raw.map(str::trim) {
        None | Some("") => Ok(None),
        Some(s) => parse_flag_time(s).map(Some),
    }
}

fn zone_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(?P<local>.+?)\s*\((?P<zone>[A-Za-z][A-Za-z0-9+\-]*)\)$")
            .expect("zone pattern compiles")
    })
}

fn zone_offset_hours(abbrev: &str) -> Option<i32> {
    let hours = match abbrev.to_ascii_uppercase().as_str() {
        "UTC" | "GMT" | "Z" => 0,
        "BST" | "CET" => 1,
        "CEST" => 2,
        "EDT" => -4,
        "EST" | "CDT" => -5,
        "CST" | "MDT" => -6,
        "MST" | "PDT" => -7,
        "PST" => -8,
        _ => return None,
    };
    Some(hours)
}

/// Parse one `--start-date` / `--end-date` value into UTC.
pub fn parse_flag_time(raw: &str) -> Result<DateTime<Utc>, WindowError> {
    let input = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(input) {
        return Ok(dt.with_timezone(&Utc));
    }

    let fail = |reason: String| WindowError::Parse {
        input: input.to_string(),
        reason,
    };

    let caps = zone_pattern()
        .captures(input)
        .ok_or_else(|| fail("missing \"(ZONE)\" suffix".into()))?;
    let local = &caps["local"];
    let zone = &caps["zone"];

    let naive = NaiveDateTime::parse_from_str(local, LOCAL_FORMAT).map_err(|e| fail(e.to_string()))?;

    let hours = zone_offset_hours(zone).unwrap_or_else(|| {
        tracing::warn!(zone, "unknown time zone abbreviation, assuming UTC offset");
        0
    });
    let offset = FixedOffset::east_opt(hours * 3600)
        .ok_or_else(|| fail(format!("offset out of range for {zone}")))?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| fail("ambiguous local time".into()))
}

fn chrono_to_offset(dt: DateTime<Utc>) -> Result<OffsetDateTime, WindowError> {
    let nanos = dt
        .timestamp_nanos_opt()
        .ok_or(WindowError::OutOfRange(dt))?;
    OffsetDateTime::from_unix_timestamp_nanos(nanos.into()).map_err(|_| WindowError::OutOfRange(dt))
}
