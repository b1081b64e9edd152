use std::fmt;
use std::str::FromStr;

use crate::error::SegmentError;

/// Time range of the source clip a step operates on
#[derive(Debug, Clone, PartialEq)]
pub struct Segment {
    start: String,
    end: String,
}

impl Segment {
    pub fn start(&self) -> &str {
        &self.start
    }

    pub fn end(&self) -> &str {
        &self.end
    }

    /// Seek arguments placed before the tool's `-i`
    pub fn seek_args(&self) -> [String; 4] {
        [
            "-ss".into(),
            self.start.clone(),
            "-to".into(),
            self.end.clone(),
        ]
    }
}

/// `HH:MM:SS`, `MM:SS` or `SS`, seconds may be fractional
fn timestamp_secs(text: &str) -> Option<f64> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.is_empty() || parts.len() > 3 {
        return None;
    }
    let mut total = 0.0;
    for part in &parts {
        if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        total = total * 60.0 + part.parse::<f64>().ok()?;
    }
    Some(total)
}

impl FromStr for Segment {
    type Err = SegmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let format_err = || SegmentError::Format(s.to_string());
        let (start, end) = s.trim().split_once('-').ok_or_else(format_err)?;
        let (start, end) = (start.trim(), end.trim());
        let start_secs = timestamp_secs(start).ok_or_else(format_err)?;
        let end_secs = timestamp_secs(end).ok_or_else(format_err)?;
        if end_secs <= start_secs {
            return Err(SegmentError::Empty {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(Self {
            start: start.to_string(),
            end: end.to_string(),
        })
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start, self.end)
    }
}
