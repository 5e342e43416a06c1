use std::path::Path;
use std::time::Duration;

use crate::foundation::error::{ReelError, ReelResult};

/// One timed caption unit.
///
/// Multi-line cue text is joined with `'\n'`; the rasterizer treats those as forced line breaks.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptionCue {
    /// Offset from the start of the narration.
    pub start: Duration,
    /// Exclusive end offset.
    pub end: Duration,
    pub text: String,
}

impl CaptionCue {
    pub fn new(start: Duration, end: Duration, text: impl Into<String>) -> Self {
        Self {
            start,
            end,
            text: text.into(),
        }
    }

    /// Convenience constructor from seconds (negative values clamp to zero).
    pub fn from_secs(start: f64, end: f64, text: impl Into<String>) -> Self {
        Self::new(secs_to_duration(start), secs_to_duration(end), text)
    }

    pub fn duration(&self) -> Duration {
        self.end.saturating_sub(self.start)
    }

    /// `true` when `t` lies in `[start, end)`.
    pub fn is_active_at(&self, t: Duration) -> bool {
        self.start <= t && t < self.end
    }

    /// Clamp the cue end to `total`, returning `None` when nothing of the cue remains.
    pub fn clamped_to(&self, total: Duration) -> Option<CaptionCue> {
        let end = self.end.min(total);
        if self.start >= end {
            return None;
        }
        Some(CaptionCue {
            start: self.start,
            end,
            text: self.text.clone(),
        })
    }
}

fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_finite() && secs > 0.0 {
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    } else {
        Duration::ZERO
    }
}

/// A timed-text block that could not be turned into a cue.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("malformed cue block {block_index} (line {line}): {reason}")]
pub struct MalformedCueError {
    /// 0-based index of the block among the cue blocks of the input.
    pub block_index: usize,
    /// 1-based line number where the block starts.
    pub line: usize,
    pub reason: String,
}

/// Result of parsing a timed-text stream: the usable cues plus every rejected block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ParsedCues {
    pub cues: Vec<CaptionCue>,
    pub errors: Vec<MalformedCueError>,
}

impl ParsedCues {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Parse WebVTT-like timed text.
///
/// Accepted block shape: an optional identifier line, a timing line
/// `START --> END [settings]`, then one or more text lines; blocks are blank-line separated.
/// `WEBVTT` headers and `NOTE`/`STYLE`/`REGION` blocks are skipped. Malformed blocks are
/// collected into [`ParsedCues::errors`] and parsing continues with the next block.
pub fn parse_cues(input: &str) -> ParsedCues {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut out = ParsedCues::default();
    let mut block_index = 0usize;

    for block in split_blocks(input) {
        if is_non_cue_block(&block) {
            continue;
        }
        match parse_block(&block) {
            Ok(cue) => out.cues.push(cue),
            Err(reason) => {
                tracing::warn!(block_index, line = block.first_line, %reason, "skipping malformed cue block");
                out.errors.push(MalformedCueError {
                    block_index,
                    line: block.first_line,
                    reason,
                });
            }
        }
        block_index += 1;
    }

    out
}

/// Read and parse a timed-text file.
#[tracing::instrument]
pub fn parse_cue_file(path: &Path) -> ReelResult<ParsedCues> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ReelError::validation(format!("read cue file '{}': {e}", path.display()))
    })?;
    let parsed = parse_cues(&text);
    tracing::debug!(
        cues = parsed.cues.len(),
        malformed = parsed.errors.len(),
        "parsed cue file"
    );
    Ok(parsed)
}

/// Parse `HH:MM:SS.mmm`, `MM:SS.mmm`, or the SRT form `HH:MM:SS,mmm`.
pub fn parse_timestamp(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    let parts: Vec<&str> = s.split(':').collect();
    let (hours, minutes, sec_part) = match parts.as_slice() {
        [h, m, sec] => (parse_field(h, "hours")?, parse_field(m, "minutes")?, *sec),
        [m, sec] => (0, parse_field(m, "minutes")?, *sec),
        _ => return Err(format!("timestamp \"{s}\" must be HH:MM:SS.mmm or MM:SS.mmm")),
    };
    if parts.len() == 3 && minutes >= 60 {
        return Err(format!("timestamp \"{s}\" has minutes >= 60"));
    }

    let (whole, frac) = match sec_part.split_once(['.', ',']) {
        Some((w, f)) => (w, Some(f)),
        None => (sec_part, None),
    };
    let seconds = parse_field(whole, "seconds")?;
    if seconds >= 60 {
        return Err(format!("timestamp \"{s}\" has seconds >= 60"));
    }

    let nanos = match frac {
        None => 0,
        Some(f) => {
            if f.is_empty() || f.len() > 9 || !f.bytes().all(|b| b.is_ascii_digit()) {
                return Err(format!("timestamp \"{s}\" has an invalid fractional part"));
            }
            let digits: u32 = f
                .parse()
                .map_err(|_| format!("timestamp \"{s}\" has an invalid fractional part"))?;
            digits * 10u32.pow(9 - f.len() as u32)
        }
    };

    let total_secs = hours
        .checked_mul(3600)
        .and_then(|h| minutes.checked_mul(60).and_then(|m| h.checked_add(m)))
        .and_then(|v| v.checked_add(seconds))
        .ok_or_else(|| format!("timestamp \"{s}\" is out of range"))?;
    Ok(Duration::new(total_secs, nanos))
}

fn parse_field(v: &str, what: &str) -> Result<u64, String> {
    if v.is_empty() || !v.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("invalid {what} field \"{v}\""));
    }
    v.parse::<u64>()
        .map_err(|_| format!("invalid {what} field \"{v}\""))
}

struct Block<'a> {
    first_line: usize,
    lines: Vec<&'a str>,
}

fn split_blocks(input: &str) -> Vec<Block<'_>> {
    let mut blocks = Vec::new();
    let mut cur: Option<Block<'_>> = None;
    for (i, raw) in input.lines().enumerate() {
        let line = raw.trim_end_matches('\r');
        if line.trim().is_empty() {
            if let Some(b) = cur.take() {
                blocks.push(b);
            }
            continue;
        }
        cur.get_or_insert_with(|| Block {
            first_line: i + 1,
            lines: Vec::new(),
        })
        .lines
        .push(line);
    }
    if let Some(b) = cur {
        blocks.push(b);
    }
    blocks
}

fn is_non_cue_block(block: &Block<'_>) -> bool {
    let Some(first) = block.lines.first() else {
        return true;
    };
    let first = first.trim_start();
    let has_timing = block.lines.iter().any(|l| l.contains("-->"));
    // A header glued to the first cue (no blank line) still yields that cue.
    if first.starts_with("WEBVTT") {
        return !has_timing;
    }
    first == "NOTE" || first.starts_with("NOTE ") || first == "STYLE" || first == "REGION"
}

fn parse_block(block: &Block<'_>) -> Result<CaptionCue, String> {
    let timing_pos = block
        .lines
        .iter()
        .position(|l| l.contains("-->"))
        .ok_or_else(|| "missing \"-->\" timing line".to_owned())?;
    let timing = block.lines[timing_pos];

    let (lhs, rhs) = timing
        .split_once("-->")
        .ok_or_else(|| "missing \"-->\" timing line".to_owned())?;
    let start = parse_timestamp(lhs)?;
    let end_token = rhs
        .split_whitespace()
        .next()
        .ok_or_else(|| "missing end timestamp".to_owned())?;
    let end = parse_timestamp(end_token)?;

    let text = block.lines[timing_pos + 1..]
        .iter()
        .map(|l| l.trim())
        .collect::<Vec<_>>()
        .join("\n");

    Ok(CaptionCue { start, end, text })
}

/// Clamp every cue to `total`, dropping cues that end up empty.
///
/// Returns the surviving cues in input order and the number dropped.
pub fn clamp_cues(cues: &[CaptionCue], total: Duration) -> (Vec<CaptionCue>, usize) {
    let kept: Vec<CaptionCue> = cues.iter().filter_map(|c| c.clamped_to(total)).collect();
    let dropped = cues.len() - kept.len();
    (kept, dropped)
}

#[cfg(test)]
#[path = "../../tests/unit/captions/cue.rs"]
mod tests;
