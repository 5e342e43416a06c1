//! Caption cues and the timed-text parser that produces them.

pub mod cue;

pub use cue::{CaptionCue, MalformedCueError, ParsedCues, clamp_cues, parse_cue_file, parse_cues};
