//! Stack-trace snapshots for cross-isolate error chaining.
//!
//! A `StackTrace` records the logical call site at the moment a cross-isolate
//! task is issued: one frame per isolate entered on the calling thread,
//! innermost first. It crosses thread boundaries freely (it is plain data)
//! and is appended to errors that travel back to the caller, so a rejection
//! carries the full cross-isolate causality chain instead of only the frame
//! where the error happened.

use std::fmt;

/// A snapshot of the logical call stack at one point in time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackTrace {
    frames: Vec<String>,
}

impl StackTrace {
    /// Build a snapshot from pre-rendered frames (innermost first).
    pub fn from_frames(frames: Vec<String>) -> Self {
        Self { frames }
    }

    /// An empty snapshot (no isolate was entered).
    pub fn empty() -> Self {
        Self { frames: Vec::new() }
    }

    pub fn frames(&self) -> &[String] {
        &self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Render the snapshot the way it is embedded into error stacks.
    pub fn render(&self) -> String {
        self.frames.join("\n    ")
    }
}

impl fmt::Display for StackTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_joins_frames_innermost_first() {
        let trace = StackTrace::from_frames(vec![
            "at worker (isolate-X)".to_string(),
            "at default (isolate-Y)".to_string(),
        ]);
        let rendered = trace.render();
        assert!(rendered.starts_with("at worker"));
        assert!(rendered.contains("at default"));
    }

    #[test]
    fn empty_trace_renders_empty() {
        assert_eq!(StackTrace::empty().render(), "");
        assert!(StackTrace::empty().is_empty());
    }
}
