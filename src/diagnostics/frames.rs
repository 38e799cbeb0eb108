//! Stack frames and source snippets for diagnostic pages.

use crate::exception::Trace;
use std::path::{Path, PathBuf};

/// A single resolved stack frame.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Demangled symbol name, without the trailing hash.
    pub function: String,
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub snippet: Option<Snippet>,
}

/// Source lines surrounding a frame's line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snippet {
    /// Line number of `lines[0]`.
    pub start_line: u32,
    pub highlight_line: u32,
    pub lines: Vec<String>,
}

/// Prefixes of frames captured inside the trace machinery itself.
const CAPTURE_PREFIXES: [&str; 2] = ["backtrace::", "exception_display::exception::"];

/// Frames below which nothing interesting to the application lives.
const STOP_SYMBOLS: [&str; 3] = [
    "std::sys::backtrace::__rust_begin_short_backtrace",
    "__rust_begin_short_backtrace",
    "tokio::runtime::context::runtime::enter_runtime",
];

/// Resolve `trace` into at most `max_frames` frames, each with up to
/// `radius` lines of source on either side when the file is readable.
pub fn collect_frames(trace: &Trace, max_frames: usize, radius: u32) -> Vec<Frame> {
    let mut trace = trace.clone();
    trace.resolve();

    let mut frames = Vec::new();
    let mut skipping_capture = true;

    'outer: for frame in trace.frames() {
        for symbol in frame.symbols() {
            if frames.len() >= max_frames {
                break 'outer;
            }

            let function = symbol
                .name()
                .map(|name| format!("{name:#}"))
                .unwrap_or_else(|| "<unknown>".to_string());

            if STOP_SYMBOLS.contains(&function.as_str()) {
                break 'outer;
            }
            if skipping_capture {
                if CAPTURE_PREFIXES.iter().any(|prefix| function.starts_with(prefix)) {
                    continue;
                }
                skipping_capture = false;
            }

            let file = symbol.filename().map(Path::to_path_buf);
            let line = symbol.lineno();
            let snippet = match (&file, line) {
                (Some(file), Some(line)) => read_snippet(file, line, radius),
                _ => None,
            };

            frames.push(Frame {
                function,
                file,
                line,
                snippet,
            });
        }
    }

    while frames.last().is_some_and(is_runtime_frame) {
        frames.pop();
    }
    frames
}

fn is_runtime_frame(frame: &Frame) -> bool {
    frame.function.starts_with("std::")
        || frame.function.starts_with("core::")
        || frame.function.starts_with("tokio::")
        || frame.function == "__rust_try"
        || frame.function == "start_thread"
}

/// Read the lines around `line` (1-based) from `path`.
pub fn read_snippet(path: &Path, line: u32, radius: u32) -> Option<Snippet> {
    if line == 0 {
        return None;
    }
    let source = std::fs::read_to_string(path).ok()?;
    let start_line = line.saturating_sub(radius).max(1);
    let end_line = line.saturating_add(radius);

    let lines: Vec<String> = source
        .lines()
        .enumerate()
        .map(|(index, text)| (index as u32 + 1, text))
        .filter(|(number, _)| (start_line..=end_line).contains(number))
        .map(|(_, text)| text.to_string())
        .collect();

    if lines.is_empty() {
        return None;
    }
    Some(Snippet {
        start_line,
        highlight_line: line,
        lines,
    })
}
