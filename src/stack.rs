//! Call-stack capture for fault annotation.
//!
//! Walks the live call stack at the moment a failure is normalized and records
//! a bounded, innermost-first sequence of frames. Frame zero is the call site
//! requested by the `skip` contract, never this module's own machinery.

use serde::{Deserialize, Serialize};

/// Upper bound on captured frames per fault.
pub const MAX_FRAMES: usize = 20;

/// One resolved stack frame.
///
/// `number` is the 1-based source line as decimal text, matching the wire
/// format the collector expects for backtrace entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Frame {
    pub number: String,
    pub file: String,
    pub method: String,
}

/// Capture up to [`MAX_FRAMES`] frames, innermost first, starting `skip`
/// frames above the caller of this function.
///
/// Never fails: frames the symbolizer cannot resolve are dropped, and an
/// empty vector is a valid result when the runtime cannot unwind further.
pub fn capture_stack(skip: usize) -> Vec<Frame> {
    let trace = backtrace::Backtrace::new();
    let mut frames = Vec::new();
    let mut past_capture = false;
    let mut remaining_skip = skip;

    for frame in trace.frames() {
        for symbol in frame.symbols() {
            let method = match symbol.name() {
                Some(name) => name.to_string(),
                None => continue,
            };

            // Everything up to and including this function is capture
            // machinery (backtrace internals plus capture_stack itself).
            if !past_capture {
                if method.contains("capture_stack") {
                    past_capture = true;
                }
                continue;
            }

            if remaining_skip > 0 {
                remaining_skip -= 1;
                continue;
            }

            let file = symbol
                .filename()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            let number = symbol
                .lineno()
                .map(|line| line.to_string())
                .unwrap_or_default();

            frames.push(Frame {
                number,
                file,
                method,
            });

            if frames.len() == MAX_FRAMES {
                return frames;
            }
        }
    }

    frames
}
