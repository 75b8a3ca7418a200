//! Fence-aware normalization for streamed markdown source.
//!
//! Streaming assistant output is committed line by line. A committed line is final: the
//! transcript never retracts it. That makes fenced code blocks the one construct that needs care.
//! If the opening ```` ``` ```` is committed before its closing marker arrives, the UI shows a
//! broken code block that cannot be repaired later.
//!
//! The helpers here are pure functions over a text snapshot:
//!
//! - [`is_inside_unclosed_fence`] is the commit gate.
//! - [`strip_empty_fenced_code_blocks`] drops placeholder fences that contain only whitespace.
//! - [`unwrap_markdown_language_fence`] removes a single ```` ```markdown ```` wrapper around the
//!   whole message.
//! - [`process_markdown_for_streaming`] composes the two transforms in the order the collector
//!   evaluates them.

use std::borrow::Cow;

const FENCE: &str = "```";

/// Returns `true` when `text` contains an odd number of ```` ``` ```` markers.
///
/// Markers are counted without overlap, so a run of four backticks counts once.
pub fn is_inside_unclosed_fence(text: &str) -> bool {
    text.matches(FENCE).count() % 2 == 1
}

/// Removes fenced code blocks whose body is empty or whitespace-only.
///
/// The opening line, the blank body lines and the closing line (with its newline) are dropped.
/// Fence state is tracked line by line so the closing fence of one block followed by the opening
/// fence of the next block is never mistaken for an empty pair. An opening fence that never closes
/// is kept verbatim.
pub fn strip_empty_fenced_code_blocks(text: &str) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    let mut out = String::with_capacity(text.len());
    let mut idx = 0;
    while idx < lines.len() {
        let line = lines[idx];
        if !is_fence_line(line) {
            out.push_str(line);
            idx += 1;
            continue;
        }

        let Some(close_idx) = find_closing_fence(&lines, idx + 1) else {
            // Unclosed fence: everything after it belongs to the open block.
            for rest in &lines[idx..] {
                out.push_str(rest);
            }
            break;
        };

        let is_empty_pair = is_closing_fence_line(lines[close_idx])
            && lines[idx + 1..close_idx]
                .iter()
                .all(|body| body.trim().is_empty());
        if !is_empty_pair {
            for kept in &lines[idx..=close_idx] {
                out.push_str(kept);
            }
        }
        idx = close_idx + 1;
    }
    out
}

/// Unwraps a message that is entirely enclosed in a ```` ```markdown ```` / ```` ```md ```` fence.
///
/// The first line must be the labelled opening fence and the last non-blank line must be exactly
/// ```` ``` ````. The inner lines are returned newline-terminated. Any other shape is returned
/// unchanged.
pub fn unwrap_markdown_language_fence(text: &str) -> Cow<'_, str> {
    let lines: Vec<&str> = text.split('\n').collect();
    if lines.len() < 2 {
        return Cow::Borrowed(text);
    }
    if !is_markdown_language_fence(lines[0]) {
        return Cow::Borrowed(text);
    }
    let Some(last_non_blank) = lines.iter().rposition(|line| !line.trim().is_empty()) else {
        return Cow::Borrowed(text);
    };
    if last_non_blank == 0 || lines[last_non_blank].trim_end_matches('\r') != FENCE {
        return Cow::Borrowed(text);
    }

    let inner = &lines[1..last_non_blank];
    let mut out = String::with_capacity(text.len());
    for line in inner {
        out.push_str(line);
        out.push('\n');
    }
    Cow::Owned(out)
}

/// Normalizes a streaming buffer before it is gated and split into lines.
pub fn process_markdown_for_streaming(text: &str) -> String {
    MarkdownNormalization::default().apply(text)
}

/// Which normalization passes to run over the buffer before committing.
///
/// The default enables both passes and matches [`process_markdown_for_streaming`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MarkdownNormalization {
    pub unwrap_markdown_fence: bool,
    pub strip_empty_fences: bool,
}

impl Default for MarkdownNormalization {
    fn default() -> Self {
        Self {
            unwrap_markdown_fence: true,
            strip_empty_fences: true,
        }
    }
}

impl MarkdownNormalization {
    /// Runs the enabled passes: unwrap first, then strip.
    pub fn apply(self, text: &str) -> String {
        let unwrapped = if self.unwrap_markdown_fence {
            unwrap_markdown_language_fence(text)
        } else {
            Cow::Borrowed(text)
        };
        if self.strip_empty_fences {
            strip_empty_fenced_code_blocks(&unwrapped)
        } else {
            unwrapped.into_owned()
        }
    }
}

fn is_fence_line(line: &str) -> bool {
    line.trim_start().starts_with(FENCE)
}

fn is_closing_fence_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.len() >= FENCE.len() && trimmed.chars().all(|c| c == '`')
}

fn find_closing_fence(lines: &[&str], start: usize) -> Option<usize> {
    (start..lines.len()).find(|&idx| is_fence_line(lines[idx]))
}

/// Index of the first fence line in `text` that no later line closes.
///
/// Fences pair up the same way [`strip_empty_fenced_code_blocks`] pairs them: each fence line is
/// closed by the next fence line.
pub(crate) fn unclosed_fence_line(text: &str) -> Option<usize> {
    let mut open = None;
    for (idx, line) in text.split_inclusive('\n').enumerate() {
        if is_fence_line(line) {
            open = match open {
                Some(_) => None,
                None => Some(idx),
            };
        }
    }
    open
}

pub(crate) fn is_markdown_language_fence(line: &str) -> bool {
    let Some(info) = line.trim().strip_prefix(FENCE) else {
        return false;
    };
    let info = info.trim();
    info.eq_ignore_ascii_case("markdown") || info.eq_ignore_ascii_case("md")
}
