//! Newline-gated accumulator for streamed assistant text.
//!
//! Assistant output arrives as small text deltas. The transcript wants to show "stable" lines while
//! the stream is still running, without ever displaying a line it may later need to change.
//!
//! [`LineCollector`] uses a deliberately simple model:
//!
//! - Raw deltas are appended to a `String` buffer.
//! - Output is only **committed** once the buffer contains a hard newline (`'\n'`). The text after
//!   the last newline may still be extended by the next delta.
//! - Before committing, the buffer is normalized (see [`crate::markdown_fence`]) and the commit is
//!   refused while a code fence is open. A message that opens with a ```` ```markdown ```` fence is
//!   held until finalize, because only the complete text shows whether the wrapper is unwrapped.
//! - Committing returns only the lines completed since the last commit and advances a watermark.

use crate::markdown_fence::MarkdownNormalization;
use crate::markdown_fence::is_inside_unclosed_fence;
use crate::markdown_fence::is_markdown_language_fence;
use crate::markdown_fence::unclosed_fence_line;

/// Accumulates streamed deltas and commits fully completed, fence-safe lines.
#[derive(Debug, Default)]
pub struct LineCollector {
    /// Accumulated raw source (concatenated streaming deltas).
    buffer: String,
    /// Number of lines of the normalized buffer already handed out.
    committed_line_count: usize,
    has_seen_delta: bool,
    normalization: MarkdownNormalization,
}

impl LineCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_normalization(normalization: MarkdownNormalization) -> Self {
        Self {
            normalization,
            ..Self::default()
        }
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.committed_line_count = 0;
        self.has_seen_delta = false;
    }

    /// Append a streaming delta to the internal buffer.
    pub fn push_delta(&mut self, delta: &str) {
        tracing::trace!("push_delta: {delta:?}");
        if !delta.is_empty() {
            self.has_seen_delta = true;
        }
        self.buffer.push_str(delta);
    }

    /// Return the lines completed since the last commit.
    ///
    /// The text after the final newline is never returned, and neither are trailing blank lines:
    /// both may still change shape once more text arrives. Nothing is returned while the normalized
    /// buffer is inside an unclosed code fence.
    ///
    /// Every committed line is a prefix of what [`Self::finalize_and_drain`] would produce for any
    /// continuation of the buffer, so the watermark never points at a line that later moves.
    pub fn commit_complete_lines(&mut self) -> Vec<String> {
        let Some(last_newline) = self.buffer.rfind('\n') else {
            return Vec::new();
        };

        if self.normalization.unwrap_markdown_fence && self.opens_with_markdown_wrapper() {
            // Any later line may still close the wrapper, so its shape is only known at finalize.
            tracing::trace!("commit held back: message opens with a markdown fence");
            return Vec::new();
        }

        if is_inside_unclosed_fence(&self.normalization.apply(&self.buffer)) {
            tracing::trace!(
                committed = self.committed_line_count,
                "commit held back: unclosed code fence"
            );
            return Vec::new();
        }

        // The partial tail is left out so it never acts as a closing fence.
        let source = self.normalization.apply(&self.buffer[..=last_newline]);
        let lines: Vec<&str> = source.split('\n').collect();
        let mut complete_line_count = lines.len().saturating_sub(1);
        // A block still waiting for its closing fence may yet be stripped as empty.
        if let Some(open_fence) = unclosed_fence_line(&source) {
            complete_line_count = complete_line_count.min(open_fence);
        }
        while complete_line_count > 0 && lines[complete_line_count - 1].trim().is_empty() {
            complete_line_count -= 1;
        }

        if self.committed_line_count >= complete_line_count {
            return Vec::new();
        }

        let out: Vec<String> = lines[self.committed_line_count..complete_line_count]
            .iter()
            .map(|line| (*line).to_string())
            .collect();
        tracing::debug!(
            from = self.committed_line_count,
            to = complete_line_count,
            "committed {} line(s)",
            out.len()
        );
        self.committed_line_count = complete_line_count;
        out
    }

    /// Finalize the stream: return every line beyond the last commit and reset.
    ///
    /// A missing trailing newline is supplied so the final partial line becomes a complete line.
    pub fn finalize_and_drain(&mut self) -> Vec<String> {
        if !self.has_seen_delta || self.buffer.is_empty() {
            self.clear();
            return Vec::new();
        }

        let mut source = self.normalization.apply(&self.buffer);
        if !source.ends_with('\n') {
            source.push('\n');
        }
        tracing::debug!(
            raw_len = self.buffer.len(),
            source_len = source.len(),
            committed = self.committed_line_count,
            "line collector finalize"
        );
        tracing::trace!("line collector finalize (source):\n---\n{source}\n---");

        let mut lines: Vec<&str> = source.split('\n').collect();
        // `source` ends with a newline, so the last element is always the empty remainder.
        lines.pop();

        let out: Vec<String> = lines
            .get(self.committed_line_count..)
            .map(|rest| rest.iter().map(|line| (*line).to_string()).collect())
            .unwrap_or_default();

        self.clear();
        out
    }

    /// Seed the buffer with a complete message and mark its first `committed_count` lines as
    /// already handed out.
    ///
    /// Non-empty seeded content counts as seen so [`Self::finalize_and_drain`] drains it.
    pub fn replace_with_and_mark_committed(&mut self, content: &str, committed_count: usize) {
        self.buffer.clear();
        self.buffer.push_str(content);
        self.committed_line_count = committed_count;
        self.has_seen_delta = !content.is_empty();
    }

    fn opens_with_markdown_wrapper(&self) -> bool {
        self.buffer
            .split_once('\n')
            .is_some_and(|(first, _)| is_markdown_language_fence(first))
    }

    pub fn committed_count(&self) -> usize {
        self.committed_line_count
    }

    pub fn has_seen_delta(&self) -> bool {
        self.has_seen_delta
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

/// Drive a fresh [`LineCollector`] the way the stream controller does and collect every line it
/// commits.
///
/// Deltas are committed only when they contain a newline. With `finalize`, the remaining tail is
/// drained at the end.
pub fn simulate_stream(deltas: &[&str], finalize: bool) -> Vec<String> {
    let mut collector = LineCollector::new();
    let mut out = Vec::new();
    for delta in deltas {
        collector.push_delta(delta);
        if delta.contains('\n') {
            out.extend(collector.commit_complete_lines());
        }
    }
    if finalize {
        out.extend(collector.finalize_and_drain());
    }
    out
}
