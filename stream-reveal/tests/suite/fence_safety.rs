use pretty_assertions::assert_eq;
use stream_reveal::LineCollector;
use stream_reveal::markdown_fence::is_inside_unclosed_fence;
use stream_reveal::simulate_stream;

const SOURCE: &str = "Steps:\n\n```bash\ncargo build\n\ncargo test\n```\n\nThen:\n```\nplain\n```\nDone\n";

#[test]
fn nothing_commits_while_a_fence_is_open() {
    let mut collector = LineCollector::new();
    let mut prefix = String::new();
    let mut committed_total = 0;

    for ch in SOURCE.chars() {
        let delta = ch.to_string();
        prefix.push(ch);
        collector.push_delta(&delta);
        if ch != '\n' {
            continue;
        }
        let committed = collector.commit_complete_lines();
        if is_inside_unclosed_fence(&prefix) {
            assert_eq!(committed, Vec::<String>::new(), "prefix {prefix:?}");
        }
        committed_total += committed.len();
        // The watermark only moves forward.
        assert_eq!(collector.committed_count(), committed_total);
    }

    let tail = collector.finalize_and_drain();
    assert_eq!(committed_total + tail.len(), SOURCE.lines().count());
}

#[test]
fn streamed_lines_match_whole_message() {
    let deltas: Vec<String> = SOURCE
        .chars()
        .collect::<Vec<_>>()
        .chunks(5)
        .map(|chunk| chunk.iter().collect())
        .collect();
    let deltas: Vec<&str> = deltas.iter().map(String::as_str).collect();

    let streamed = simulate_stream(&deltas, true);
    let whole = simulate_stream(&[SOURCE], true);
    assert_eq!(streamed, whole);
    assert_eq!(streamed.join("\n"), SOURCE.trim_end_matches('\n'));
}

#[test]
fn unterminated_fence_is_flushed_at_finalize() {
    let out = simulate_stream(&["Look:\n", "```rust\n", "let x = 1;\n"], true);
    assert_eq!(out, vec!["Look:", "```rust", "let x = 1;"]);
}

#[test]
fn normalized_replies_stream_like_one_shot() {
    let replies = [
        "```markdown\n# Plan\n```\nThen some prose.\n",
        "```markdown\n```md\n- nested\n```\n```\n",
        "```markdown\n# Plan\n\n```bash\n```\n- step\n```\n",
        "Wrap code in ``` fences.\n```\n\n```\nok\n```py\nx = 1\n```\n",
    ];
    for reply in replies {
        let whole = simulate_stream(&[reply], true);
        let chars: Vec<char> = reply.chars().collect();
        for chunk in [1, 2, 3, 5, 8, 13] {
            let deltas: Vec<String> = chars.chunks(chunk).map(|c| c.iter().collect()).collect();
            let deltas: Vec<&str> = deltas.iter().map(String::as_str).collect();
            assert_eq!(
                simulate_stream(&deltas, true),
                whole,
                "reply {reply:?}, chunk size {chunk}"
            );
        }
    }

    assert_eq!(
        simulate_stream(&["```markdown\n# Plan\n```\nThen some prose.\n"], true),
        vec!["```markdown", "# Plan", "```", "Then some prose."]
    );
    assert_eq!(
        simulate_stream(&["```markdown\n# Plan\n\n```bash\n```\n- step\n```\n"], true),
        vec!["# Plan", "", "- step"]
    );
}
