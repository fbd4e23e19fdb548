use crate::path::normalize_path;
use crate::types::{EventEntry, IssueEvent, StackFrame};

/// The frame chosen as the crash site. An empty `path` means the event carried
/// no usable file reference.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickedFrame {
    pub path: String,
    pub line: Option<u32>,
    /// Source lines around the crash as captured by the error tracker.
    pub inline_context: Option<String>,
}

impl PickedFrame {
    pub fn is_empty(&self) -> bool {
        self.path.is_empty()
    }
}

/// Find the frame closest to the crash in the first exception that names a file.
///
/// In-app frames with a file reference win; otherwise all frames of that
/// exception are considered. Frames are walked from last (innermost) to first.
pub fn pick_best_frame(event: &IssueEvent) -> PickedFrame {
    for entry in &event.entries {
        let EventEntry::Exception(exception) = entry else {
            continue;
        };
        for value in &exception.values {
            let frames = value.frames();
            if frames.is_empty() {
                continue;
            }

            let in_app: Vec<&StackFrame> = frames
                .iter()
                .filter(|f| f.in_app && f.raw_path().is_some())
                .collect();
            let candidates = if in_app.is_empty() {
                frames.iter().collect()
            } else {
                in_app
            };

            for frame in candidates.into_iter().rev() {
                let path = normalize_path(frame.raw_path().unwrap_or(""));
                if !path.is_empty() {
                    return PickedFrame {
                        path: path.to_string(),
                        line: frame.lineno,
                        inline_context: inline_context(frame),
                    };
                }
            }
        }
    }
    PickedFrame::default()
}

/// Join pre-context, the crashing line and post-context. Falls back to the
/// numbered `context` pairs when the split fields are absent.
pub fn inline_context(frame: &StackFrame) -> Option<String> {
    let mut pre = join_lines(&frame.pre_context);
    let mut line = frame.context_line.clone().unwrap_or_default();
    let mut post = join_lines(&frame.post_context);

    if pre.is_empty() && line.is_empty() && post.is_empty() {
        if let Some(crash) = frame.lineno {
            let pick = |keep: &dyn Fn(u32) -> bool| -> String {
                frame
                    .context
                    .iter()
                    .filter(|(n, _)| keep(*n))
                    .map(|(_, text)| text.as_deref().unwrap_or(""))
                    .collect::<Vec<_>>()
                    .join("\n")
            };
            pre = pick(&|n: u32| n < crash);
            line = pick(&|n: u32| n == crash);
            post = pick(&|n: u32| n > crash);
        }
    }

    let combined = [pre, line, post]
        .into_iter()
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    (!combined.is_empty()).then_some(combined)
}

/// Scrubbed lines count as empty.
fn join_lines(lines: &[Option<String>]) -> String {
    lines
        .iter()
        .map(|l| l.as_deref().unwrap_or(""))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn event(entries: serde_json::Value) -> IssueEvent {
        serde_json::from_value(json!({ "id": "e1", "entries": entries })).unwrap()
    }

    #[test]
    fn prefers_last_in_app_frame() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [
                { "filename": "webpack:///./src/a.ts", "lineno": 42, "in_app": true,
                  "pre_context": ["const x = 1;"], "context_line": "crash();", "post_context": ["}"] },
                { "filename": "node_modules/react/index.js", "lineno": 9, "in_app": false }
            ] }
        }] } }]));
        let picked = pick_best_frame(&ev);
        assert_eq!(picked.path, "src/a.ts");
        assert_eq!(picked.line, Some(42));
        assert_eq!(
            picked.inline_context.as_deref(),
            Some("const x = 1;\ncrash();\n}")
        );
    }

    #[test]
    fn falls_back_to_all_frames_without_in_app() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [
                { "filename": "lib/first.js", "lineno": 1 },
                { "abs_path": "app:///lib/second.js" }
            ] }
        }] } }]));
        let picked = pick_best_frame(&ev);
        assert_eq!(picked.path, "lib/second.js");
        assert_eq!(picked.line, None);
        assert_eq!(picked.inline_context, None);
    }

    #[test]
    fn skips_frames_whose_path_normalizes_to_nothing() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [
                { "filename": "src/ok.ts", "lineno": 5 },
                { "filename": "webpack:///" }
            ] }
        }] } }]));
        assert_eq!(pick_best_frame(&ev).path, "src/ok.ts");
    }

    #[test]
    fn ignores_non_exception_entries_and_empty_stacks() {
        let ev = event(json!([
            { "type": "message", "data": { "formatted": "src/not-a-frame.ts" } },
            { "type": "exception", "data": { "values": [ { "stacktrace": null }, {
                "stacktrace": { "frames": [ { "filename": "src/b.ts", "lineno": 7, "in_app": true } ] }
            } ] } }
        ]));
        let picked = pick_best_frame(&ev);
        assert_eq!(picked.path, "src/b.ts");
        assert_eq!(picked.line, Some(7));
    }

    #[test]
    fn no_usable_frame_is_an_empty_result() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [ { "function": "anonymous" } ] }
        }] } }]));
        let picked = pick_best_frame(&ev);
        assert!(picked.is_empty());
        assert_eq!(picked, PickedFrame::default());

        assert!(pick_best_frame(&IssueEvent::default()).is_empty());
    }

    #[test]
    fn bad_line_number_keeps_the_frame_and_its_siblings() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [
                { "filename": "src/ok.ts", "lineno": 5, "in_app": true },
                { "filename": "src/crash.ts", "lineno": -1, "in_app": true }
            ] }
        }] } }]));
        assert!(matches!(ev.entries[0], EventEntry::Exception(_)));
        let picked = pick_best_frame(&ev);
        assert_eq!(picked.path, "src/crash.ts");
        assert_eq!(picked.line, None);
    }

    #[test]
    fn scrubbed_context_lines_read_as_empty() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [
                { "filename": "src/crash.ts", "lineno": 9,
                  "pre_context": [null, "a();"], "context_line": "b();", "post_context": [null] }
            ] }
        }] } }]));
        let picked = pick_best_frame(&ev);
        assert_eq!(picked.path, "src/crash.ts");
        assert_eq!(picked.line, Some(9));
        assert_eq!(picked.inline_context.as_deref(), Some("\na();\nb();"));
    }

    #[test]
    fn unusable_frame_is_skipped_for_the_next_one() {
        let ev = event(json!([{ "type": "exception", "data": { "values": [{
            "stacktrace": { "frames": [
                { "filename": "src/outer.ts", "lineno": 3, "in_app": true },
                "garbage"
            ] }
        }] } }]));
        assert_eq!(pick_best_frame(&ev).path, "src/outer.ts");
    }

    #[test]
    fn inline_context_uses_numbered_pairs() {
        let frame: StackFrame = serde_json::from_value(json!({
            "filename": "src/a.ts",
            "lineNo": 2,
            "context": [[1, "a"], [2, "b"], [3, "c"]]
        }))
        .unwrap();
        assert_eq!(inline_context(&frame).as_deref(), Some("a\nb\nc"));
    }

    #[test]
    fn inline_context_skips_empty_segments() {
        let frame = StackFrame {
            context_line: Some("only();".into()),
            ..Default::default()
        };
        assert_eq!(inline_context(&frame).as_deref(), Some("only();"));
        assert_eq!(inline_context(&StackFrame::default()), None);
    }
}
