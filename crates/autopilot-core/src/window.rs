use crate::types::{RepoContext, RepoFile};

/// Split on `\r\n`, `\n` or `\r`. A trailing terminator yields a final empty
/// line, so the result always has at least one entry.
pub fn split_lines(text: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut rest = text;
    while let Some(pos) = rest.find(|c: char| c == '\r' || c == '\n') {
        lines.push(&rest[..pos]);
        let width = if rest[pos..].starts_with("\r\n") { 2 } else { 1 };
        rest = &rest[pos + width..];
    }
    lines.push(rest);
    lines
}

/// A clipped, line-numbered excerpt around one line. All line numbers are
/// 1-based and satisfy `1 <= start_line <= line <= end_line <= total`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextWindow {
    /// The target line after clamping into the file.
    pub line: u32,
    pub start_line: u32,
    pub end_line: u32,
    pub rendered: String,
}

impl ContextWindow {
    /// Render `radius` lines above and below `line`, marking the target with `>`.
    pub fn extract(text: &str, line: u32, radius: u32) -> Self {
        let lines = split_lines(text);
        let last = lines.len() - 1;
        let index = (line.max(1) as usize - 1).min(last);
        let radius = radius as usize;
        let start = index.saturating_sub(radius);
        let end = index.saturating_add(radius).min(last);

        let rendered = lines[start..=end]
            .iter()
            .enumerate()
            .map(|(offset, text)| {
                let n = start + offset;
                let mark = if n == index { '>' } else { ' ' };
                format!("{mark} {:>4} | {text}", n + 1)
            })
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            line: (index + 1) as u32,
            start_line: (start + 1) as u32,
            end_line: (end + 1) as u32,
            rendered,
        }
    }

    pub fn into_repo_context(self, file: &RepoFile, permalink: Option<String>) -> RepoContext {
        RepoContext {
            file_path: file.path.clone(),
            git_ref: file.git_ref.clone(),
            line: self.line,
            start_line: self.start_line,
            end_line: self.end_line,
            context: self.rendered,
            permalink,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {i}"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn split_handles_every_newline_style() {
        assert_eq!(split_lines("a\r\nb\nc\rd"), vec!["a", "b", "c", "d"]);
        assert_eq!(split_lines("a\n"), vec!["a", ""]);
        assert_eq!(split_lines(""), vec![""]);
        assert_eq!(split_lines("\r\n\r\n"), vec!["", "", ""]);
    }

    #[test]
    fn window_around_line_42_of_100() {
        let w = ContextWindow::extract(&numbered(100), 42, 12);
        assert_eq!((w.start_line, w.line, w.end_line), (30, 42, 54));
        let rendered: Vec<&str> = w.rendered.lines().collect();
        assert_eq!(rendered.len(), 25);
        assert_eq!(rendered[0], "    30 | line 30");
        assert_eq!(rendered[12], ">   42 | line 42");
        let marked: Vec<_> = rendered.iter().filter(|l| l.starts_with('>')).collect();
        assert_eq!(marked.len(), 1);
    }

    #[test]
    fn window_is_clipped_at_file_edges() {
        let w = ContextWindow::extract(&numbered(10), 2, 5);
        assert_eq!((w.start_line, w.end_line), (1, 7));
        let w = ContextWindow::extract(&numbered(10), 10, 5);
        assert_eq!((w.start_line, w.end_line), (5, 10));
    }

    #[test]
    fn out_of_range_line_is_clamped_and_marked() {
        let w = ContextWindow::extract(&numbered(5), 99, 1);
        assert_eq!((w.start_line, w.line, w.end_line), (4, 5, 5));
        assert!(w.rendered.ends_with(">    5 | line 5"));

        let w = ContextWindow::extract(&numbered(5), 0, 0);
        assert_eq!((w.start_line, w.line, w.end_line), (1, 1, 1));
    }

    #[test]
    fn bounds_hold_for_every_line_and_radius() {
        for total in [1usize, 2, 7, 31] {
            let text = numbered(total);
            for line in 1..=total as u32 {
                for radius in [0u32, 1, 3, 12, 200] {
                    let w = ContextWindow::extract(&text, line, radius);
                    assert!(1 <= w.start_line);
                    assert!(w.start_line <= line && line <= w.end_line);
                    assert!(w.end_line as usize <= total);
                    assert!(w.end_line - w.start_line <= 2 * radius);
                    let marked: Vec<&str> = w
                        .rendered
                        .lines()
                        .filter(|l| l.starts_with('>'))
                        .collect();
                    assert_eq!(marked.len(), 1);
                    assert!(marked[0].contains(&format!("| line {line}")));
                }
            }
        }
    }

    #[test]
    fn into_repo_context_carries_file_identity() {
        let file = RepoFile {
            path: "src/a.ts".into(),
            git_ref: "main".into(),
            text: numbered(3),
            permalink: None,
        };
        let ctx = ContextWindow::extract(&file.text, 2, 1)
            .into_repo_context(&file, Some("https://example.com#L2".into()));
        assert_eq!(ctx.file_path, "src/a.ts");
        assert_eq!(ctx.git_ref, "main");
        assert_eq!((ctx.start_line, ctx.line, ctx.end_line), (1, 2, 3));
        assert_eq!(ctx.permalink.as_deref(), Some("https://example.com#L2"));
    }
}
