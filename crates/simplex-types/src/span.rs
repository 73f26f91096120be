use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A single point in the source text.
///
/// `offset` is a 0-based UTF-8 byte offset; `line` and `column` are 1-based,
/// with columns counted in characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub offset: u32,
    pub line: u32,
    pub column: u32,
}

impl Position {
    pub fn new(offset: u32, line: u32, column: u32) -> Self {
        Self {
            offset,
            line,
            column,
        }
    }
}

/// Source location span. Attached to every expression node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    /// Create a new span.
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    /// Create a zero-width span at a single position.
    pub fn point(position: Position) -> Self {
        Self::new(position, position)
    }

    /// Merge two spans into one that covers both.
    pub fn merge(self, other: Span) -> Span {
        let start = if other.start.offset < self.start.offset {
            other.start
        } else {
            self.start
        };
        let end = if other.end.offset > self.end.offset {
            other.end
        } else {
            self.end
        };
        Span::new(start, end)
    }

    /// Length of the span in bytes.
    pub fn len(&self) -> usize {
        self.end.offset.saturating_sub(self.start.offset) as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Display for Span {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.start.line, self.start.column)
    }
}

/// Holds the source text for error reporting.
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub name: String,
    pub source: String,
    /// Cached line start byte offsets for fast line lookup.
    line_starts: Vec<usize>,
}

/// Lines shown before the first marked line of a code frame.
const FRAME_LINES_ABOVE: u32 = 2;
/// Lines shown after the last marked line of a code frame.
const FRAME_LINES_BELOW: u32 = 3;

impl SourceFile {
    /// Create a new source file.
    pub fn new(name: impl Into<String>, source: impl Into<String>) -> Self {
        let source = source.into();
        let line_starts = std::iter::once(0)
            .chain(source.match_indices('\n').map(|(i, _)| i + 1))
            .collect();
        Self {
            name: name.into(),
            source,
            line_starts,
        }
    }

    /// Extract a source line by 1-based line number.
    ///
    /// Returns `None` if the line number is out of range.
    pub fn line(&self, line_number: u32) -> Option<&str> {
        let idx = line_number.checked_sub(1)? as usize;
        if idx >= self.line_starts.len() {
            return None;
        }
        let start = self.line_starts[idx];
        let end = self
            .line_starts
            .get(idx + 1)
            .map(|&s| s.saturating_sub(1)) // strip the \n
            .unwrap_or(self.source.len());
        let line = &self.source[start..end];
        // Also strip trailing \r for CRLF
        Some(line.trim_end_matches('\r'))
    }

    /// Get the total number of lines.
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Render the lines around `span` with a `>` marker on each covered line
    /// and `^` carets under the covered columns.
    ///
    /// ```text
    ///   1 | (
    /// > 2 |   if -a > 1 + x then
    ///     |       ^
    ///   3 |     "foo" & b
    /// ```
    pub fn code_frame(&self, span: &Span) -> String {
        let total = self.line_count() as u32;
        let first = span.start.line.saturating_sub(FRAME_LINES_ABOVE + 1);
        let last = (span.end.line + FRAME_LINES_BELOW).min(total);
        let markers = self.marker_lines(span);
        let width = last.to_string().len();

        let mut rows = Vec::new();
        for number in first + 1..=last {
            let line = self.line(number).unwrap_or("");
            let gutter = format!(" {number:>width$} |");
            let text = if line.is_empty() {
                String::new()
            } else {
                format!(" {line}")
            };
            match markers.get(&number) {
                Some(&(column, count)) => {
                    let spacing: String = line
                        .chars()
                        .take(column.saturating_sub(1) as usize)
                        .map(|c| if c == '\t' { '\t' } else { ' ' })
                        .collect();
                    let blank_gutter: String = gutter
                        .chars()
                        .map(|c| if c.is_ascii_digit() { ' ' } else { c })
                        .collect();
                    rows.push(format!(
                        ">{gutter}{text}\n {blank_gutter} {spacing}{}",
                        "^".repeat(count.max(1) as usize)
                    ));
                }
                None => rows.push(format!(" {gutter}{text}")),
            }
        }
        rows.join("\n")
    }

    /// Map each covered line to `(start column, caret count)`.
    fn marker_lines(&self, span: &Span) -> BTreeMap<u32, (u32, u32)> {
        let mut markers = BTreeMap::new();
        let (start, end) = (span.start, span.end);
        let line_len = |n: u32| self.line(n).map_or(0, |l| l.chars().count() as u32);

        if start.line == end.line {
            markers.insert(
                start.line,
                (start.column, end.column.saturating_sub(start.column)),
            );
            return markers;
        }

        for number in start.line..=end.line {
            let marker = if number == start.line {
                (start.column, (line_len(number) + 1).saturating_sub(start.column))
            } else if number == end.line {
                (0, end.column)
            } else {
                (0, line_len(number))
            };
            markers.insert(number, marker);
        }
        markers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: (u32, u32, u32), end: (u32, u32, u32)) -> Span {
        Span::new(
            Position::new(start.0, start.1, start.2),
            Position::new(end.0, end.1, end.2),
        )
    }

    #[test]
    fn test_span_point() {
        let s = Span::point(Position::new(4, 1, 5));
        assert_eq!(s.start, s.end);
        assert!(s.is_empty());
    }

    #[test]
    fn test_span_merge() {
        let a = span((4, 1, 5), (9, 1, 10));
        let b = span((12, 2, 3), (17, 2, 8));
        let merged = a.merge(b);
        assert_eq!(merged.start, Position::new(4, 1, 5));
        assert_eq!(merged.end, Position::new(17, 2, 8));
        assert_eq!(merged.len(), 13);
    }

    #[test]
    fn test_span_merge_is_symmetric() {
        let a = span((4, 1, 5), (9, 1, 10));
        let b = span((2, 1, 3), (7, 1, 8));
        assert_eq!(a.merge(b), b.merge(a));
        assert_eq!(a.merge(b), span((2, 1, 3), (9, 1, 10)));
    }

    #[test]
    fn test_span_display() {
        let s = span((20, 3, 7), (28, 3, 15));
        assert_eq!(format!("{s}"), "3:7");
    }

    #[test]
    fn test_span_json_shape() {
        let s = span((0, 1, 1), (1, 1, 2));
        let json = serde_json::to_value(s).unwrap();
        assert_eq!(json["start"]["offset"], 0);
        assert_eq!(json["end"]["column"], 2);
    }

    #[test]
    fn test_source_file_line_extraction() {
        let src = SourceFile::new("test.sx", "line one\nline two\nline three");
        assert_eq!(src.line(1), Some("line one"));
        assert_eq!(src.line(2), Some("line two"));
        assert_eq!(src.line(3), Some("line three"));
        assert_eq!(src.line(0), None);
        assert_eq!(src.line(4), None);
    }

    #[test]
    fn test_source_file_crlf() {
        let src = SourceFile::new("test.sx", "line one\r\nline two\r\n");
        assert_eq!(src.line(1), Some("line one"));
        assert_eq!(src.line(2), Some("line two"));
    }

    #[test]
    fn test_source_file_empty() {
        let src = SourceFile::new("test.sx", "");
        assert_eq!(src.line_count(), 1);
        assert_eq!(src.line(1), Some(""));
    }

    #[test]
    fn test_code_frame_single_line() {
        let src = SourceFile::new("test.sx", "a + b");
        let frame = src.code_frame(&span((4, 1, 5), (5, 1, 6)));
        assert_eq!(frame, ["> 1 | a + b", "    |     ^"].join("\n"));
    }

    #[test]
    fn test_code_frame_context_lines() {
        let src = SourceFile::new("test.sx", "a\n  +\n    b");
        let frame = src.code_frame(&span((10, 3, 5), (11, 3, 6)));
        assert_eq!(
            frame,
            ["  1 | a", "  2 |   +", "> 3 |     b", "    |     ^"].join("\n")
        );
    }

    #[test]
    fn test_code_frame_multi_line_span() {
        let source = ["(", "  if -a > 1 ", "+ x then", "    \"foo\" & b", "  else", "    \"bar\"", ")"]
            .join("\n");
        let src = SourceFile::new("test.sx", source);
        let frame = src.code_frame(&span((12, 2, 11), (17, 3, 4)));
        assert_eq!(
            frame,
            [
                "  1 | (",
                "> 2 |   if -a > 1 ",
                "    |           ^^",
                "> 3 | + x then",
                "    | ^^^^",
                "  4 |     \"foo\" & b",
                "  5 |   else",
                "  6 |     \"bar\"",
            ]
            .join("\n")
        );
    }
}
