//! Multipart boundary detection.
//!
//! A delimiter line is `--` followed by the boundary token, optionally
//! followed by `--` for the terminal delimiter, optionally followed by
//! trailing whitespace, and nothing else. Anything that only resembles a
//! delimiter is body content.

use crate::config::DelimiterConfig;
use crate::model::span::MessageSpan;
use crate::parser::line::Line;

/// Which delimiter a line is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DelimiterKind {
    /// `--token`: ends the previous part, starts the next one.
    Part,
    /// `--token--`: ends the last part.
    Terminal,
}

/// Classify a line's content (terminator excluded) against `token`.
pub fn match_delimiter(
    line: &[u8],
    token: &str,
    rules: &DelimiterConfig,
) -> Option<DelimiterKind> {
    let rest = line.strip_prefix(b"--")?;
    let token = token.as_bytes();
    if token.is_empty() || rest.len() < token.len() {
        return None;
    }

    let (candidate, rest) = rest.split_at(token.len());
    let same = if rules.case_sensitive {
        candidate == token
    } else {
        candidate.eq_ignore_ascii_case(token)
    };
    if !same {
        return None;
    }

    let (kind, rest) = match rest.strip_prefix(b"--") {
        Some(after) => (DelimiterKind::Terminal, after),
        None => (DelimiterKind::Part, rest),
    };
    let trailing_ok = rest.is_empty()
        || (rules.allow_trailing_whitespace && rest.iter().all(|&b| b == b' ' || b == b'\t'));
    trailing_ok.then_some(kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetectorState {
    /// Before the first delimiter. Bytes here are discarded.
    Preamble,
    /// Inside a part whose bytes start at `start`.
    Part { start: u64 },
    /// After the terminal delimiter. Bytes here are discarded.
    Epilogue,
}

/// What a delimiter line did to the part sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryEvent {
    pub kind: DelimiterKind,
    /// Byte range of the part this delimiter ended, if one was open.
    pub closed: Option<MessageSpan>,
    /// Start offset of the part this delimiter opened.
    pub opened: Option<u64>,
}

/// How a multipart body ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundaryFinish {
    /// The part still open when the body ended, closed at the end offset.
    pub last_part: Option<MessageSpan>,
    /// Whether the terminal delimiter had been seen.
    pub terminated: bool,
}

/// Splits one multipart body into sibling part regions.
///
/// The detector sees only delimiter lines; the caller decides which lines
/// those are via [`classify`](Self::classify).
#[derive(Debug, Clone)]
pub struct BoundaryDetector {
    token: String,
    rules: DelimiterConfig,
    state: DetectorState,
    parts: usize,
}

impl BoundaryDetector {
    pub fn new(token: impl Into<String>, rules: DelimiterConfig) -> Self {
        Self {
            token: token.into(),
            rules,
            state: DetectorState::Preamble,
            parts: 0,
        }
    }

    pub fn token(&self) -> &str {
        &self.token
    }

    /// Number of parts opened so far.
    pub fn part_count(&self) -> usize {
        self.parts
    }

    pub fn is_terminated(&self) -> bool {
        self.state == DetectorState::Epilogue
    }

    pub fn in_part(&self) -> bool {
        matches!(self.state, DetectorState::Part { .. })
    }

    /// Delimiter kind of `line`, or `None` if it is not one of ours.
    ///
    /// Always `None` once the terminal delimiter has been seen.
    pub fn classify(&self, line: &[u8]) -> Option<DelimiterKind> {
        if self.is_terminated() {
            return None;
        }
        match_delimiter(line, &self.token, &self.rules)
    }

    /// Apply a delimiter line.
    ///
    /// `previous` is the line just before the delimiter. The open part ends at
    /// the delimiter line's start, minus that line's terminator when it
    /// belongs to the part: the line break before a delimiter is part of
    /// the delimiter.
    pub fn apply(
        &mut self,
        kind: DelimiterKind,
        delimiter: &Line,
        previous: Option<&Line>,
    ) -> BoundaryEvent {
        let closed = match self.state {
            DetectorState::Part { start } => Some(MessageSpan::between(
                start,
                trimmed_part_end(start, delimiter, previous),
            )),
            _ => None,
        };

        let opened = match kind {
            DelimiterKind::Part => {
                let start = delimiter.end();
                self.state = DetectorState::Part { start };
                self.parts += 1;
                Some(start)
            }
            DelimiterKind::Terminal => {
                self.state = DetectorState::Epilogue;
                None
            }
        };

        BoundaryEvent {
            kind,
            closed,
            opened,
        }
    }

    /// End of the body at `end` without further delimiters.
    ///
    /// An open part runs to `end` untrimmed.
    pub fn finish(self, end: u64) -> BoundaryFinish {
        let last_part = match self.state {
            DetectorState::Part { start } => Some(MessageSpan::between(start, end)),
            _ => None,
        };
        BoundaryFinish {
            last_part,
            terminated: self.is_terminated(),
        }
    }
}

/// End offset of a part closed by `delimiter`.
pub fn trimmed_part_end(part_start: u64, delimiter: &Line, previous: Option<&Line>) -> u64 {
    match previous {
        Some(prev) if prev.start() >= part_start && prev.end() == delimiter.start() => {
            delimiter.start() - prev.terminator.len()
        }
        _ => delimiter.start(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::line::Terminator;

    fn rules() -> DelimiterConfig {
        DelimiterConfig::default()
    }

    fn line(start: u64, content_len: u64, terminator: Terminator) -> Line {
        Line {
            span: MessageSpan::new(start, content_len + terminator.len()),
            terminator,
            continuation: false,
        }
    }

    #[test]
    fn test_match_part_and_terminal() {
        assert_eq!(
            match_delimiter(b"--X", "X", &rules()),
            Some(DelimiterKind::Part)
        );
        assert_eq!(
            match_delimiter(b"--X--", "X", &rules()),
            Some(DelimiterKind::Terminal)
        );
        assert_eq!(
            match_delimiter(b"--frontier \t", "frontier", &rules()),
            Some(DelimiterKind::Part)
        );
        assert_eq!(
            match_delimiter(b"--frontier--  ", "frontier", &rules()),
            Some(DelimiterKind::Terminal)
        );
    }

    #[test]
    fn test_partial_matches_are_content() {
        assert_eq!(match_delimiter(b"--Xy", "X", &rules()), None);
        assert_eq!(match_delimiter(b"--X--y", "X", &rules()), None);
        assert_eq!(match_delimiter(b"-X", "X", &rules()), None);
        assert_eq!(match_delimiter(b" --X", "X", &rules()), None);
        assert_eq!(match_delimiter(b"--", "X", &rules()), None);
        assert_eq!(match_delimiter(b"--x", "X", &rules()), None);
        assert_eq!(match_delimiter(b"--X---", "X", &rules()), None);
    }

    #[test]
    fn test_token_prefix_of_longer_token() {
        // "--outer-inner" must not be read as a delimiter for "outer".
        assert_eq!(match_delimiter(b"--outer-inner", "outer", &rules()), None);
        assert_eq!(
            match_delimiter(b"--outer-inner", "outer-inner", &rules()),
            Some(DelimiterKind::Part)
        );
    }

    #[test]
    fn test_configurable_rules() {
        let strict = DelimiterConfig {
            allow_trailing_whitespace: false,
            case_sensitive: true,
        };
        assert_eq!(match_delimiter(b"--X ", "X", &strict), None);
        assert_eq!(
            match_delimiter(b"--X", "X", &strict),
            Some(DelimiterKind::Part)
        );

        let relaxed = DelimiterConfig {
            allow_trailing_whitespace: true,
            case_sensitive: false,
        };
        assert_eq!(
            match_delimiter(b"--ABC--", "abc", &relaxed),
            Some(DelimiterKind::Terminal)
        );
    }

    #[test]
    fn test_detector_splits_parts() {
        // preamble\r\n--X\r\nA\r\n--X\r\nB\r\n--X--\r\n
        //  0..10      10..15 15..18 18..23 23..26 26..33
        let mut det = BoundaryDetector::new("X", rules());
        let preamble = line(0, 8, Terminator::CrLf);
        let open1 = line(10, 3, Terminator::CrLf);
        let body1 = line(15, 1, Terminator::CrLf);
        let open2 = line(18, 3, Terminator::CrLf);
        let body2 = line(23, 1, Terminator::CrLf);
        let close = line(26, 5, Terminator::CrLf);

        let ev = det.apply(DelimiterKind::Part, &open1, Some(&preamble));
        assert_eq!(ev.closed, None);
        assert_eq!(ev.opened, Some(15));

        let ev = det.apply(DelimiterKind::Part, &open2, Some(&body1));
        assert_eq!(ev.closed, Some(MessageSpan::new(15, 1)));
        assert_eq!(ev.opened, Some(23));

        let ev = det.apply(DelimiterKind::Terminal, &close, Some(&body2));
        assert_eq!(ev.closed, Some(MessageSpan::new(23, 1)));
        assert_eq!(ev.opened, None);

        assert!(det.is_terminated());
        assert_eq!(det.part_count(), 2);
        assert_eq!(det.classify(b"--X"), None);
    }

    #[test]
    fn test_empty_part_is_not_trimmed_into_delimiter() {
        let mut det = BoundaryDetector::new("X", rules());
        let open = line(0, 3, Terminator::CrLf);
        let next = line(5, 3, Terminator::CrLf);
        det.apply(DelimiterKind::Part, &open, None);
        let ev = det.apply(DelimiterKind::Part, &next, Some(&open));
        assert_eq!(ev.closed, Some(MessageSpan::empty_at(5)));
    }

    #[test]
    fn test_lf_terminator_trimmed_by_one_byte() {
        let mut det = BoundaryDetector::new("X", rules());
        let open = line(0, 3, Terminator::Lf);
        let body = line(4, 4, Terminator::Lf);
        let close = line(9, 5, Terminator::Lf);
        det.apply(DelimiterKind::Part, &open, None);
        let ev = det.apply(DelimiterKind::Terminal, &close, Some(&body));
        assert_eq!(ev.closed, Some(MessageSpan::new(4, 4)));
    }

    #[test]
    fn test_finish_without_terminal() {
        let mut det = BoundaryDetector::new("X", rules());
        let open = line(0, 3, Terminator::CrLf);
        det.apply(DelimiterKind::Part, &open, None);
        let finish = det.finish(40);
        assert_eq!(finish.last_part, Some(MessageSpan::new(5, 35)));
        assert!(!finish.terminated);

        let det = BoundaryDetector::new("X", rules());
        let finish = det.finish(10);
        assert_eq!(finish.last_part, None);
        assert!(!finish.terminated);
    }
}
