//! Line-oriented parser for the lightweight markup used in assistant replies
//! and analysis text.
//!
//! The whole buffer is re-parsed on every render, including while a reply is
//! still streaming, so every input (including any prefix of a valid message)
//! must parse. Unterminated `**` or `` ` `` markers stay literal text until
//! their closing marker arrives.

use memchr::memmem;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TextSpan {
    Plain(String),
    Bold(String),
    Code(String),
}

impl TextSpan {
    pub fn text(&self) -> &str {
        match self {
            TextSpan::Plain(text) | TextSpan::Bold(text) | TextSpan::Code(text) => text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CalloutKind {
    Tip,
    Warning,
    Note,
}

impl CalloutKind {
    pub fn glyph(self) -> &'static str {
        match self {
            CalloutKind::Tip => "💡",
            CalloutKind::Warning => "⚠️",
            CalloutKind::Note => "✅",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            CalloutKind::Tip => "Tip",
            CalloutKind::Warning => "Warning",
            CalloutKind::Note => "Note",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayBlock {
    Paragraph(Vec<TextSpan>),
    /// Level is 2 or 3.
    Heading(u8, Vec<TextSpan>),
    BulletList(Vec<Vec<TextSpan>>),
    NumberedList(Vec<Vec<TextSpan>>),
    Callout(CalloutKind, Vec<TextSpan>),
}

const BULLET_MARKERS: [&str; 3] = ["- ", "• ", "* "];

/// Prefixes are matched ASCII-case-insensitively; glyph variants are exact.
const CALLOUT_PREFIXES: [(CalloutKind, &[&str]); 3] = [
    (CalloutKind::Tip, &["tip:", "💡"]),
    (CalloutKind::Warning, &["warning:", "⚠️", "⚠"]),
    (CalloutKind::Note, &["note:", "✅"]),
];

#[derive(Default)]
struct PendingLists {
    bullets: Vec<Vec<TextSpan>>,
    numbered: Vec<Vec<TextSpan>>,
}

impl PendingLists {
    fn flush_bullets(&mut self, out: &mut Vec<DisplayBlock>) {
        if !self.bullets.is_empty() {
            out.push(DisplayBlock::BulletList(std::mem::take(&mut self.bullets)));
        }
    }

    fn flush_numbered(&mut self, out: &mut Vec<DisplayBlock>) {
        if !self.numbered.is_empty() {
            out.push(DisplayBlock::NumberedList(std::mem::take(&mut self.numbered)));
        }
    }

    fn flush_all(&mut self, out: &mut Vec<DisplayBlock>) {
        self.flush_bullets(out);
        self.flush_numbered(out);
    }
}

/// Parse `text` into display blocks. Deterministic: identical input always
/// yields identical output. A block's stable key is its index in the result.
pub fn parse_blocks(text: &str) -> Vec<DisplayBlock> {
    let mut blocks = Vec::new();
    let mut lists = PendingLists::default();

    for raw_line in text.split('\n') {
        let line = raw_line.trim();

        if line.is_empty() {
            lists.flush_all(&mut blocks);
            continue;
        }

        if let Some(rest) = line.strip_prefix("### ") {
            lists.flush_all(&mut blocks);
            blocks.push(DisplayBlock::Heading(3, parse_inline(rest)));
            continue;
        }

        if let Some(rest) = line.strip_prefix("## ") {
            lists.flush_all(&mut blocks);
            blocks.push(DisplayBlock::Heading(2, parse_inline(rest)));
            continue;
        }

        if let Some(rest) = BULLET_MARKERS
            .iter()
            .find_map(|marker| line.strip_prefix(marker))
        {
            lists.flush_numbered(&mut blocks);
            lists.bullets.push(parse_inline(rest));
            continue;
        }

        if let Some(rest) = numbered_item(line) {
            lists.flush_bullets(&mut blocks);
            lists.numbered.push(parse_inline(rest));
            continue;
        }

        if let Some((kind, rest)) = callout(line) {
            lists.flush_all(&mut blocks);
            blocks.push(DisplayBlock::Callout(kind, parse_inline(rest)));
            continue;
        }

        lists.flush_all(&mut blocks);
        blocks.push(DisplayBlock::Paragraph(parse_inline(line)));
    }

    lists.flush_all(&mut blocks);
    blocks
}

/// `<digits>.<whitespace><text>` → `text`.
fn numbered_item(line: &str) -> Option<&str> {
    let digits = line.bytes().take_while(u8::is_ascii_digit).count();
    if digits == 0 {
        return None;
    }
    let after_dot = line[digits..].strip_prefix('.')?;
    let text = after_dot.trim_start();
    if text.len() == after_dot.len() || text.is_empty() {
        return None;
    }
    Some(text)
}

fn callout(line: &str) -> Option<(CalloutKind, &str)> {
    for (kind, prefixes) in CALLOUT_PREFIXES {
        for prefix in prefixes {
            if let Some(rest) = strip_prefix_ignore_ascii_case(line, prefix) {
                return Some((kind, rest.trim_start()));
            }
        }
    }
    None
}

fn strip_prefix_ignore_ascii_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

/// Split a line into plain, bold and inline-code spans.
///
/// `**bold**` is matched first; only text outside bold spans is then split on
/// backticks. Markers pair up left to right, shortest match first, and an
/// unpaired marker is literal text.
pub fn parse_inline(text: &str) -> Vec<TextSpan> {
    let mut spans = Vec::new();
    for (segment, is_bold) in split_paired(text, "**") {
        if is_bold {
            spans.push(TextSpan::Bold(segment.to_string()));
            continue;
        }
        for (piece, is_code) in split_paired(segment, "`") {
            if is_code {
                spans.push(TextSpan::Code(piece.to_string()));
            } else if !piece.is_empty() {
                spans.push(TextSpan::Plain(piece.to_string()));
            }
        }
    }
    spans
}

/// Segments of `text` with a flag telling whether the segment sat between a
/// pair of `marker`s (the markers themselves are stripped).
fn split_paired<'a>(text: &'a str, marker: &str) -> Vec<(&'a str, bool)> {
    let finder = memmem::Finder::new(marker);
    let bytes = text.as_bytes();
    let mut segments = Vec::new();
    let mut cursor = 0;

    while let Some(open) = finder.find(&bytes[cursor..]).map(|pos| cursor + pos) {
        let inner_start = open + marker.len();
        let Some(close) = finder
            .find(&bytes[inner_start..])
            .map(|pos| inner_start + pos)
        else {
            break;
        };
        segments.push((&text[cursor..open], false));
        segments.push((&text[inner_start..close], true));
        cursor = close + marker.len();
    }

    segments.push((&text[cursor..], false));
    segments
}

/// Plain-text rendering of spans, markers removed.
pub fn spans_text(spans: &[TextSpan]) -> String {
    spans.iter().map(TextSpan::text).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn plain(text: &str) -> TextSpan {
        TextSpan::Plain(text.into())
    }

    #[test]
    fn bullets_then_paragraph() {
        assert_eq!(
            parse_blocks("- first\n- second\n\nDone"),
            vec![
                DisplayBlock::BulletList(vec![vec![plain("first")], vec![plain("second")]]),
                DisplayBlock::Paragraph(vec![plain("Done")]),
            ]
        );
    }

    #[test]
    fn tip_callout_strips_prefix() {
        assert_eq!(
            parse_blocks("Tip: stay hydrated"),
            vec![DisplayBlock::Callout(
                CalloutKind::Tip,
                vec![plain("stay hydrated")]
            )]
        );
    }

    #[test]
    fn callouts_match_case_insensitively_and_by_glyph() {
        let blocks = parse_blocks("WARNING: hot\n⚠️ sharp\n⚠ edges\nnote:   fine\n✅ ok\n💡idea");
        let kinds: Vec<_> = blocks
            .iter()
            .map(|block| match block {
                DisplayBlock::Callout(kind, spans) => (*kind, spans_text(spans)),
                other => panic!("expected callout, got {other:?}"),
            })
            .collect();
        assert_eq!(
            kinds,
            vec![
                (CalloutKind::Warning, "hot".to_string()),
                (CalloutKind::Warning, "sharp".to_string()),
                (CalloutKind::Warning, "edges".to_string()),
                (CalloutKind::Note, "fine".to_string()),
                (CalloutKind::Note, "ok".to_string()),
                (CalloutKind::Tip, "idea".to_string()),
            ]
        );
    }

    #[test]
    fn inline_bold_and_code() {
        assert_eq!(
            parse_blocks("This is **bold** and `code`."),
            vec![DisplayBlock::Paragraph(vec![
                plain("This is "),
                TextSpan::Bold("bold".into()),
                plain(" and "),
                TextSpan::Code("code".into()),
                plain("."),
            ])]
        );
    }

    #[test]
    fn headings_flush_pending_lists() {
        assert_eq!(
            parse_blocks("1. one\n2. two\n## Care\n### Water **daily**"),
            vec![
                DisplayBlock::NumberedList(vec![vec![plain("one")], vec![plain("two")]]),
                DisplayBlock::Heading(2, vec![plain("Care")]),
                DisplayBlock::Heading(
                    3,
                    vec![plain("Water "), TextSpan::Bold("daily".into())]
                ),
            ]
        );
    }

    #[test]
    fn switching_list_kind_flushes_the_other() {
        assert_eq!(
            parse_blocks("- a\n1. b\n* c\n• d"),
            vec![
                DisplayBlock::BulletList(vec![vec![plain("a")]]),
                DisplayBlock::NumberedList(vec![vec![plain("b")]]),
                DisplayBlock::BulletList(vec![vec![plain("c")], vec![plain("d")]]),
            ]
        );
    }

    #[test]
    fn trailing_list_is_emitted() {
        assert_eq!(
            parse_blocks("Steps:\n10.   Peel\n11.\tSlice"),
            vec![
                DisplayBlock::Paragraph(vec![plain("Steps:")]),
                DisplayBlock::NumberedList(vec![vec![plain("Peel")], vec![plain("Slice")]]),
            ]
        );
    }

    #[test]
    fn near_misses_are_paragraphs() {
        for line in ["1.no space", "-dash", "**bold** start", "#### deep", "v1. thing"] {
            assert!(
                matches!(parse_blocks(line).as_slice(), [DisplayBlock::Paragraph(_)]),
                "{line}"
            );
        }
    }

    #[test]
    fn paragraph_lines_end_pending_lists() {
        assert_eq!(
            parse_blocks("- a\nplain\n- b"),
            vec![
                DisplayBlock::BulletList(vec![vec![plain("a")]]),
                DisplayBlock::Paragraph(vec![plain("plain")]),
                DisplayBlock::BulletList(vec![vec![plain("b")]]),
            ]
        );
    }

    #[test]
    fn unterminated_markers_stay_literal() {
        assert_eq!(
            parse_inline("so **nearly done and `open"),
            vec![plain("so **nearly done and `open")]
        );
        assert_eq!(
            parse_inline("**a** then **b"),
            vec![TextSpan::Bold("a".into()), plain(" then **b")]
        );
    }

    #[test]
    fn bold_wins_over_code() {
        assert_eq!(
            parse_inline("**use `x`** now"),
            vec![TextSpan::Bold("use `x`".into()), plain(" now")]
        );
    }

    #[test]
    fn empty_input_has_no_blocks() {
        assert!(parse_blocks("").is_empty());
        assert!(parse_blocks("\n \n\t\n").is_empty());
    }

    #[test]
    fn every_prefix_parses_and_reparse_is_stable() {
        let message = "## 🍌 Banana\n\nBananas are **high in potassium** and `fiber`.\n\n- Ripe when *yellow*\n• Store at room temp\n1. Peel\n2. Eat\n\nTip: pair with nuts\n⚠️ Allergy risk\n✅ Vegan";
        for (idx, _) in message.char_indices() {
            let prefix = &message[..idx];
            assert_eq!(parse_blocks(prefix), parse_blocks(prefix));
        }
        let full = parse_blocks(message);
        assert_eq!(full.len(), 7);
        assert_eq!(full, parse_blocks(message));
    }
}
