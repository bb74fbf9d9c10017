//! Styled terminal lines for parsed display blocks and chat transcripts.

use ratatui::style::Style;
use ratatui::text::{Line, Span};

use crate::core::message::ChatMessage;
use crate::ui::blocks::{parse_blocks, DisplayBlock, TextSpan};
use crate::ui::theme::Theme;

pub const USER_PREFIX: &str = "You: ";
const BULLET: &str = "• ";

pub fn render_spans(spans: &[TextSpan], base: Style, theme: &Theme) -> Vec<Span<'static>> {
    spans
        .iter()
        .map(|span| match span {
            TextSpan::Plain(text) => Span::styled(text.clone(), base),
            TextSpan::Bold(text) => Span::styled(text.clone(), base.patch(theme.bold_style)),
            TextSpan::Code(text) => Span::styled(text.clone(), theme.code_style),
        })
        .collect()
}

fn needs_gap(previous: &DisplayBlock, next: &DisplayBlock) -> bool {
    !matches!(
        (previous, next),
        (DisplayBlock::Paragraph(_), DisplayBlock::Paragraph(_))
    )
}

fn prefixed(prefix: Span<'static>, mut rest: Vec<Span<'static>>) -> Line<'static> {
    rest.insert(0, prefix);
    Line::from(rest)
}

/// Render parsed blocks with `base` as the body text style.
pub fn render_blocks(blocks: &[DisplayBlock], base: Style, theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    let mut previous: Option<&DisplayBlock> = None;

    for block in blocks {
        if previous.is_some_and(|prev| needs_gap(prev, block)) {
            lines.push(Line::default());
        }
        match block {
            DisplayBlock::Paragraph(spans) => {
                lines.push(Line::from(render_spans(spans, base, theme)));
            }
            DisplayBlock::Heading(level, spans) => {
                let style = base.patch(theme.heading_style);
                let marker = if *level == 2 { "▌ " } else { "› " };
                lines.push(prefixed(
                    Span::styled(marker, style),
                    render_spans(spans, style, theme),
                ));
            }
            DisplayBlock::BulletList(items) => {
                for item in items {
                    lines.push(prefixed(
                        Span::styled(BULLET, theme.list_marker_style),
                        render_spans(item, base, theme),
                    ));
                }
            }
            DisplayBlock::NumberedList(items) => {
                for (idx, item) in items.iter().enumerate() {
                    lines.push(prefixed(
                        Span::styled(format!("{}. ", idx + 1), theme.list_marker_style),
                        render_spans(item, base, theme),
                    ));
                }
            }
            DisplayBlock::Callout(kind, spans) => {
                let style = theme.callout_style(*kind);
                lines.push(prefixed(
                    Span::styled(
                        format!("{} {}: ", kind.glyph(), kind.label()),
                        style.patch(theme.bold_style),
                    ),
                    render_spans(spans, base.patch(style), theme),
                ));
            }
        }
        previous = Some(block);
    }

    lines
}

/// Parse and render free text, as shown for assistant replies and detail
/// sections.
pub fn render_markup(text: &str, base: Style, theme: &Theme) -> Vec<Line<'static>> {
    render_blocks(&parse_blocks(text), base, theme)
}

/// Transcript lines for a conversation; each message is followed by a blank
/// line. An empty assistant message renders as nothing so the caller can show
/// its own waiting indicator.
pub fn render_messages(messages: &[ChatMessage], theme: &Theme) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        if message.is_user() {
            lines.push(Line::from(vec![
                Span::styled(USER_PREFIX, theme.user_prefix_style),
                Span::styled(message.content.clone(), theme.user_text_style),
            ]));
        } else if message.content.is_empty() {
            continue;
        } else {
            lines.extend(render_markup(
                &message.content,
                theme.assistant_text_style,
                theme,
            ));
        }
        lines.push(Line::default());
    }
    lines
}
