use ratatui::text::{Line, Span};

use crate::api::{Confidence, ScanContext};
use crate::core::analysis::AnalysisResult;
use crate::ui::blocks::parse_inline;
use crate::ui::render::{render_markup, render_spans};
use crate::ui::theme::Theme;

/// Lines summarising a scan: subject, category with confidence badge,
/// attributes, detail sections and tips. Detail and tip text goes through the
/// same inline formatting as chat replies.
pub fn render_result(result: &AnalysisResult, theme: &Theme) -> Vec<Line<'static>> {
    render_context(&result.to_context(), Some(result.confidence), theme)
}

pub fn render_context(
    context: &ScanContext,
    confidence: Option<Confidence>,
    theme: &Theme,
) -> Vec<Line<'static>> {
    let mut lines = vec![Line::from(Span::styled(
        context.name.clone(),
        theme.subject_style,
    ))];

    let mut summary = vec![Span::styled(context.category.clone(), theme.label_style)];
    if let Some(confidence) = confidence {
        summary.push(Span::styled(" · ", theme.label_style));
        summary.push(Span::styled(
            confidence.label(),
            theme.confidence_style(confidence),
        ));
    }
    lines.push(Line::from(summary));

    if !context.attributes.is_empty() {
        lines.push(Line::default());
        for attribute in &context.attributes {
            let mut spans = vec![Span::styled(
                format!("{}: ", attribute.label),
                theme.label_style,
            )];
            spans.extend(render_spans(
                &parse_inline(&attribute.value),
                theme.assistant_text_style,
                theme,
            ));
            lines.push(Line::from(spans));
        }
    }

    for detail in &context.details {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled(
            detail.title.clone(),
            theme.heading_style,
        )));
        lines.extend(render_markup(
            &detail.content,
            theme.assistant_text_style,
            theme,
        ));
    }

    if !context.tips.is_empty() {
        lines.push(Line::default());
        lines.push(Line::from(Span::styled("Tips", theme.heading_style)));
        for tip in &context.tips {
            let mut spans = vec![Span::styled("💡 ", theme.tip_style)];
            spans.extend(render_spans(
                &parse_inline(tip),
                theme.assistant_text_style,
                theme,
            ));
            lines.push(Line::from(spans));
        }
    }

    lines
}
