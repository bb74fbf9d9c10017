use ratatui::style::{Color, Modifier, Style};

use crate::api::Confidence;
use crate::ui::blocks::CalloutKind;

#[derive(Debug, Clone)]
pub struct Theme {
    // Overall background color to paint the full frame
    pub background_color: Color,
    // Chat message styles
    pub user_prefix_style: Style,
    pub user_text_style: Style,
    pub assistant_text_style: Style,
    pub info_text_style: Style,
    pub error_text_style: Style,

    // Structured content
    pub heading_style: Style,
    pub bold_style: Style,
    pub code_style: Style,
    pub list_marker_style: Style,
    pub tip_style: Style,
    pub warning_style: Style,
    pub note_style: Style,

    // Result view
    pub subject_style: Style,
    pub label_style: Style,
    pub confidence_high_style: Style,
    pub confidence_medium_style: Style,
    pub confidence_low_style: Style,
    pub suggestion_style: Style,

    // Chrome
    pub title_style: Style,
    pub streaming_indicator_style: Style,
    pub input_border_style: Style,
    pub input_title_style: Style,

    // Input area
    pub input_text_style: Style,
    pub input_cursor_style: Style,
}

impl Theme {
    pub fn dark_default() -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        Theme {
            background_color: Color::Black,
            user_prefix_style: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Cyan),
            assistant_text_style: Style::default().fg(Color::White),
            info_text_style: Style::default().fg(Color::DarkGray),
            error_text_style: Style::default().fg(Color::LightRed),

            heading_style: bold.fg(Color::LightYellow),
            bold_style: bold.fg(Color::White),
            code_style: Style::default().fg(Color::LightMagenta),
            list_marker_style: Style::default().fg(Color::Yellow),
            tip_style: Style::default().fg(Color::LightCyan),
            warning_style: Style::default().fg(Color::Yellow),
            note_style: Style::default().fg(Color::LightGreen),

            subject_style: bold.fg(Color::White),
            label_style: Style::default().fg(Color::Gray),
            confidence_high_style: bold.fg(Color::Green),
            confidence_medium_style: bold.fg(Color::Yellow),
            confidence_low_style: bold.fg(Color::Red),
            suggestion_style: Style::default().fg(Color::LightBlue),

            title_style: Style::default().fg(Color::Gray),
            streaming_indicator_style: Style::default().fg(Color::White),
            input_border_style: Style::default().fg(Color::Gray),
            input_title_style: Style::default().fg(Color::Gray),

            input_text_style: Style::default().fg(Color::White),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    pub fn light() -> Self {
        let bold = Style::default().add_modifier(Modifier::BOLD);
        Theme {
            background_color: Color::White,
            user_prefix_style: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::BOLD),
            user_text_style: Style::default().fg(Color::Blue),
            assistant_text_style: Style::default().fg(Color::Black),
            info_text_style: Style::default().fg(Color::Gray),
            error_text_style: Style::default().fg(Color::Red),

            heading_style: bold.fg(Color::Magenta),
            bold_style: bold.fg(Color::Black),
            code_style: Style::default().fg(Color::Magenta),
            list_marker_style: Style::default().fg(Color::Blue),
            tip_style: Style::default().fg(Color::Blue),
            warning_style: Style::default().fg(Color::Red),
            note_style: Style::default().fg(Color::Green),

            subject_style: bold.fg(Color::Black),
            label_style: Style::default().fg(Color::DarkGray),
            confidence_high_style: bold.fg(Color::Green),
            confidence_medium_style: bold.fg(Color::Yellow),
            confidence_low_style: bold.fg(Color::Red),
            suggestion_style: Style::default().fg(Color::Blue),

            title_style: Style::default().fg(Color::DarkGray),
            streaming_indicator_style: Style::default().fg(Color::Black),
            input_border_style: Style::default().fg(Color::Black),
            input_title_style: Style::default().fg(Color::DarkGray),

            input_text_style: Style::default().fg(Color::Black),
            input_cursor_style: Style::default().add_modifier(Modifier::REVERSED),
        }
    }

    /// Modifiers only, for piped output and terminals without color.
    pub fn monochrome() -> Self {
        let plain = Style::default();
        let bold = plain.add_modifier(Modifier::BOLD);
        Theme {
            background_color: Color::Reset,
            user_prefix_style: bold,
            user_text_style: plain,
            assistant_text_style: plain,
            info_text_style: plain.add_modifier(Modifier::DIM),
            error_text_style: bold,

            heading_style: bold,
            bold_style: bold,
            code_style: plain.add_modifier(Modifier::ITALIC),
            list_marker_style: plain,
            tip_style: plain,
            warning_style: bold,
            note_style: plain,

            subject_style: bold,
            label_style: plain.add_modifier(Modifier::DIM),
            confidence_high_style: bold,
            confidence_medium_style: bold,
            confidence_low_style: bold,
            suggestion_style: plain.add_modifier(Modifier::UNDERLINED),

            title_style: plain,
            streaming_indicator_style: plain,
            input_border_style: plain,
            input_title_style: plain,

            input_text_style: plain,
            input_cursor_style: plain.add_modifier(Modifier::REVERSED),
        }
    }

    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_lowercase().as_str() {
            "dark" | "default" | "default-dark" => Self::dark_default(),
            "light" => Self::light(),
            "mono" | "monochrome" => Self::monochrome(),
            // Fallback
            _ => Self::dark_default(),
        }
    }

    pub fn callout_style(&self, kind: CalloutKind) -> Style {
        match kind {
            CalloutKind::Tip => self.tip_style,
            CalloutKind::Warning => self.warning_style,
            CalloutKind::Note => self.note_style,
        }
    }

    pub fn confidence_style(&self, confidence: Confidence) -> Style {
        match confidence {
            Confidence::High => self.confidence_high_style,
            Confidence::Medium => self.confidence_medium_style,
            Confidence::Low => self.confidence_low_style,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_resolve_case_insensitively() {
        assert_eq!(Theme::from_name("LIGHT").background_color, Color::White);
        assert_eq!(Theme::from_name("mono").background_color, Color::Reset);
        assert_eq!(Theme::from_name("nope").background_color, Color::Black);
    }

    #[test]
    fn monochrome_uses_no_colors() {
        let theme = Theme::monochrome();
        for style in [
            theme.heading_style,
            theme.code_style,
            theme.callout_style(CalloutKind::Warning),
            theme.confidence_style(Confidence::Low),
        ] {
            assert_eq!(style.fg, None);
        }
    }
}
