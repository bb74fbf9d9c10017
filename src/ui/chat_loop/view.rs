//! Chat panel state and drawing, independent of the terminal it runs in.

use ratatui::crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::layout::{Constraint, Layout, Rect};
use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Wrap};
use ratatui::Frame;
use tokio::sync::mpsc;
use tui_textarea::TextArea;

use crate::core::app::{ChatApp, Notification};
use crate::core::chat_stream::{StreamMessage, StreamParams};
use crate::core::conversation::SubmitError;
use crate::ui::render::render_messages;
use crate::ui::theme::Theme;
use crate::utils::wrap::wrapped_height;

const PAGE: usize = 10;
const MAX_INPUT_ROWS: u16 = 5;
const HINTS: &str = "Enter send · Shift+Enter newline · Tab suggestion · PgUp/PgDn scroll · Esc close";

pub enum ViewOutcome {
    Ignored,
    Redraw,
    Send(StreamParams),
    Exit,
}

pub struct ChatView {
    app: ChatApp,
    textarea: TextArea<'static>,
    theme: Theme,
    scroll_offset: usize,
    auto_scroll: bool,
    suggestion_cursor: Option<usize>,
}

impl ChatView {
    pub fn new(app: ChatApp, theme: Theme) -> Self {
        let mut view = Self {
            app,
            textarea: TextArea::default(),
            theme,
            scroll_offset: 0,
            auto_scroll: true,
            suggestion_cursor: None,
        };
        view.style_textarea();
        view
    }

    fn style_textarea(&mut self) {
        self.textarea.set_style(self.theme.input_text_style);
        self.textarea.set_cursor_style(self.theme.input_cursor_style);
        self.textarea.set_cursor_line_style(Style::default());
        self.textarea.set_block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(self.theme.input_border_style)
                .title(Span::styled(
                    format!("Ask about {}", self.app.context().name),
                    self.theme.input_title_style,
                )),
        );
    }

    pub fn app(&self) -> &ChatApp {
        &self.app
    }

    pub fn input_text(&self) -> String {
        self.textarea.lines().join("\n")
    }

    fn set_input(&mut self, text: &str) {
        self.textarea = TextArea::from(text.split('\n'));
        self.style_textarea();
        self.textarea.move_cursor(tui_textarea::CursorMove::End);
    }

    /// Abort any in-flight reply and drop the conversation.
    pub fn close(&mut self) {
        self.app.close();
    }

    pub fn handle_event(&mut self, event: Event) -> ViewOutcome {
        match event {
            Event::Key(key) => self.handle_key(key),
            Event::Paste(text) => {
                self.textarea.insert_str(text.replace('\r', ""));
                ViewOutcome::Redraw
            }
            Event::Resize(..) => ViewOutcome::Redraw,
            _ => ViewOutcome::Ignored,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> ViewOutcome {
        if key.kind != KeyEventKind::Press {
            return ViewOutcome::Ignored;
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => ViewOutcome::Exit,
            KeyCode::Char('c') if ctrl => ViewOutcome::Exit,
            KeyCode::Enter
                if key
                    .modifiers
                    .intersects(KeyModifiers::SHIFT | KeyModifiers::ALT) =>
            {
                self.textarea.insert_newline();
                ViewOutcome::Redraw
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Tab => self.cycle_suggestion(),
            KeyCode::PageUp => self.scroll_up(PAGE),
            KeyCode::PageDown => self.scroll_down(PAGE),
            KeyCode::Up if ctrl => self.scroll_up(1),
            KeyCode::Down if ctrl => self.scroll_down(1),
            _ => {
                self.app.clear_notification();
                self.textarea.input(tui_textarea::Input::from(key));
                ViewOutcome::Redraw
            }
        }
    }

    fn submit(&mut self) -> ViewOutcome {
        let input = self.input_text();
        match self.app.send(&input) {
            Ok(params) => {
                self.set_input("");
                self.suggestion_cursor = None;
                self.auto_scroll = true;
                ViewOutcome::Send(params)
            }
            Err(SubmitError::Empty) => ViewOutcome::Ignored,
            Err(err @ SubmitError::InFlight) => {
                self.app.set_notification(Notification::Info(err.to_string()));
                ViewOutcome::Redraw
            }
        }
    }

    fn cycle_suggestion(&mut self) -> ViewOutcome {
        let suggestions = self.app.suggestions();
        if suggestions.is_empty() {
            return ViewOutcome::Ignored;
        }
        let next = match self.suggestion_cursor {
            Some(idx) => (idx + 1) % suggestions.len(),
            None => 0,
        };
        self.suggestion_cursor = Some(next);
        self.set_input(&suggestions[next]);
        ViewOutcome::Redraw
    }

    fn scroll_up(&mut self, rows: usize) -> ViewOutcome {
        self.auto_scroll = false;
        self.scroll_offset = self.scroll_offset.saturating_sub(rows);
        ViewOutcome::Redraw
    }

    fn scroll_down(&mut self, rows: usize) -> ViewOutcome {
        // Clamped, and auto-scroll re-armed, on the next draw.
        self.scroll_offset = self.scroll_offset.saturating_add(rows);
        ViewOutcome::Redraw
    }

    /// Drain everything the stream service has produced. Consecutive chunks
    /// are applied as one delta. Returns true when anything visible changed.
    pub fn drain_stream(&mut self, rx: &mut mpsc::UnboundedReceiver<(StreamMessage, u64)>) -> bool {
        let mut changed = false;
        let mut pending: Option<(String, u64)> = None;

        while let Ok((message, stream_id)) = rx.try_recv() {
            match message {
                StreamMessage::Chunk(delta) => {
                    if let Some((text, id)) = pending.as_mut() {
                        if *id == stream_id {
                            text.push_str(&delta);
                            continue;
                        }
                    }
                    changed |= self.flush_chunks(pending.take());
                    pending = Some((delta, stream_id));
                }
                other => {
                    changed |= self.flush_chunks(pending.take());
                    changed |= self.app.handle_stream_message(other, stream_id);
                }
            }
        }

        changed | self.flush_chunks(pending)
    }

    fn flush_chunks(&mut self, pending: Option<(String, u64)>) -> bool {
        match pending {
            Some((text, id)) => self.app.handle_stream_message(StreamMessage::Chunk(text), id),
            None => false,
        }
    }

    fn transcript_lines(&self) -> Vec<Line<'static>> {
        let messages = self.app.messages();
        if messages.is_empty() {
            let mut lines = vec![
                Line::from(Span::styled(
                    format!(
                        "Ask anything about {} ({}).",
                        self.app.context().name,
                        self.app.context().category
                    ),
                    self.theme.info_text_style,
                )),
                Line::default(),
            ];
            for (idx, suggestion) in self.app.suggestions().into_iter().enumerate() {
                let mut style = self.theme.suggestion_style;
                if self.suggestion_cursor == Some(idx) {
                    style = style.add_modifier(Modifier::REVERSED);
                }
                lines.push(Line::from(vec![
                    Span::styled("  › ", self.theme.list_marker_style),
                    Span::styled(suggestion, style),
                ]));
            }
            return lines;
        }

        let mut lines = render_messages(messages, &self.theme);
        let awaiting_text = messages
            .last()
            .is_some_and(|last| last.is_assistant() && last.content.is_empty());
        if self.app.is_waiting() && awaiting_text {
            lines.push(Line::from(Span::styled(
                "Thinking…",
                self.theme.streaming_indicator_style,
            )));
        }
        lines
    }

    fn status_line(&self) -> Line<'static> {
        match self.app.notification() {
            Some(Notification::Error(text)) => Line::from(Span::styled(
                format!("⚠ {text}"),
                self.theme.error_text_style,
            )),
            Some(Notification::Info(text)) => {
                Line::from(Span::styled(text.clone(), self.theme.info_text_style))
            }
            None if self.app.is_waiting() => Line::from(Span::styled(
                "Receiving reply…",
                self.theme.streaming_indicator_style,
            )),
            None => Line::from(Span::styled(HINTS, self.theme.info_text_style)),
        }
    }

    fn clamp_scroll(&mut self, lines: &[Line<'_>], area: Rect) -> u16 {
        let total = wrapped_height(lines, area.width);
        let max_offset = total.saturating_sub(usize::from(area.height));
        if self.auto_scroll || self.scroll_offset >= max_offset {
            self.scroll_offset = max_offset;
            self.auto_scroll = true;
        }
        u16::try_from(self.scroll_offset).unwrap_or(u16::MAX)
    }

    pub fn draw(&mut self, frame: &mut Frame) {
        let area = frame.area();
        frame.render_widget(
            Block::default().style(Style::default().bg(self.theme.background_color)),
            area,
        );

        let input_rows = u16::try_from(self.textarea.lines().len())
            .unwrap_or(MAX_INPUT_ROWS)
            .clamp(1, MAX_INPUT_ROWS);
        let [title_area, body_area, status_area, input_area] = Layout::vertical([
            Constraint::Length(1),
            Constraint::Min(1),
            Constraint::Length(1),
            Constraint::Length(input_rows + 2),
        ])
        .areas(area);

        frame.render_widget(
            Paragraph::new(Line::from(Span::styled(
                format!("scanlens · {}", self.app.context().name),
                self.theme.title_style,
            ))),
            title_area,
        );

        let lines = self.transcript_lines();
        let offset = self.clamp_scroll(&lines, body_area);
        frame.render_widget(
            Paragraph::new(lines)
                .wrap(Wrap { trim: false })
                .scroll((offset, 0)),
            body_area,
        );

        frame.render_widget(Paragraph::new(self.status_line()), status_area);
        frame.render_widget(&self.textarea, input_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ScanContext;
    use crate::core::chat_stream::ChatStreamService;
    use crate::core::service::ServiceSettings;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn view() -> ChatView {
        let app = ChatApp::new(
            reqwest::Client::new(),
            ServiceSettings {
                endpoint: "https://fn.example".into(),
                api_key: "key".into(),
            },
            ScanContext {
                name: "Banana".into(),
                category: "Fruit".into(),
                ..ScanContext::default()
            },
        );
        ChatView::new(app, Theme::monochrome())
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(view: &mut ChatView, text: &str) {
        for ch in text.chars() {
            view.handle_key(key(KeyCode::Char(ch)));
        }
    }

    fn screen(view: &mut ChatView) -> String {
        let mut terminal = Terminal::new(TestBackend::new(70, 16)).unwrap();
        terminal.draw(|frame| view.draw(frame)).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn enter_sends_and_clears_input() {
        let mut view = view();
        type_text(&mut view, "Is it ripe?");
        let ViewOutcome::Send(params) = view.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a send");
        };
        assert_eq!(params.messages[0].content, "Is it ripe?");
        assert_eq!(view.input_text(), "");
        assert!(view.app().is_waiting());
    }

    #[test]
    fn blank_enter_is_ignored() {
        let mut view = view();
        type_text(&mut view, "   ");
        assert!(matches!(
            view.handle_key(key(KeyCode::Enter)),
            ViewOutcome::Ignored
        ));
        assert!(view.app().messages().is_empty());
    }

    #[test]
    fn sending_while_waiting_shows_a_notice() {
        let mut view = view();
        type_text(&mut view, "one");
        view.handle_key(key(KeyCode::Enter));
        type_text(&mut view, "two");
        assert!(matches!(
            view.handle_key(key(KeyCode::Enter)),
            ViewOutcome::Redraw
        ));
        assert!(matches!(view.app().notification(), Some(Notification::Info(_))));
        assert_eq!(view.input_text(), "two");
    }

    #[test]
    fn tab_cycles_through_suggestions() {
        let mut view = view();
        view.handle_key(key(KeyCode::Tab));
        assert_eq!(view.input_text(), "Tell me more about Banana");
        view.handle_key(key(KeyCode::Tab));
        assert_eq!(view.input_text(), "Is this healthy?");
    }

    #[test]
    fn shift_enter_inserts_a_newline() {
        let mut view = view();
        type_text(&mut view, "a");
        view.handle_key(KeyEvent::new(KeyCode::Enter, KeyModifiers::SHIFT));
        type_text(&mut view, "b");
        assert_eq!(view.input_text(), "a\nb");
    }

    #[test]
    fn escape_exits() {
        let mut view = view();
        assert!(matches!(view.handle_key(key(KeyCode::Esc)), ViewOutcome::Exit));
    }

    #[test]
    fn drained_chunks_are_coalesced_into_the_reply() {
        let mut view = view();
        type_text(&mut view, "hi");
        let ViewOutcome::Send(params) = view.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a send");
        };
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(StreamMessage::Chunk("**Ba".into()), params.stream_id);
        service.send_for_test(StreamMessage::Chunk("nana**".into()), params.stream_id);
        service.send_for_test(StreamMessage::End, params.stream_id);
        service.send_for_test(StreamMessage::Chunk("stale".into()), params.stream_id + 1);

        assert!(view.drain_stream(&mut rx));
        assert_eq!(view.app().messages()[1].content, "**Banana**");
        assert!(!view.app().is_waiting());
        assert!(!view.drain_stream(&mut rx));
    }

    #[test]
    fn empty_conversation_lists_suggestions() {
        let mut view = view();
        let text = screen(&mut view);
        assert!(text.contains("Tell me more about Banana"));
        assert!(text.contains("Any safety concerns?"));
    }

    #[test]
    fn streamed_reply_renders_structured() {
        let mut view = view();
        type_text(&mut view, "hi");
        let ViewOutcome::Send(params) = view.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a send");
        };
        assert!(screen(&mut view).contains("Thinking…"));

        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(
            StreamMessage::Chunk("- first\n- second\n\nTip: peel".into()),
            params.stream_id,
        );
        view.drain_stream(&mut rx);
        let text = screen(&mut view);
        assert!(text.contains("• first"));
        assert!(text.contains("Tip: peel"));
        assert!(!text.contains("Thinking…"));
    }

    #[test]
    fn errors_show_in_the_status_line() {
        let mut view = view();
        type_text(&mut view, "hi");
        let ViewOutcome::Send(params) = view.handle_key(key(KeyCode::Enter)) else {
            panic!("expected a send");
        };
        let (service, mut rx) = ChatStreamService::new();
        service.send_for_test(
            StreamMessage::Error("Failed to get response".into()),
            params.stream_id,
        );
        service.send_for_test(StreamMessage::End, params.stream_id);
        view.drain_stream(&mut rx);
        assert!(screen(&mut view).contains("Failed to get response"));
        assert_eq!(view.app().messages().len(), 1);
    }
}
