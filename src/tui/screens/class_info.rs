//! "Our class" form screen: school search, grade picker, class number, confirm

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
    Frame,
};
use unicode_width::UnicodeWidthStr;

use crate::{
    errors::ApiError,
    flow::{ClassInfoEntryFlow, FlowState},
    models::Grade,
    tui::{
        traits::ScreenAction,
        ui::{centered_rect, InputField, SelectableList, Styles},
    },
};

/// Rows of the suggestion list shown before it starts scrolling
const MAX_VISIBLE_SUGGESTIONS: usize = 5;

/// Focusable parts of the form
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FormField {
    School,
    Grade,
    ClassNumber,
    Confirm,
}

/// Class info screen state
pub struct ClassInfoScreen {
    pub flow: ClassInfoEntryFlow,
    pub fields: Vec<FormField>,
    pub current_field: usize,

    pub school_input: InputField,
    pub class_number_input: InputField,

    pub suggestion_list: SelectableList<String>,
    pub grade_list: SelectableList<Grade>,
    pub show_grade_dropdown: bool,
}

impl ClassInfoScreen {
    pub fn new(flow: ClassInfoEntryFlow) -> Self {
        // A pre-selected school is shown as a label and never takes focus
        let fields = if flow.is_search_enabled() {
            vec![FormField::School, FormField::Grade, FormField::ClassNumber, FormField::Confirm]
        } else {
            vec![FormField::Grade, FormField::ClassNumber, FormField::Confirm]
        };

        let mut grade_list = SelectableList::new(Grade::ALL.to_vec());
        grade_list.select(flow.grade().map(|g| g.index()));

        let mut screen = Self {
            school_input: InputField::new("School")
                .with_placeholder("School name")
                .with_value(flow.query()),
            class_number_input: InputField::new("Class")
                .with_placeholder("1")
                .with_value(flow.class_number()),
            suggestion_list: SelectableList::new(Vec::new()),
            grade_list,
            show_grade_dropdown: false,
            fields,
            current_field: 0,
            flow,
        };

        screen.update_field_focus();
        screen
    }

    pub fn focused_field(&self) -> FormField {
        self.fields[self.current_field]
    }

    fn focus(&mut self, field: FormField) {
        if let Some(index) = self.fields.iter().position(|f| *f == field) {
            self.current_field = index;
            self.update_field_focus();
        }
    }

    pub fn update_field_focus(&mut self) {
        let focused = self.focused_field();
        self.school_input.set_focus(focused == FormField::School);
        self.class_number_input.set_focus(focused == FormField::ClassNumber);
        self.flow.set_input_focus(focused == FormField::School);
    }

    fn next_field(&mut self) {
        self.current_field = (self.current_field + 1) % self.fields.len();
        self.update_field_focus();
    }

    fn previous_field(&mut self) {
        self.current_field = if self.current_field == 0 {
            self.fields.len() - 1
        } else {
            self.current_field - 1
        };
        self.update_field_focus();
    }

    /// Handle key events for the class info screen
    pub fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        if self.flow.alert().is_some() {
            if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
                self.flow.dismiss_alert();
            }
            return ScreenAction::None;
        }

        if self.show_grade_dropdown {
            return self.handle_grade_dropdown_event(key);
        }

        if self.focused_field() == FormField::School && self.flow.suggestions_visible() {
            if let Some(action) = self.handle_suggestion_event(key) {
                return action;
            }
        }

        match key.code {
            KeyCode::Tab | KeyCode::Down => self.next_field(),
            KeyCode::BackTab | KeyCode::Up => self.previous_field(),
            KeyCode::Esc => return ScreenAction::NavigateBack,
            KeyCode::Enter => match self.focused_field() {
                FormField::School => self.next_field(),
                FormField::Grade => self.show_grade_dropdown = true,
                FormField::ClassNumber | FormField::Confirm => return ScreenAction::Submit,
            },
            KeyCode::Char(c) => return self.handle_char_input(c),
            KeyCode::Backspace => return self.edit_focused(InputField::delete_char),
            KeyCode::Delete => return self.edit_focused(InputField::delete_char_forward),
            KeyCode::Left => self.move_cursor(InputField::move_cursor_left),
            KeyCode::Right => self.move_cursor(InputField::move_cursor_right),
            KeyCode::Home => self.move_cursor(InputField::move_cursor_to_start),
            KeyCode::End => self.move_cursor(InputField::move_cursor_to_end),
            _ => {}
        }
        ScreenAction::None
    }

    /// Keys consumed by the open suggestion list; `None` falls through to the form
    fn handle_suggestion_event(&mut self, key: KeyEvent) -> Option<ScreenAction> {
        match key.code {
            KeyCode::Up => self.suggestion_list.previous(),
            KeyCode::Down => self.suggestion_list.next(),
            KeyCode::Enter => {
                if let Some(index) = self.suggestion_list.selected_index() {
                    if self.flow.select_suggestion(index).is_some() {
                        self.school_input.set_value(self.flow.query());
                        self.suggestion_list = SelectableList::new(Vec::new());
                        // Selecting dismisses the keyboard: focus leaves the input
                        self.focus(FormField::Grade);
                    }
                }
            }
            KeyCode::Esc => self.flow.hide_suggestions(),
            _ => return None,
        }
        Some(ScreenAction::None)
    }

    fn handle_grade_dropdown_event(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Up => self.grade_list.previous(),
            KeyCode::Down => self.grade_list.next(),
            KeyCode::Enter => {
                self.flow.set_grade(self.grade_list.selected().copied());
                self.show_grade_dropdown = false;
            }
            KeyCode::Esc => self.show_grade_dropdown = false,
            KeyCode::Char(c) => {
                if let Ok(grade) = c.to_string().parse::<Grade>() {
                    self.grade_list.select(Some(grade.index()));
                    self.flow.set_grade(Some(grade));
                    self.show_grade_dropdown = false;
                }
            }
            _ => {}
        }
        ScreenAction::None
    }

    fn handle_char_input(&mut self, c: char) -> ScreenAction {
        match self.focused_field() {
            FormField::School => {
                self.school_input.insert_char(c);
                self.school_query_changed()
            }
            // Numeric keypad only
            FormField::ClassNumber if c.is_ascii_digit() => {
                self.class_number_input.insert_char(c);
                self.flow.set_class_number(&self.class_number_input.value);
                ScreenAction::None
            }
            FormField::Grade => self.handle_grade_dropdown_event(KeyEvent::from(KeyCode::Char(c))),
            _ => ScreenAction::None,
        }
    }

    fn edit_focused(&mut self, edit: fn(&mut InputField)) -> ScreenAction {
        match self.focused_field() {
            FormField::School => {
                edit(&mut self.school_input);
                self.school_query_changed()
            }
            FormField::ClassNumber => {
                edit(&mut self.class_number_input);
                self.flow.set_class_number(&self.class_number_input.value);
                ScreenAction::None
            }
            _ => ScreenAction::None,
        }
    }

    fn move_cursor(&mut self, movement: fn(&mut InputField)) {
        match self.focused_field() {
            FormField::School => movement(&mut self.school_input),
            FormField::ClassNumber => movement(&mut self.class_number_input),
            _ => {}
        }
    }

    fn school_query_changed(&mut self) -> ScreenAction {
        let ticket = self.flow.on_query_changed(&self.school_input.value);
        self.sync_suggestions();
        match ticket {
            Some(ticket) => ScreenAction::Search(ticket),
            None => ScreenAction::None,
        }
    }

    /// Feed a finished background search into the flow
    pub fn on_search_finished(&mut self, seq: u64, result: Result<Vec<String>, ApiError>) {
        if self.flow.apply_search_result(seq, result) {
            self.sync_suggestions();
        }
    }

    fn sync_suggestions(&mut self) {
        let items = if self.flow.suggestions_visible() {
            self.flow.suggestions().to_vec()
        } else {
            Vec::new()
        };
        self.suggestion_list = SelectableList::new(items);
    }

    /// Draw the class info screen
    pub fn draw(&mut self, f: &mut Frame, area: Rect) {
        let suggestion_height = if self.flow.suggestions_visible() {
            self.suggestion_list.len().min(MAX_VISIBLE_SUGGESTIONS) as u16 + 2
        } else {
            0
        };

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3),                 // Title
                Constraint::Length(3),                 // School
                Constraint::Length(suggestion_height), // Suggestions
                Constraint::Length(3),                 // Grade, class
                Constraint::Length(3),                 // Confirm
                Constraint::Min(0),
                Constraint::Length(4),                 // Instructions
            ])
            .split(area);

        self.draw_title(f, chunks[0]);
        self.draw_school_field(f, chunks[1]);
        if self.flow.suggestions_visible() {
            self.draw_suggestions(f, chunks[2]);
        }
        self.draw_grade_row(f, chunks[3]);
        self.draw_confirm_button(f, chunks[4]);
        self.draw_instructions(f, chunks[6]);

        if self.show_grade_dropdown {
            self.draw_grade_dropdown(f, area);
        }
        if self.flow.alert().is_some() {
            self.draw_alert(f, area);
        }
    }

    fn draw_title(&self, f: &mut Frame, area: Rect) {
        let title = match self.flow.state() {
            FlowState::Searching => "Our Class Info - Searching...",
            FlowState::Submitting => "Our Class Info - Registering...",
            _ => "Our Class Info",
        };

        let title_widget = Paragraph::new(title)
            .style(Styles::title())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title_widget, area);
    }

    fn draw_school_field(&self, f: &mut Frame, area: Rect) {
        let suffix = self.flow.suffix().trim().to_string();
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(10), Constraint::Length(suffix.width() as u16 + 2)])
            .split(area);

        match self.flow.preselected_school() {
            Some(name) => {
                let label = Paragraph::new(name.to_string()).block(
                    Block::default()
                        .title("School")
                        .borders(Borders::ALL)
                        .border_style(Styles::inactive_border()),
                );
                f.render_widget(label, area);
            }
            None => {
                self.school_input.render(f, chunks[0]);
                let suffix_label = Paragraph::new(suffix)
                    .block(Block::default().borders(Borders::ALL).border_style(Styles::inactive_border()));
                f.render_widget(suffix_label, chunks[1]);
            }
        }
    }

    fn draw_suggestions(&mut self, f: &mut Frame, area: Rect) {
        let items: Vec<ListItem> = self
            .suggestion_list
            .items
            .iter()
            .map(|name| ListItem::new(name.clone()))
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title("Suggestions")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            )
            .highlight_style(Styles::selected());

        f.render_stateful_widget(list, area, &mut self.suggestion_list.state);
    }

    fn draw_grade_row(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let grade_text = self
            .flow
            .grade()
            .map(|g| g.as_str().to_string())
            .unwrap_or_else(|| "-".to_string());
        let grade_style = if self.focused_field() == FormField::Grade {
            Styles::active_border()
        } else {
            Styles::inactive_border()
        };
        let grade = Paragraph::new(grade_text).block(
            Block::default()
                .title("Grade (Enter to select)")
                .borders(Borders::ALL)
                .border_style(grade_style),
        );
        f.render_widget(grade, chunks[0]);

        self.class_number_input.render(f, chunks[1]);
    }

    fn draw_confirm_button(&self, f: &mut Frame, area: Rect) {
        let style = if self.focused_field() == FormField::Confirm {
            Styles::selected()
        } else {
            Styles::default()
        };
        let button = Paragraph::new(Line::from(Span::styled(" Confirm ", style)))
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL).border_style(Styles::inactive_border()));
        f.render_widget(button, area);
    }

    fn draw_instructions(&self, f: &mut Frame, area: Rect) {
        let instructions = vec![
            Line::from("Tab/Shift+Tab: Navigate fields | ↑/↓: Suggestions, grades | Enter: Select/Confirm"),
            Line::from("Esc: Close list or go back | F1: Help"),
        ];

        let instructions_widget = Paragraph::new(instructions)
            .style(Styles::info())
            .block(
                Block::default()
                    .title("Instructions")
                    .borders(Borders::ALL)
                    .border_style(Styles::inactive_border()),
            );

        f.render_widget(instructions_widget, area);
    }

    fn draw_grade_dropdown(&mut self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(30, 50, area);

        let items: Vec<ListItem> = self
            .grade_list
            .items
            .iter()
            .enumerate()
            .map(|(i, grade)| {
                let style = if Some(i) == self.grade_list.selected_index() {
                    Styles::selected()
                } else {
                    Style::default()
                };
                ListItem::new(Line::from(Span::styled(grade.as_str(), style)))
            })
            .collect();

        let list = List::new(items)
            .block(
                Block::default()
                    .title("Select Grade")
                    .borders(Borders::ALL)
                    .border_style(Styles::active_border()),
            )
            .highlight_style(Styles::selected());

        f.render_widget(Clear, popup_area);
        f.render_stateful_widget(list, popup_area, &mut self.grade_list.state);
    }

    fn draw_alert(&self, f: &mut Frame, area: Rect) {
        let Some(alert) = self.flow.alert() else {
            return;
        };
        let popup_area = centered_rect(60, 30, area);

        let mut lines = vec![Line::from(alert.message.as_str()), Line::from("")];
        if alert.retryable {
            lines.push(Line::from("Press Enter, then Confirm to try again"));
        } else {
            lines.push(Line::from("Press Enter to continue"));
        }

        let popup = Paragraph::new(lines)
            .wrap(Wrap { trim: true })
            .block(
                Block::default()
                    .title(alert.title.as_str())
                    .borders(Borders::ALL)
                    .border_style(Styles::error()),
            );

        f.render_widget(Clear, popup_area);
        f.render_widget(popup, popup_area);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, buffer::Buffer, Terminal};

    const SUFFIX: &str = " Elementary School";

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::from(code)
    }

    fn type_text(screen: &mut ClassInfoScreen, text: &str) -> Vec<ScreenAction> {
        text.chars()
            .map(|c| screen.handle_key_event(key(KeyCode::Char(c))))
            .collect()
    }

    fn buffer_text(buffer: &Buffer) -> String {
        buffer.content.iter().map(|cell| cell.symbol()).collect()
    }

    #[test]
    fn test_typing_issues_one_search_per_keystroke() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        let actions = type_text(&mut screen, "Se");

        assert_eq!(actions.len(), 2);
        match (&actions[0], &actions[1]) {
            (ScreenAction::Search(first), ScreenAction::Search(second)) => {
                assert_eq!(first.query, "S");
                assert_eq!(second.query, "Se");
                assert!(second.seq > first.seq);
            }
            other => panic!("expected two searches, got {:?}", other),
        }
        assert_eq!(screen.flow.query(), "Se");
    }

    #[test]
    fn test_erasing_query_clears_suggestions_without_search() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        let actions = type_text(&mut screen, "S");
        let ScreenAction::Search(ticket) = &actions[0] else {
            panic!("expected a search");
        };
        screen.on_search_finished(ticket.seq, Ok(vec!["Seoul Elementary School".to_string()]));
        assert!(screen.flow.suggestions_visible());

        let action = screen.handle_key_event(key(KeyCode::Backspace));
        assert_eq!(action, ScreenAction::None);
        assert!(!screen.flow.suggestions_visible());
        assert!(screen.suggestion_list.is_empty());
    }

    #[test]
    fn test_selecting_suggestion_with_keyboard() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        let actions = type_text(&mut screen, "Seoul");
        let ScreenAction::Search(ticket) = actions.last().unwrap().clone() else {
            panic!("expected a search");
        };
        screen.on_search_finished(
            ticket.seq,
            Ok(vec![
                "Seoul Elementary School".to_string(),
                "Seoul Central Elementary School".to_string(),
            ]),
        );

        screen.handle_key_event(key(KeyCode::Down));
        screen.handle_key_event(key(KeyCode::Enter));

        assert_eq!(screen.flow.query(), "Seoul Central");
        assert_eq!(screen.school_input.value, "Seoul Central");
        assert!(!screen.flow.suggestions_visible());
        assert_eq!(screen.focused_field(), FormField::Grade);
        assert!(!screen.flow.input_focused());
    }

    #[test]
    fn test_grade_picker_and_class_number() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        screen.handle_key_event(key(KeyCode::Tab));
        assert_eq!(screen.focused_field(), FormField::Grade);

        screen.handle_key_event(key(KeyCode::Enter));
        assert!(screen.show_grade_dropdown);
        screen.handle_key_event(key(KeyCode::Down));
        screen.handle_key_event(key(KeyCode::Down));
        screen.handle_key_event(key(KeyCode::Enter));
        assert!(!screen.show_grade_dropdown);
        assert_eq!(screen.flow.grade(), Some(Grade::Fifth));

        screen.handle_key_event(key(KeyCode::Tab));
        screen.handle_key_event(key(KeyCode::Backspace));
        type_text(&mut screen, "1x2");
        assert_eq!(screen.flow.class_number(), "12");
    }

    #[test]
    fn test_confirm_requests_submit() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        screen.handle_key_event(key(KeyCode::BackTab));
        assert_eq!(screen.focused_field(), FormField::Confirm);
        assert_eq!(screen.handle_key_event(key(KeyCode::Enter)), ScreenAction::Submit);
    }

    #[test]
    fn test_alert_blocks_input_until_dismissed() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        assert!(screen.flow.on_submit().is_err());
        assert_eq!(screen.flow.state(), FlowState::Idle);

        assert_eq!(screen.handle_key_event(key(KeyCode::Char('a'))), ScreenAction::None);
        assert_eq!(screen.flow.query(), "");

        screen.handle_key_event(key(KeyCode::Enter));
        assert!(screen.flow.alert().is_none());
    }

    #[test]
    fn test_preselected_school_is_read_only() {
        let flow = ClassInfoEntryFlow::initialize(Some("Seoul Elementary School"), SUFFIX);
        let mut screen = ClassInfoScreen::new(flow);
        assert_eq!(screen.focused_field(), FormField::Grade);
        assert!(!screen.fields.contains(&FormField::School));

        let mut terminal = Terminal::new(TestBackend::new(90, 24)).unwrap();
        terminal.draw(|f| {
            let area = f.size();
            screen.draw(f, area)
        }).unwrap();
        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Seoul Elementary School"));
    }

    #[test]
    fn test_draw_shows_suggestions_and_alert() {
        let mut screen = ClassInfoScreen::new(ClassInfoEntryFlow::new(SUFFIX));
        let actions = type_text(&mut screen, "Seoul");
        let ScreenAction::Search(ticket) = actions.last().unwrap().clone() else {
            panic!("expected a search");
        };
        screen.on_search_finished(ticket.seq, Ok(vec!["Seoul Central Elementary School".to_string()]));

        let mut terminal = Terminal::new(TestBackend::new(90, 30)).unwrap();
        terminal.draw(|f| {
            let area = f.size();
            screen.draw(f, area)
        }).unwrap();
        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("Suggestions"));
        assert!(text.contains("Seoul Central Elementary School"));

        screen.flow.set_class_number("");
        assert!(screen.flow.on_submit().is_err());
        terminal.draw(|f| {
            let area = f.size();
            screen.draw(f, area)
        }).unwrap();
        let text = buffer_text(terminal.backend().buffer());
        assert!(text.contains("registration failed"));
    }
}
