//! Confirmation screen reached after a successful registration

use crossterm::event::{KeyCode, KeyEvent};
use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::{
    models::{ClassInfoPayload, ClassroomReceipt},
    tui::{app::Screen, traits::ScreenAction, ui::Styles},
};

pub struct RegisteredScreen {
    pub registration: Option<(ClassInfoPayload, ClassroomReceipt)>,
}

impl RegisteredScreen {
    pub fn new() -> Self {
        Self { registration: None }
    }

    pub fn set_registration(&mut self, payload: ClassInfoPayload, receipt: ClassroomReceipt) {
        self.registration = Some((payload, receipt));
    }

    pub fn handle_key_event(&mut self, key: KeyEvent) -> ScreenAction {
        match key.code {
            KeyCode::Enter | KeyCode::Esc => ScreenAction::Quit,
            KeyCode::Char('n') => ScreenAction::NavigateTo(Screen::ClassInfo),
            _ => ScreenAction::None,
        }
    }

    pub fn draw(&self, f: &mut Frame, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(3)])
            .split(area);

        let title = Paragraph::new("Class Registered")
            .style(Styles::success())
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        f.render_widget(title, chunks[0]);

        let lines = match &self.registration {
            Some((payload, receipt)) => vec![
                Line::from(vec![
                    Span::styled("School: ", Styles::title()),
                    Span::raw(payload.school_name.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Grade:  ", Styles::title()),
                    Span::raw(payload.grade.as_str()),
                ]),
                Line::from(vec![
                    Span::styled("Class:  ", Styles::title()),
                    Span::raw(payload.class_number.as_str()),
                ]),
                Line::from(""),
                Line::from(Span::styled(
                    format!("Server answered with status {}", receipt.status),
                    Styles::inactive(),
                )),
            ],
            None => vec![Line::from("No class registered yet")],
        };

        let summary = Paragraph::new(lines).block(
            Block::default()
                .title("Our Class")
                .borders(Borders::ALL)
                .border_style(Styles::inactive_border()),
        );
        f.render_widget(summary, chunks[1]);

        let instructions = Paragraph::new("Enter/Esc: Finish | n: Register another class")
            .style(Styles::info())
            .block(Block::default().borders(Borders::ALL).border_style(Styles::inactive_border()));
        f.render_widget(instructions, chunks[2]);
    }
}
