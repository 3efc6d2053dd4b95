//! Main TUI application state and logic

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame, Terminal,
};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, info};

use super::events::AppEvent;
use super::screens::*;
use super::traits::ScreenAction;
use super::ui::centered_rect;
use crate::api::ClassroomApi;
use crate::config::Config;
use crate::errors::{ApiError, SubmitError};
use crate::flow::{ClassInfoEntryFlow, Navigator, SearchTicket};
use crate::models::{ClassInfoPayload, ClassroomReceipt};

/// How long the loop waits for a key before checking background results
const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Application screens
#[derive(Debug, Clone, PartialEq)]
pub enum Screen {
    ClassInfo,
    Registered,
}

/// Screen stack handed to the flow as its navigation handle
#[derive(Debug)]
pub struct Router {
    pub current: Screen,
    pub previous: Option<Screen>,
    pub last_registration: Option<(ClassInfoPayload, ClassroomReceipt)>,
}

impl Router {
    pub fn new() -> Self {
        Self {
            current: Screen::ClassInfo,
            previous: None,
            last_registration: None,
        }
    }

    pub fn navigate_to(&mut self, screen: Screen) {
        self.previous = Some(self.current.clone());
        self.current = screen;
    }

    /// Pop back one screen. Returns false when there is nowhere to go.
    pub fn back(&mut self) -> bool {
        match self.previous.take() {
            Some(screen) => {
                self.current = screen;
                true
            }
            None => false,
        }
    }
}

impl Navigator for Router {
    fn forward(&mut self, payload: &ClassInfoPayload, receipt: &ClassroomReceipt) {
        self.last_registration = Some((payload.clone(), receipt.clone()));
        self.navigate_to(Screen::Registered);
    }
}

/// Main TUI application state
pub struct App {
    /// Application configuration
    pub config: Config,
    api: Arc<dyn ClassroomApi>,
    preselected_school: Option<String>,
    pub router: Router,

    // Screen states
    pub class_info: ClassInfoScreen,
    pub registered: RegisteredScreen,

    events_tx: UnboundedSender<AppEvent>,
    events_rx: UnboundedReceiver<AppEvent>,
    /// Bumped for every new form so late results of the old one are ignored
    generation: u64,

    // Global application state
    pub should_quit: bool,
    pub show_help_popup: bool,
    pub status_message: Option<String>,
    pub error_message: Option<String>,
}

impl App {
    /// Create a new TUI application
    pub fn new(config: Config, api: Arc<dyn ClassroomApi>, preselected_school: Option<&str>) -> Self {
        let flow = ClassInfoEntryFlow::initialize(preselected_school, &config.school_suffix);
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        Self {
            config,
            api,
            preselected_school: preselected_school.map(str::to_string),
            router: Router::new(),

            class_info: ClassInfoScreen::new(flow),
            registered: RegisteredScreen::new(),

            events_tx,
            events_rx,
            generation: 0,

            should_quit: false,
            show_help_popup: false,
            status_message: None,
            error_message: None,
        }
    }

    /// Run the main application loop
    pub async fn run<B: Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<()> {
        loop {
            // Draw the UI
            terminal.draw(|f| self.draw(f))?;

            // Apply finished background searches and submissions
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_app_event(event);
            }

            // Handle events
            if crossterm::event::poll(INPUT_POLL_INTERVAL)? {
                if let Event::Key(key) = crossterm::event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(key).await?;
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    /// Apply an event produced by a background task
    pub fn handle_app_event(&mut self, event: AppEvent) {
        if event.generation() != self.generation {
            debug!(
                "Dropping result of an earlier form (generation {}, current {})",
                event.generation(),
                self.generation
            );
            return;
        }

        match event {
            AppEvent::SearchFinished { seq, result, .. } => {
                self.class_info.on_search_finished(seq, result);
            }
            AppEvent::SubmitFinished { result, .. } => self.finish_submit(result),
        }
    }

    /// Handle keyboard input events
    pub async fn handle_key_event(&mut self, key: KeyEvent) -> Result<()> {
        // Global shortcuts
        match key.code {
            KeyCode::F(1) => {
                self.show_help_popup = !self.show_help_popup;
                return Ok(());
            }
            KeyCode::Char('c') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.should_quit = true;
                return Ok(());
            }
            KeyCode::Esc if self.show_help_popup => {
                self.show_help_popup = false;
                return Ok(());
            }
            _ => {}
        }

        if self.show_help_popup {
            return Ok(());
        }

        let action = match self.router.current {
            Screen::ClassInfo => self.class_info.handle_key_event(key),
            Screen::Registered => self.registered.handle_key_event(key),
        };
        self.apply_action(action);

        Ok(())
    }

    fn apply_action(&mut self, action: ScreenAction) {
        match action {
            ScreenAction::Search(ticket) => self.spawn_search(ticket),
            ScreenAction::Submit => self.spawn_submit(),
            ScreenAction::NavigateTo(Screen::ClassInfo) => self.start_new_registration(),
            ScreenAction::NavigateTo(screen) => self.navigate_to_screen(screen),
            ScreenAction::NavigateBack => {
                if self.router.back() {
                    self.clear_messages();
                } else {
                    self.should_quit = true;
                }
            }
            ScreenAction::Quit => self.should_quit = true,
            ScreenAction::None => {}
        }
    }

    /// Run a school search without blocking key handling
    fn spawn_search(&self, ticket: SearchTicket) {
        debug!("Searching schools #{}: '{}'", ticket.seq, ticket.query);
        let api = Arc::clone(&self.api);
        let events_tx = self.events_tx.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = api.search_schools(&ticket.query).await;
            // The receiver only goes away when the app is shutting down
            let _ = events_tx.send(AppEvent::SearchFinished {
                generation,
                seq: ticket.seq,
                result,
            });
        });
    }

    /// Validate the form and register it in the background
    fn spawn_submit(&mut self) {
        let payload = match self.class_info.flow.on_submit() {
            Ok(payload) => payload,
            Err(_) => {
                // The form shows its own alert popup
                self.clear_messages();
                return;
            }
        };

        self.set_status("Registering class...".to_string());
        let api = Arc::clone(&self.api);
        let events_tx = self.events_tx.clone();
        let generation = self.generation;

        tokio::spawn(async move {
            let result = api.submit_class_info(&payload).await;
            let _ = events_tx.send(AppEvent::SubmitFinished { generation, result });
        });
    }

    fn finish_submit(&mut self, result: Result<ClassroomReceipt, ApiError>) {
        match self.class_info.flow.apply_submit_result(result, &mut self.router) {
            Ok(()) => {
                if let Some((payload, receipt)) = self.router.last_registration.take() {
                    self.set_status(format!("Registered {}", payload.school_name));
                    self.registered.set_registration(payload, receipt);
                }
            }
            Err(SubmitError::NothingPending) => {
                debug!("Ignoring a registration answer nobody is waiting for");
            }
            Err(e) => self.set_error(e.to_string()),
        }
    }

    /// Reset the form for another class, forgetting the finished one
    fn start_new_registration(&mut self) {
        info!("Starting a new class registration");
        let flow = ClassInfoEntryFlow::initialize(
            self.preselected_school.as_deref(),
            &self.config.school_suffix,
        );
        self.class_info = ClassInfoScreen::new(flow);
        self.router = Router::new();
        self.generation += 1;
        self.clear_messages();
    }

    /// Draw the UI
    pub fn draw(&mut self, f: &mut Frame) {
        let size = f.size();

        // Main layout: status bar at bottom, content area above
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        // Draw current screen content
        match self.router.current {
            Screen::ClassInfo => self.class_info.draw(f, chunks[0]),
            Screen::Registered => self.registered.draw(f, chunks[0]),
        }

        // Draw status bar
        self.draw_status_bar(f, chunks[1]);

        // Draw help popup if active
        if self.show_help_popup {
            self.draw_help_popup(f, size);
        }
    }

    /// Draw status bar with current screen info and shortcuts
    fn draw_status_bar(&self, f: &mut Frame, area: Rect) {
        let status_text = if let Some(ref msg) = self.status_message {
            format!("Status: {}", msg)
        } else if let Some(ref err) = self.error_message {
            format!("Error: {}", err)
        } else {
            format!(
                "Our Class - {} | Esc: Back | Ctrl+C: Quit | F1: Help",
                match self.router.current {
                    Screen::ClassInfo => "Class Info",
                    Screen::Registered => "Registered",
                }
            )
        };

        let style = if self.error_message.is_some() {
            Style::default().fg(Color::Red)
        } else if self.status_message.is_some() {
            Style::default().fg(Color::Green)
        } else {
            Style::default().fg(Color::Gray)
        };

        let status_bar = Paragraph::new(status_text)
            .style(style)
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(status_bar, area);
    }

    /// Draw help popup with context-sensitive shortcuts
    fn draw_help_popup(&self, f: &mut Frame, area: Rect) {
        let popup_area = centered_rect(80, 70, area);

        f.render_widget(Clear, popup_area);

        let help_popup = Paragraph::new(self.get_context_help())
            .block(
                Block::default()
                    .title("Help - Context Shortcuts")
                    .borders(Borders::ALL)
                    .style(Style::default().fg(Color::Yellow)),
            )
            .style(Style::default().fg(Color::White));

        f.render_widget(help_popup, popup_area);
    }

    /// Get context-sensitive help content
    fn get_context_help(&self) -> String {
        let global_help = "Global Shortcuts:\n\
            ESC - Go back\n\
            Ctrl+C - Quit application\n\
            F1 - Toggle this help\n\n";

        let screen_help = match self.router.current {
            Screen::ClassInfo => {
                "Class Info:\n\
                Type a school name to see suggestions\n\
                ↑/↓ - Move through suggestions\n\
                Enter - Pick suggestion / open grade list / confirm\n\
                Tab - Next field\n\
                Shift+Tab - Previous field\n\
                1-6 on the grade field - Pick grade directly"
            }
            Screen::Registered => {
                "Registered:\n\
                Enter - Finish\n\
                n - Register another class"
            }
        };

        format!("{}{}", global_help, screen_help)
    }

    /// Navigate to a specific screen
    pub fn navigate_to_screen(&mut self, screen: Screen) {
        self.router.navigate_to(screen);
        self.clear_messages();
    }

    /// Set status message
    pub fn set_status(&mut self, message: String) {
        self.status_message = Some(message);
        self.error_message = None;
    }

    /// Set error message
    pub fn set_error(&mut self, message: String) {
        self.error_message = Some(message);
        self.status_message = None;
    }

    /// Clear status and error messages
    pub fn clear_messages(&mut self) {
        self.status_message = None;
        self.error_message = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::flow::FlowState;
    use crate::models::Grade;
    use async_trait::async_trait;
    use ratatui::backend::TestBackend;
    use std::sync::Mutex;

    /// Answers every keyword with "<keyword> Elementary School"
    #[derive(Default)]
    struct EchoApi {
        fail_submit: bool,
        submissions: Mutex<Vec<ClassInfoPayload>>,
    }

    #[async_trait]
    impl ClassroomApi for EchoApi {
        async fn search_schools(&self, keyword: &str) -> Result<Vec<String>, ApiError> {
            Ok(vec![format!("{} Elementary School", keyword)])
        }

        async fn submit_class_info(&self, payload: &ClassInfoPayload) -> Result<ClassroomReceipt, ApiError> {
            self.submissions.lock().unwrap().push(payload.clone());
            if self.fail_submit {
                return Err(ApiError::Status {
                    status_code: 500,
                    message: "down".to_string(),
                });
            }
            Ok(ClassroomReceipt {
                status: 201,
                body: serde_json::json!({"classroomId": 1}),
            })
        }
    }

    fn test_app(api: Arc<EchoApi>, preselected: Option<&str>) -> App {
        let mut config = Config::default();
        config.school_suffix = " Elementary School".to_string();
        App::new(config, api, preselected)
    }

    async fn press(app: &mut App, code: KeyCode) {
        app.handle_key_event(KeyEvent::from(code)).await.unwrap();
    }

    async fn type_text(app: &mut App, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c)).await;
        }
    }

    /// Wait for `count` background results and apply them in arrival order
    async fn drain_events(app: &mut App, count: usize) {
        for _ in 0..count {
            let event = app.events_rx.recv().await.unwrap();
            app.handle_app_event(event);
        }
    }

    #[tokio::test]
    async fn test_search_select_and_register() {
        let api = Arc::new(EchoApi::default());
        let mut app = test_app(api.clone(), None);

        type_text(&mut app, "Main").await;
        drain_events(&mut app, 4).await;

        // Only the last keystroke's answer survives, whatever the arrival order
        assert_eq!(app.class_info.flow.suggestions(), &["Main Elementary School"]);

        press(&mut app, KeyCode::Enter).await;
        assert_eq!(app.class_info.flow.query(), "Main");

        // Grade field: pick 5 directly, then class 2
        press(&mut app, KeyCode::Char('5')).await;
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Backspace).await;
        type_text(&mut app, "2").await;
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Enter).await;
        drain_events(&mut app, 1).await;

        let submissions = api.submissions.lock().unwrap().clone();
        assert_eq!(
            submissions,
            vec![ClassInfoPayload {
                school_name: "Main Elementary School".to_string(),
                grade: Grade::Fifth,
                class_number: "2".to_string(),
            }]
        );
        assert_eq!(app.router.current, Screen::Registered);
        assert!(app.registered.registration.is_some());

        // Enter on the confirmation screen finishes
        press(&mut app, KeyCode::Enter).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_empty_school_shows_alert_without_submitting() {
        let api = Arc::new(EchoApi::default());
        let mut app = test_app(api.clone(), None);

        press(&mut app, KeyCode::BackTab).await;
        press(&mut app, KeyCode::Enter).await;

        assert!(api.submissions.lock().unwrap().is_empty());
        let alert = app.class_info.flow.alert().unwrap();
        assert_eq!(alert.title, "registration failed");
        assert_eq!(app.router.current, Screen::ClassInfo);
    }

    #[tokio::test]
    async fn test_failed_submission_stays_on_form() {
        let api = Arc::new(EchoApi {
            fail_submit: true,
            ..Default::default()
        });
        let mut app = test_app(api.clone(), Some("Main Elementary School"));

        // Pre-selected school: focus starts on the grade, Confirm is two tabs away
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Tab).await;
        press(&mut app, KeyCode::Enter).await;
        drain_events(&mut app, 1).await;

        assert_eq!(api.submissions.lock().unwrap().len(), 1);
        assert_eq!(app.router.current, Screen::ClassInfo);
        assert!(app.error_message.is_some());
        assert!(app.class_info.flow.alert().unwrap().retryable);
    }

    #[tokio::test]
    async fn test_new_registration_resets_form() {
        let api = Arc::new(EchoApi::default());
        let mut app = test_app(api, Some("Main Elementary School"));

        app.class_info.flow.set_grade(Some(Grade::First));
        app.apply_action(ScreenAction::Submit);
        drain_events(&mut app, 1).await;
        assert_eq!(app.router.current, Screen::Registered);

        press(&mut app, KeyCode::Char('n')).await;
        assert_eq!(app.router.current, Screen::ClassInfo);
        assert_eq!(app.class_info.flow.grade(), Some(Grade::Third));
        assert_eq!(app.class_info.flow.query(), "Main");

        // Back from the fresh form leaves the app
        press(&mut app, KeyCode::Esc).await;
        assert!(app.should_quit);
    }

    #[tokio::test]
    async fn test_form_stays_live_while_registering() {
        let api = Arc::new(EchoApi::default());
        let mut app = test_app(api.clone(), Some("Main Elementary School"));

        app.apply_action(ScreenAction::Submit);

        // Nothing applied yet: the form is still up and shows the pending request
        assert_eq!(app.class_info.flow.state(), FlowState::Submitting);
        assert_eq!(app.status_message.as_deref(), Some("Registering class..."));
        assert_eq!(app.router.current, Screen::ClassInfo);

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Our Class Info - Registering..."));
        assert!(text.contains("Status: Registering class..."));

        // Keys are still handled while the request is out
        press(&mut app, KeyCode::F(1)).await;
        assert!(app.show_help_popup);
        press(&mut app, KeyCode::Esc).await;

        drain_events(&mut app, 1).await;
        assert_eq!(app.class_info.flow.state(), FlowState::Submitted);
        assert_eq!(app.router.current, Screen::Registered);
        assert_eq!(app.status_message.as_deref(), Some("Registered Main Elementary School"));
        assert_eq!(api.submissions.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_late_search_from_previous_form_is_ignored() {
        let api = Arc::new(EchoApi::default());
        let mut app = test_app(api, None);

        // First form: search "A" and register while that search is still out
        type_text(&mut app, "A").await;
        app.apply_action(ScreenAction::Submit);

        let mut late_search = None;
        for _ in 0..2 {
            match app.events_rx.recv().await.unwrap() {
                event @ AppEvent::SearchFinished { .. } => late_search = Some(event),
                event => app.handle_app_event(event),
            }
        }
        assert_eq!(app.router.current, Screen::Registered);

        // Second form: its first search reuses sequence number 1
        press(&mut app, KeyCode::Char('n')).await;
        type_text(&mut app, "B").await;

        app.handle_app_event(late_search.unwrap());
        assert_eq!(app.class_info.flow.query(), "B");
        assert!(app.class_info.flow.suggestions().is_empty());

        drain_events(&mut app, 1).await;
        assert_eq!(app.class_info.flow.suggestions(), &["B Elementary School"]);
    }

    #[tokio::test]
    async fn test_help_popup_swallows_keys() {
        let api = Arc::new(EchoApi::default());
        let mut app = test_app(api, None);

        press(&mut app, KeyCode::F(1)).await;
        assert!(app.show_help_popup);
        press(&mut app, KeyCode::Char('x')).await;
        assert_eq!(app.class_info.flow.query(), "");

        let mut terminal = Terminal::new(TestBackend::new(100, 40)).unwrap();
        terminal.draw(|f| app.draw(f)).unwrap();
        let text: String = terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol())
            .collect();
        assert!(text.contains("Help - Context Shortcuts"));

        press(&mut app, KeyCode::Esc).await;
        assert!(!app.show_help_popup);
        assert!(!app.should_quit);
    }
}
