//! Class info entry view-model
//!
//! [`ClassInfoEntryFlow`] owns every field of the "our class" form and exposes
//! its behavior as plain state transitions. Remote calls are split in two: a
//! transition that decides whether a call is needed (and returns what to send),
//! and a transition that applies the call's result. The async helpers glue the
//! two halves together for callers that can simply await.

use tracing::{debug, info, warn};

use crate::api::ClassroomApi;
use crate::errors::{ApiError, RequiredField, SubmitError, ValidationError};
use crate::models::{strip_school_suffix, ClassInfoPayload, ClassroomReceipt, Grade};

pub const REGISTRATION_FAILED_TITLE: &str = "registration failed";

/// Where the flow is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    Idle,
    Searching,
    ShowingSuggestions,
    Submitting,
    Submitted,
}

/// Blocking message shown to the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub title: String,
    pub message: String,
    /// Whether pressing confirm again may succeed without editing the form
    pub retryable: bool,
}

impl Alert {
    pub fn validation(error: &ValidationError) -> Self {
        Self {
            title: REGISTRATION_FAILED_TITLE.to_string(),
            message: error.to_string(),
            retryable: false,
        }
    }

    pub fn submission(error: &ApiError) -> Self {
        Self {
            title: REGISTRATION_FAILED_TITLE.to_string(),
            message: format!("could not reach the server, please try again ({})", error),
            retryable: true,
        }
    }
}

/// A search the caller must issue on behalf of the flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTicket {
    pub seq: u64,
    pub query: String,
}

/// Navigation handle the flow advances after a successful submission
pub trait Navigator {
    fn forward(&mut self, payload: &ClassInfoPayload, receipt: &ClassroomReceipt);
}

#[derive(Debug, Clone)]
pub struct ClassInfoEntryFlow {
    suffix: String,
    preselected_school: Option<String>,
    query: String,
    suggestions: Vec<String>,
    show_suggestions: bool,
    grade: Option<Grade>,
    class_number: String,
    input_focused: bool,
    latest_search: u64,
    state: FlowState,
    alert: Option<Alert>,
    pending: Option<ClassInfoPayload>,
}

impl ClassInfoEntryFlow {
    pub fn new(suffix: &str) -> Self {
        Self {
            suffix: suffix.to_string(),
            preselected_school: None,
            query: String::new(),
            suggestions: Vec::new(),
            show_suggestions: false,
            grade: Some(Grade::default()),
            class_number: "1".to_string(),
            input_focused: false,
            latest_search: 0,
            state: FlowState::Idle,
            alert: None,
            pending: None,
        }
    }

    /// Build the flow for a screen mount. A school chosen on an earlier screen
    /// pre-fills the query and turns the school field read-only.
    pub fn initialize(preselected_school: Option<&str>, suffix: &str) -> Self {
        let mut flow = Self::new(suffix);
        if let Some(name) = preselected_school.filter(|name| !name.is_empty()) {
            flow.query = strip_school_suffix(name, suffix).to_string();
            flow.preselected_school = Some(name.to_string());
            debug!("Class info form opened for pre-selected school '{}'", name);
        }
        flow
    }

    pub fn suffix(&self) -> &str {
        &self.suffix
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn suggestions(&self) -> &[String] {
        &self.suggestions
    }

    pub fn suggestions_visible(&self) -> bool {
        self.show_suggestions
    }

    pub fn grade(&self) -> Option<Grade> {
        self.grade
    }

    pub fn class_number(&self) -> &str {
        &self.class_number
    }

    pub fn state(&self) -> FlowState {
        self.state
    }

    pub fn alert(&self) -> Option<&Alert> {
        self.alert.as_ref()
    }

    pub fn preselected_school(&self) -> Option<&str> {
        self.preselected_school.as_deref()
    }

    /// False when the school came pre-selected and is shown read-only
    pub fn is_search_enabled(&self) -> bool {
        self.preselected_school.is_none()
    }

    /// Whether the school text input currently holds focus
    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn set_input_focus(&mut self, focused: bool) {
        self.input_focused = focused && self.is_search_enabled();
    }

    /// Record new query text. Returns the search to issue, if any.
    ///
    /// Every call supersedes all earlier searches, so a response that arrives
    /// after the text changed again is discarded by `apply_search_result`.
    pub fn on_query_changed(&mut self, text: &str) -> Option<SearchTicket> {
        if !self.is_search_enabled() {
            debug!("Ignoring query change while the school is pre-selected");
            return None;
        }

        self.query = text.to_string();
        self.input_focused = true;
        self.latest_search += 1;

        if text.trim().is_empty() {
            self.clear_suggestions();
            self.state = FlowState::Idle;
            return None;
        }

        self.state = FlowState::Searching;
        Some(SearchTicket {
            seq: self.latest_search,
            query: text.to_string(),
        })
    }

    /// Apply the response of search `seq`. Returns false when it was stale.
    pub fn apply_search_result(&mut self, seq: u64, result: Result<Vec<String>, ApiError>) -> bool {
        if seq != self.latest_search {
            debug!(
                "Discarding stale school search #{} (latest is #{})",
                seq, self.latest_search
            );
            return false;
        }

        match result {
            Ok(names) if !names.is_empty() => {
                self.suggestions = names;
                self.show_suggestions = true;
                self.state = FlowState::ShowingSuggestions;
            }
            Ok(_) => {
                self.clear_suggestions();
                self.state = FlowState::Idle;
            }
            Err(e) => {
                warn!("School search for '{}' failed: {}", self.query, e);
                self.clear_suggestions();
                self.state = FlowState::Idle;
            }
        }
        true
    }

    /// Run one keystroke's worth of searching against `api`
    pub async fn search(&mut self, api: &dyn ClassroomApi, text: &str) {
        if let Some(ticket) = self.on_query_changed(text) {
            let result = api.search_schools(&ticket.query).await;
            self.apply_search_result(ticket.seq, result);
        }
    }

    /// Adopt a suggestion as the query, close the list and drop input focus.
    pub fn on_suggestion_selected(&mut self, school: &str) {
        self.query = strip_school_suffix(school, &self.suffix).to_string();
        self.clear_suggestions();
        self.input_focused = false;
        // A search still in flight must not reopen the list
        self.latest_search += 1;
        self.state = FlowState::Idle;
        debug!("Selected school '{}'", school);
    }

    pub fn select_suggestion(&mut self, index: usize) -> Option<String> {
        let school = self.suggestions.get(index).cloned()?;
        self.on_suggestion_selected(&school);
        Some(school)
    }

    /// Close the suggestion list without choosing anything
    pub fn hide_suggestions(&mut self) {
        self.show_suggestions = false;
        if self.state == FlowState::ShowingSuggestions {
            self.state = FlowState::Idle;
        }
    }

    fn clear_suggestions(&mut self) {
        self.suggestions.clear();
        self.show_suggestions = false;
    }

    pub fn set_grade(&mut self, grade: Option<Grade>) {
        self.grade = grade;
    }

    pub fn set_class_number(&mut self, text: &str) {
        self.class_number = text.to_string();
    }

    pub fn dismiss_alert(&mut self) {
        self.alert = None;
    }

    /// Validate the form and build the payload to send.
    pub fn on_submit(&mut self) -> Result<ClassInfoPayload, ValidationError> {
        let mut missing = Vec::new();
        if self.query.is_empty() {
            missing.push(RequiredField::School);
        }
        if self.grade.is_none() {
            missing.push(RequiredField::Grade);
        }
        if self.class_number.is_empty() {
            missing.push(RequiredField::ClassNumber);
        }

        let grade = match self.grade {
            Some(grade) if missing.is_empty() => grade,
            _ => {
                let error = ValidationError { missing };
                debug!("Class info rejected: {:?}", error.missing);
                self.alert = Some(Alert::validation(&error));
                self.pending = None;
                self.state = FlowState::Idle;
                return Err(error);
            }
        };

        let payload = ClassInfoPayload {
            school_name: format!("{}{}", self.query, self.suffix),
            grade,
            class_number: self.class_number.clone(),
        };

        self.alert = None;
        self.input_focused = false;
        self.pending = Some(payload.clone());
        self.state = FlowState::Submitting;
        Ok(payload)
    }

    /// Apply the submission response; on success advance `navigator`.
    pub fn apply_submit_result(
        &mut self,
        result: Result<ClassroomReceipt, ApiError>,
        navigator: &mut dyn Navigator,
    ) -> Result<(), SubmitError> {
        let payload = self.pending.take().ok_or(SubmitError::NothingPending)?;

        match result {
            Ok(receipt) => {
                info!("Registered {} ({}-{})", payload.school_name, payload.grade, payload.class_number);
                self.state = FlowState::Submitted;
                navigator.forward(&payload, &receipt);
                Ok(())
            }
            Err(e) => {
                warn!("Registering {} failed: {}", payload.school_name, e);
                self.alert = Some(Alert::submission(&e));
                self.state = FlowState::Idle;
                Err(SubmitError::Remote(e))
            }
        }
    }

    /// Validate, submit through `api`, and forward on success
    pub async fn submit(
        &mut self,
        api: &dyn ClassroomApi,
        navigator: &mut dyn Navigator,
    ) -> Result<(), SubmitError> {
        let payload = self.on_submit()?;
        let result = api.submit_class_info(&payload).await;
        self.apply_submit_result(result, navigator)
    }
}
