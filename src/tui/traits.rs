//! Actions screens hand back to the application loop

use crate::flow::SearchTicket;
use crate::tui::app::Screen;

/// What the app should do after a screen handled a key
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenAction {
    /// Navigate to a different screen
    NavigateTo(Screen),
    /// Go back to previous screen
    NavigateBack,
    /// Quit the application
    Quit,
    /// Issue a school search in the background
    Search(SearchTicket),
    /// Submit the class info form
    Submit,
    /// No action taken
    None,
}
