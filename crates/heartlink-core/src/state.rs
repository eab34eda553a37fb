//! User-visible session state.

use serde::Serialize;

/// Status text shown before the first connection and after a failure.
pub const DISCONNECTED_STATUS: &str = "Disconnected";

/// What the user sees: an error alert, a status line and the polling toggle.
///
/// The error flag and message travel together: the flag is set exactly when
/// there is a message to show.
///
/// ```
/// use heartlink_core::UiState;
///
/// let mut state = UiState::default();
/// assert_eq!(state.status(), "Disconnected");
///
/// state.fail("User cancelled the requestDevice() chooser.");
/// assert!(state.has_error());
///
/// state.clear_error();
/// assert_eq!(state.error_message(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UiState {
    error: bool,
    error_message: String,
    status: String,
    polling: bool,
}

impl Default for UiState {
    fn default() -> Self {
        Self {
            error: false,
            error_message: String::new(),
            status: DISCONNECTED_STATUS.to_string(),
            polling: false,
        }
    }
}

impl UiState {
    /// Raise the error alert with `message`.
    pub fn fail(&mut self, message: impl Into<String>) {
        self.error = true;
        self.error_message = message.into();
    }

    /// Dismiss the error alert.
    pub fn clear_error(&mut self) {
        self.error = false;
        self.error_message.clear();
    }

    /// Replace the status line.
    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = status.into();
    }

    /// Turn the polling indicator on or off.
    pub fn set_polling(&mut self, polling: bool) {
        self.polling = polling;
    }

    pub fn has_error(&self) -> bool {
        self.error
    }

    /// The error message, when the alert is raised.
    pub fn error_message(&self) -> Option<&str> {
        self.error.then_some(self.error_message.as_str())
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn is_polling(&self) -> bool {
        self.polling
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = UiState::default();
        assert!(!state.has_error());
        assert_eq!(state.error_message(), None);
        assert_eq!(state.status(), DISCONNECTED_STATUS);
        assert!(!state.is_polling());
    }

    #[test]
    fn test_fail_then_clear() {
        let mut state = UiState::default();
        state.fail("GATT operation failed");
        assert!(state.has_error());
        assert_eq!(state.error_message(), Some("GATT operation failed"));

        state.clear_error();
        assert!(!state.has_error());
        assert_eq!(state.error_message(), None);
    }

    #[test]
    fn test_fail_replaces_previous_message() {
        let mut state = UiState::default();
        state.fail("first");
        state.fail("second");
        assert_eq!(state.error_message(), Some("second"));
    }

    #[test]
    fn test_status_and_polling_are_independent_of_error() {
        let mut state = UiState::default();
        state.set_status("Connecting...");
        state.set_polling(true);
        state.fail("boom");
        assert_eq!(state.status(), "Connecting...");
        assert!(state.is_polling());
    }

    #[test]
    fn test_serializes_for_json_output() {
        let mut state = UiState::default();
        state.set_status("Heart Rate Control Point: 72");
        let json = serde_json::to_string(&state).unwrap();
        assert!(json.contains("\"status\":\"Heart Rate Control Point: 72\""));
        assert!(json.contains("\"polling\":false"));
    }
}
