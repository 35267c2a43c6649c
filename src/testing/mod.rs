use std::sync::Mutex;

use crate::http::hooks::{Navigator, Notice, Notifier};

/// Test navigator that remembers every redirect
#[derive(Default)]
pub struct RecordingNavigator {
    visits: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn visits(&self) -> Vec<String> {
        self.visits.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, path: &str) {
        self.visits.lock().unwrap().push(path.to_string());
    }
}

/// Test notifier that remembers every notice
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorders_keep_order() {
        let navigator = RecordingNavigator::default();
        navigator.navigate("/login");
        navigator.navigate("/dashboard");
        assert_eq!(navigator.visits(), vec!["/login", "/dashboard"]);

        let notifier = RecordingNotifier::default();
        notifier.notify(Notice::error("Invalid credentials"));
        assert_eq!(notifier.notices()[0].message, "Invalid credentials");
    }
}
