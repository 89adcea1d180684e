//! Single-slot announcement channel for an assistive-technology live region.

/// Holds the single most recent announcement. There is no queue: rapid
/// successive announcements only surface the last one.
#[derive(Debug, Default)]
pub struct Announcer {
    current: Option<String>,
}

impl Announcer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrites the current message.
    pub fn announce(&mut self, message: impl Into<String>) {
        self.current = Some(message.into());
    }

    /// The message the live region should currently display, if any.
    pub fn current(&self) -> Option<&str> {
        self.current.as_deref()
    }
}
