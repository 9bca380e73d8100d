#![forbid(unsafe_code)]

//! Call-scoped diagnostics latch.
//!
//! Each decrypt call owns one [`Diagnostics`]; low-level failures are
//! recorded as they happen and the most recent one becomes the detail of
//! the final [`DecryptError`](crate::DecryptError).

use std::fmt::Display;

#[derive(Debug, Default)]
pub struct Diagnostics {
    last: Option<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Forget anything recorded so far.
    pub fn reset(&mut self) {
        self.last = None;
    }

    /// Record a low-level failure. Later records replace earlier ones.
    pub fn record(&mut self, detail: impl Display) {
        let detail = detail.to_string();
        tracing::debug!(diagnostic = %detail, "recorded diagnostic");
        self.last = Some(detail);
    }

    pub fn last(&self) -> Option<&str> {
        self.last.as_deref()
    }

    /// Take the recorded detail, leaving the latch empty.
    pub fn take(&mut self) -> Option<String> {
        self.last.take()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_last_record_wins() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.last(), None);
        diag.record("first");
        diag.record(format_args!("second {}", 2));
        assert_eq!(diag.last(), Some("second 2"));
    }

    #[test]
    fn test_take_and_reset() {
        let mut diag = Diagnostics::new();
        diag.record("boom");
        assert_eq!(diag.take().as_deref(), Some("boom"));
        assert_eq!(diag.last(), None);

        diag.record("again");
        diag.reset();
        assert_eq!(diag.take(), None);
    }
}
