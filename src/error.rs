//! Error types for the bar coordinator.

use thiserror::Error;

/// Things that can go wrong while coordinating bars.
///
/// [`Error::CallAfterStop`] and [`Error::ZeroRefreshRate`] are contract
/// violations: the public API panics with their message instead of returning
/// them. The others are runtime faults which are logged and survived.
#[derive(Error, Debug)]
pub enum Error {
    #[error("method call on stopped Progress instance")]
    CallAfterStop,

    #[error("refresh rate must be greater than zero")]
    ZeroRefreshRate,

    #[error("bar #{index} panicked while rendering: {message}")]
    RenderPanic { index: usize, message: String },

    #[error("failed to write to output: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Describe a panic payload caught from a render task.
    pub(crate) fn render_panic(index: usize, payload: Box<dyn std::any::Any + Send>) -> Error {
        let message = match payload.downcast::<&'static str>() {
            Ok(s) => (*s).to_string(),
            Err(payload) => match payload.downcast::<String>() {
                Ok(s) => *s,
                Err(_) => "unknown panic payload".to_string(),
            },
        };

        Error::RenderPanic { index, message }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn panic_payloads() {
        let e = Error::render_panic(2, Box::new("boom"));
        assert_eq!(e.to_string(), "bar #2 panicked while rendering: boom");

        let e = Error::render_panic(0, Box::new(format!("bad {}", 7)));
        assert_eq!(e.to_string(), "bar #0 panicked while rendering: bad 7");

        let e = Error::render_panic(1, Box::new(42_u8));
        assert!(e.to_string().ends_with("unknown panic payload"));
    }
}
