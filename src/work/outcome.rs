//! Result of one invocation of a [`Work`](crate::Work).

use std::fmt;

/// Success, or failure with a diagnostic that travels to the timer's events.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure(String),
}

impl Outcome {
    /// Builds a failure from any displayable diagnostic.
    pub fn failure(diagnostic: impl fmt::Display) -> Self {
        Outcome::Failure(diagnostic.to_string())
    }

    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    /// Failure diagnostic, if any.
    pub fn diagnostic(&self) -> Option<&str> {
        match self {
            Outcome::Success => None,
            Outcome::Failure(d) => Some(d),
        }
    }
}

impl<E: fmt::Display> From<Result<(), E>> for Outcome {
    fn from(res: Result<(), E>) -> Self {
        match res {
            Ok(()) => Outcome::Success,
            Err(e) => Outcome::failure(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_conversion_keeps_diagnostic() {
        let ok: Outcome = Ok::<(), String>(()).into();
        assert!(ok.is_success());

        let err: Outcome = Err::<(), _>("broker gone").into();
        assert_eq!(err.diagnostic(), Some("broker gone"));
    }
}
