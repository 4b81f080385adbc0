//! Result type for best-effort calls to external collaborators.
//!
//! The launcher treats most external failures the same way it treats an
//! expected absence, but keeps the two apart so failures can be logged.

use tracing::warn;

/// Outcome of a call to an executable or remote endpoint.
#[derive(Debug)]
pub enum Outcome<T> {
    /// The call produced a value.
    Ready(T),
    /// Nothing there: executable missing, 404, no matching file.
    Unavailable,
    /// Something unexpected went wrong.
    Failed(anyhow::Error),
}

impl<T> Outcome<T> {
    /// Whether the call produced a value.
    pub fn is_ready(&self) -> bool {
        matches!(self, Outcome::Ready(_))
    }

    /// Discard the failure detail.
    pub fn into_option(self) -> Option<T> {
        match self {
            Outcome::Ready(value) => Some(value),
            Outcome::Unavailable | Outcome::Failed(_) => None,
        }
    }

    /// Map the ready value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Outcome::Ready(value) => Outcome::Ready(f(value)),
            Outcome::Unavailable => Outcome::Unavailable,
            Outcome::Failed(err) => Outcome::Failed(err),
        }
    }

    /// Emit a warning for `Failed`, then pass the outcome through unchanged.
    pub fn log_failure(self, context: &str) -> Self {
        if let Outcome::Failed(err) = &self {
            warn!(?err, "{context}");
        }
        self
    }
}

impl<T: Default> Outcome<T> {
    /// The ready value, or `T::default()` for both kinds of miss.
    pub fn unwrap_or_default(self) -> T {
        self.into_option().unwrap_or_default()
    }
}

impl<T> From<anyhow::Result<Option<T>>> for Outcome<T> {
    fn from(result: anyhow::Result<Option<T>>) -> Self {
        match result {
            Ok(Some(value)) => Outcome::Ready(value),
            Ok(None) => Outcome::Unavailable,
            Err(err) => Outcome::Failed(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn misses_collapse_to_default() {
        let unavailable: Outcome<Vec<u8>> = Outcome::Unavailable;
        assert!(unavailable.unwrap_or_default().is_empty());

        let failed: Outcome<Vec<u8>> = Outcome::Failed(anyhow::anyhow!("boom"));
        assert!(!failed.is_ready());
        assert!(failed.into_option().is_none());
    }

    #[test]
    fn converts_from_result_option() {
        let ready: Outcome<u8> = Ok(Some(3)).into();
        assert_eq!(ready.map(|v| v * 2).into_option(), Some(6));

        let missing: Outcome<u8> = Ok(None).into();
        assert!(matches!(missing, Outcome::Unavailable));

        let failed: Outcome<u8> = Err(anyhow::anyhow!("nope")).into();
        assert!(matches!(failed, Outcome::Failed(_)));
    }
}
