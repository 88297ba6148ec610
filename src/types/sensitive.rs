// ABOUTME: Wrapper for secret values that must never reach logs.
// ABOUTME: Debug and Display render a redaction marker instead of the value.

/// A value that is redacted in all formatted output.
///
/// Access to the wrapped value requires an explicit `expose()` call,
/// which keeps accidental `{}`/`{:?}` interpolation from leaking
/// database endpoints or API keys into progress lines and traces.
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// Deliberate access to the wrapped value.
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: Clone> Clone for Sensitive<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> std::fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}

impl<T> std::fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("[redacted]")
    }
}
