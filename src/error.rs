use thiserror::Error;

/// The generic Error type, which provides coverage for all errors this library can potentially
/// return.
///
/// Every failure in this crate is deterministic: the same call against the same state produces
/// the same error, so nothing here is retried internally. Each variant identifies one failure
/// mode and carries enough context to point at the misbehaving call site.
///
/// # Error Categories
///
/// ## Interception Errors
/// - [`Error::ProtocolViolation`] - Misuse of the direct-call gate (double mark, mismatched consume)
/// - [`Error::NoShadowBound`] - A dispatched call reached a class without a registered substitute
/// - [`Error::DispatchFailure`] - A substitute failed while being resolved or invoked
/// - [`Error::NoConstructor`] - No constructor registered for the requested parameter list
///
/// ## Configuration Errors
/// - [`Error::UnknownQualifier`] - A qualifier token could not be parsed
/// - [`Error::ResourceNotFound`] - No resource variant matches the effective configuration
///
/// ## Environment Errors
/// - [`Error::InvalidState`] - An environment operation was called in the wrong lifecycle phase
/// - [`Error::FileError`] - Storage directory creation failed
/// - [`Error::LockError`] - Thread synchronization failure
///
/// # Examples
///
/// ```rust
/// use shadowhost::{Error, config::QualifierResolver, config::Configuration};
///
/// let resolver = QualifierResolver::new(28);
/// match resolver.resolve(&Configuration::default(), "w100dp-bogus") {
///     Err(Error::UnknownQualifier { token, .. }) => assert_eq!(token, "bogus"),
///     other => panic!("unexpected: {other:?}"),
/// }
/// ```
#[derive(Error, Debug)]
pub enum Error {
    /// The direct-call gate was used incorrectly.
    ///
    /// Raised when a second direct call is requested while one is still pending on the same
    /// thread, or when the pending direct call is consumed by a dispatch on a different object.
    /// This always indicates a bug in the calling code.
    ///
    /// # Fields
    ///
    /// * `expected` - Description of the object the pending direct call was registered for
    /// * `actual` - Description of the object that was presented instead
    #[error("Direct call protocol violated - expected <{expected}> but got <{actual}>")]
    ProtocolViolation {
        /// The object the pending token was registered for
        expected: String,
        /// The object presented to the gate
        actual: String,
    },

    /// A dispatched call reached a class that has no substitute registered.
    ///
    /// # Fields
    ///
    /// * `class` - The class the call was dispatched against
    /// * `method` - The method being dispatched
    #[error("No shadow bound for {class}.{method}")]
    NoShadowBound {
        /// The dispatched class
        class: String,
        /// The dispatched method
        method: String,
    },

    /// A substitute failed while it was being resolved or invoked.
    ///
    /// The original cause is preserved and reachable through
    /// [`std::error::Error::source`].
    #[error("Dispatch of {class}.{method} failed")]
    DispatchFailure {
        /// The dispatched class
        class: String,
        /// The dispatched method
        method: String,
        /// The failure raised by the substitute
        #[source]
        source: Box<Error>,
    },

    /// No constructor is registered for a class and parameter list.
    #[error("No constructor for {class}({params})")]
    NoConstructor {
        /// The class being constructed
        class: String,
        /// Comma separated parameter descriptors
        params: String,
    },

    /// A qualifier token could not be parsed.
    ///
    /// The resolve operation that encountered this token has no effect; the previously
    /// active configuration stays in place.
    #[error("Unknown qualifier '{token}': {reason}")]
    UnknownQualifier {
        /// The offending token
        token: String,
        /// Why the token was rejected
        reason: &'static str,
    },

    /// A resource has no variant matching the current effective configuration.
    #[error("Resource @{kind}/{name} not found for qualifiers '{qualifiers}'")]
    ResourceNotFound {
        /// Resource type, e.g. `string`
        kind: String,
        /// Resource name
        name: String,
        /// The effective qualifiers the lookup ran against
        qualifiers: String,
    },

    /// An environment operation was called in the wrong lifecycle phase.
    #[error("{0}")]
    InvalidState(String),

    /// File I/O error.
    ///
    /// Wraps errors raised while creating the application storage directories.
    #[error("{0}")]
    FileError(#[from] std::io::Error),

    /// Failed to lock target.
    #[error("Failed to lock target")]
    LockError,
}

impl Error {
    /// Wraps `self` as the cause of a [`Error::DispatchFailure`].
    ///
    /// Gate misuse and missing bindings are reported as-is, since they describe the dispatch
    /// itself rather than a failure inside the substitute.
    pub(crate) fn into_dispatch_failure(self, class: &str, method: &str) -> Self {
        match self {
            Error::ProtocolViolation { .. } | Error::NoShadowBound { .. } => self,
            other => Error::DispatchFailure {
                class: class.to_string(),
                method: method.to_string(),
                source: Box::new(other),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_dispatch_failure_keeps_cause() {
        let cause = Error::InvalidState("boom".to_string());
        let wrapped = cause.into_dispatch_failure("android.view.View", "invalidate");

        assert!(matches!(wrapped, Error::DispatchFailure { .. }));
        let source = wrapped.source().unwrap();
        assert_eq!(source.to_string(), "boom");
    }

    #[test]
    fn test_protocol_violation_is_not_wrapped() {
        let err = Error::ProtocolViolation {
            expected: "a".to_string(),
            actual: "b".to_string(),
        };
        let wrapped = err.into_dispatch_failure("C", "m");
        assert!(matches!(wrapped, Error::ProtocolViolation { .. }));
    }
}
