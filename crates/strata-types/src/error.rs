//! Shared error interface for strata crates.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so callers
//! can branch on a stable string instead of matching concrete types
//! across crate boundaries.
//!
//! # Example
//!
//! ```
//! use strata_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum LinkError {
//!     Missing(String),
//!     Tripped,
//! }
//!
//! impl ErrorCode for LinkError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Missing(_) => "LINK_MISSING",
//!             Self::Tripped => "LINK_TRIPPED",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Tripped)
//!     }
//! }
//!
//! let err = LinkError::Tripped;
//! assert_eq!(err.code(), "LINK_TRIPPED");
//! assert!(err.is_recoverable());
//! ```

/// Machine-readable error code interface.
///
/// # Code Format
///
/// | Rule | Example |
/// |------|---------|
/// | UPPER_SNAKE_CASE | `"COMPONENT_TERMINATED"` |
/// | Crate prefix | `IDENTITY_`, `COMPONENT_`, `COMPOSITE_`, `MACHINE_`, `CONFIG_` |
/// | Stable | renaming a code is a breaking change |
///
/// # Recoverability
///
/// An error is recoverable when waiting or retrying can change the
/// outcome: an open circuit breaker closes after its cool-down, a
/// partially activated composite can be activated again. Structural
/// mistakes (unknown children, self-connections, illegal lifecycle
/// edges) are not.
pub trait ErrorCode {
    /// Returns a stable UPPER_SNAKE_CASE error code.
    fn code(&self) -> &'static str;

    /// Returns whether a retry may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows the workspace conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE.
///
/// # Example
///
/// ```
/// use strata_types::{ErrorCode, assert_error_code};
///
/// #[derive(Debug)]
/// enum MyError { Tripped }
///
/// impl ErrorCode for MyError {
///     fn code(&self) -> &'static str { "MY_TRIPPED" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&MyError::Tripped, "MY_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");

    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );

    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every variant of an error enum at once.
///
/// ```
/// use strata_types::{ErrorCode, assert_error_codes};
///
/// #[derive(Debug)]
/// enum MyError { A, B }
///
/// impl ErrorCode for MyError {
///     fn code(&self) -> &'static str {
///         match self {
///             Self::A => "MY_A",
///             Self::B => "MY_B",
///         }
///     }
///     fn is_recoverable(&self) -> bool { false }
/// }
///
/// assert_error_codes(&[MyError::A, MyError::B], "MY_");
/// ```
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
