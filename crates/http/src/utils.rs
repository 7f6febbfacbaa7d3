//! Utility macros used internally by the codec.

/// Early-returns `Err($error)` when `$predicate` does not hold.
///
/// Like `assert!`, but for validation checks that should surface as an
/// error instead of a panic.
///
/// ```ignore
/// ensure!(headers.len() < MAX_HEADERS, ParseError::too_many_headers(MAX_HEADERS));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
