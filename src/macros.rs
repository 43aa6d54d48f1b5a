//! Call-site macros.
//!
//! Each logging macro evaluates to a future that must be awaited. `error!`
//! and `fatal!` attach the caller annotation with the enclosing function name.

/// Build a `Vec<Value>` from anything convertible into [`Value`](crate::Value).
///
/// ```
/// let body = xlog::values!["user", "bob", "attempts", 3];
/// assert_eq!(body.len(), 4);
/// ```
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        ::std::vec![$($crate::Value::from($value)),*]
    };
}

#[macro_export]
macro_rules! trace {
    ($($value:expr),* $(,)?) => {
        $crate::dispatcher().trace($crate::values![$($value),*])
    };
}

#[macro_export]
macro_rules! info {
    ($($value:expr),* $(,)?) => {
        $crate::dispatcher().info($crate::values![$($value),*])
    };
}

#[macro_export]
macro_rules! warn {
    ($($value:expr),* $(,)?) => {
        $crate::dispatcher().warn($crate::values![$($value),*])
    };
}

/// Log at ERROR with the caller annotation.
#[macro_export]
macro_rules! error {
    ($($value:expr),* $(,)?) => {
        $crate::dispatcher().dispatch(
            $crate::Message::new($crate::Level::Error, $crate::values![$($value),*]),
            ::std::option::Option::Some($crate::caller!()),
        )
    };
}

/// Log at FATAL with the caller annotation, shut down and exit.
#[macro_export]
macro_rules! fatal {
    ($($value:expr),* $(,)?) => {
        $crate::dispatcher().fatal_with_caller(
            ::std::option::Option::Some($crate::caller!()),
            $crate::values![$($value),*],
        )
    };
}
