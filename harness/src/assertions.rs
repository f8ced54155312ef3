//! Assertion macros for test hooks.
//!
//! Each macro returns early from the enclosing function with an `Err`
//! carrying a [`TestFailure`](crate::runner::failure::TestFailure) located at
//! the call site, so the enclosing function must return a
//! [`TestResult`](crate::runner::failure::TestResult).

/// Fails unless the condition holds.
#[macro_export]
macro_rules! ensure {
    ($cond:expr $(,)?) => {
        $crate::ensure!($cond, "{}", concat!("`", stringify!($cond), "` is false"))
    };
    ($cond:expr, $($arg:tt)+) => {
        if !$cond {
            return Err($crate::runner::failure::TestFailure::new("ensure", format!($($arg)+))
                .at(file!(), line!())
                .into());
        }
    };
}

/// Fails unless both sides compare equal.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if !(*left == *right) {
                    return Err($crate::runner::failure::TestFailure::new(
                        "ensure_eq",
                        format!("{:?} not equal to {:?}", left, right),
                    )
                    .at(file!(), line!())
                    .into());
                }
            }
        }
    };
    ($left:expr, $right:expr, $($arg:tt)+) => {
        match (&$left, &$right) {
            (left, right) => {
                if !(*left == *right) {
                    return Err($crate::runner::failure::TestFailure::new(
                        "ensure_eq",
                        format!("{:?} not equal to {:?}: {}", left, right, format_args!($($arg)+)),
                    )
                    .at(file!(), line!())
                    .into());
                }
            }
        }
    };
}

/// Fails if both sides compare equal.
#[macro_export]
macro_rules! ensure_ne {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if *left == *right {
                    return Err($crate::runner::failure::TestFailure::new(
                        "ensure_ne",
                        format!("{:?} unexpectedly equal to {:?}", left, right),
                    )
                    .at(file!(), line!())
                    .into());
                }
            }
        }
    };
}

/// Fails unless two numbers are within `tolerance` of each other.
#[macro_export]
macro_rules! ensure_near {
    ($left:expr, $right:expr, $tolerance:expr $(,)?) => {{
        let left = ($left) as f64;
        let right = ($right) as f64;
        let tolerance = ($tolerance) as f64;
        if !((left - right).abs() <= tolerance) {
            return Err($crate::runner::failure::TestFailure::new(
                "ensure_near",
                format!("{} not within {} of {}", left, tolerance, right),
            )
            .at(file!(), line!())
            .into());
        }
    }};
}

/// Fails unconditionally.
#[macro_export]
macro_rules! fail {
    ($($arg:tt)+) => {
        return Err($crate::runner::failure::TestFailure::new("fail", format!($($arg)+))
            .at(file!(), line!())
            .into())
    };
}
