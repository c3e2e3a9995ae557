//! Internal helper macros.

/// Returns early with `Err($error)` when `$predicate` does not hold.
///
/// Used where a capacity or protocol check fails and the caller should
/// receive a typed error instead of a panic.
///
/// ```ignore
/// ensure!(self.len() < self.max, CapacityError::too_many_headers(self.max));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;
