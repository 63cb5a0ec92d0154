//! Panic guard macros for the C boundary.
//!
//! Every `extern "C"` function catches panics so unwinding never crosses
//! into the host.

/// Wrap an FFI function body that returns [`PatcherStatus`](super::PatcherStatus).
///
/// On panic the macro returns `PatcherStatus::Internal`.
///
/// # Example
///
/// ```ignore
/// extern "C" fn patcher_f32_object_initialize(object: *mut PatcherObject<f32>) -> PatcherStatus {
///     ffi_guard! {
///         // ... body ...
///         PatcherStatus::Ok
///     }
/// }
/// ```
macro_rules! ffi_guard {
    ($($body:tt)*) => {{
        use std::panic;
        use std::panic::AssertUnwindSafe;

        match panic::catch_unwind(AssertUnwindSafe(move || { $($body)* })) {
            Ok(result) => result,
            Err(_) => $crate::ffi::PatcherStatus::Internal,
        }
    }};
}

/// Wrap an FFI function body that returns a pointer.
///
/// On panic the macro returns [`std::ptr::null_mut()`].
macro_rules! ffi_guard_ptr {
    ($($body:tt)*) => {{
        use std::panic;
        use std::panic::AssertUnwindSafe;
        use std::ptr;

        match panic::catch_unwind(AssertUnwindSafe(move || { $($body)* })) {
            Ok(result) => result,
            Err(_) => ptr::null_mut(),
        }
    }};
}

/// Wrap an FFI function body that returns a plain value.
///
/// On panic the macro returns `$fallback`.
macro_rules! ffi_guard_or {
    ($fallback:expr; $($body:tt)*) => {{
        use std::panic;
        use std::panic::AssertUnwindSafe;

        match panic::catch_unwind(AssertUnwindSafe(move || { $($body)* })) {
            Ok(result) => result,
            Err(_) => $fallback,
        }
    }};
}

pub(crate) use ffi_guard;
pub(crate) use ffi_guard_or;
pub(crate) use ffi_guard_ptr;
