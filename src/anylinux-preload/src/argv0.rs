//! `argv[0]` override at load time.
//!
//! glibc passes `(argc, argv, envp)` to `.init_array` entries of shared
//! objects, which lets the library rewrite the host's `argv[0]` before
//! `main` runs.

use std::borrow::Cow;
use std::ffi::{CStr, c_char, c_int};

/// Point `argv[0]` at the value of `OVERRIDE_ARGV0` and remove the variable
/// so children do not inherit it. Returns whether `argv[0]` changed.
///
/// # Safety
/// `argv` must be null or point to at least `argc` writable slots. Must not
/// race with other environment access.
pub(crate) unsafe fn override_argv0(argc: c_int, argv: *mut *mut c_char) -> bool {
    if argv.is_null() || argc < 1 {
        return false;
    }

    // SAFETY: the name is NUL-terminated.
    let value = unsafe { libc::getenv(c"OVERRIDE_ARGV0".as_ptr()) };
    // SAFETY: getenv returns null or a NUL-terminated string.
    if value.is_null() || unsafe { *value } == 0 {
        return false;
    }

    // SAFETY: `argc >= 1`, so slot 0 exists.
    let old = unsafe { *argv };
    let old_display = if old.is_null() {
        Cow::Borrowed("(null)")
    } else {
        // SAFETY: argv entries are NUL-terminated.
        unsafe { CStr::from_ptr(old) }.to_string_lossy()
    };
    tracing::debug!(
        "Overriding argv[0] from '{}' to '{}'",
        old_display,
        // SAFETY: checked non-null above.
        unsafe { CStr::from_ptr(value) }.to_string_lossy()
    );

    // The string stays owned by the environment block; unsetenv only drops
    // the pointer from `environ`, so `argv[0]` remains valid.
    // SAFETY: slot 0 is writable per the caller's contract.
    unsafe { *argv = value };
    // SAFETY: the name is NUL-terminated.
    unsafe { libc::unsetenv(c"OVERRIDE_ARGV0".as_ptr()) };
    true
}

#[cfg(all(not(test), target_env = "gnu"))]
mod hook {
    use std::ffi::{c_char, c_int};

    extern "C" fn on_load(argc: c_int, argv: *mut *mut c_char, _envp: *mut *mut c_char) {
        crate::initialize();
        // SAFETY: the loader passes the process's own argument vector.
        unsafe { super::override_argv0(argc, argv) };
    }

    #[used]
    #[unsafe(link_section = ".init_array")]
    static ARGV0_HOOK: extern "C" fn(c_int, *mut *mut c_char, *mut *mut c_char) = on_load;
}
