//! Thread-local `errno` access.

use std::ffi::c_int;

pub(crate) fn get() -> c_int {
    std::io::Error::last_os_error().raw_os_error().unwrap_or(0)
}

pub(crate) fn set(value: c_int) {
    // SAFETY: __errno_location always returns a valid pointer to this
    // thread's errno.
    unsafe {
        *libc::__errno_location() = value;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get() {
        set(libc::ENOSYS);
        assert_eq!(get(), libc::ENOSYS);
        set(0);
        assert_eq!(get(), 0);
    }
}
