//! `bindtextdomain` redirection to the bundled locale directory.

use std::ffi::{CStr, CString, c_char};
use std::sync::OnceLock;

use anylinux_env::{EnvStore, ProcessEnv, TEXTDOMAINDIR_VAR};

use crate::resolver::NextSymbol;

pub type BindTextDomainFn = unsafe extern "C" fn(*const c_char, *const c_char) -> *mut c_char;

static NEXT_BINDTEXTDOMAIN: NextSymbol<BindTextDomainFn> = NextSymbol::new(c"bindtextdomain");

/// `TEXTDOMAINDIR` as it was when the library initialized.
static OVERRIDE_DIR: OnceLock<Option<CString>> = OnceLock::new();

/// System catalog directory that gets redirected.
pub const SYSTEM_LOCALE_DIR: &[u8] = b"/usr/share/locale";

/// Bundlers rewrite hard-coded `/usr/share` paths to mounts under `/tmp`.
pub const TEMP_PREFIX: &[u8] = b"/tmp";

/// Record the override directory from `store`. Only the first call counts.
pub fn capture_override(store: &impl EnvStore) {
    OVERRIDE_DIR.get_or_init(|| read_override(store));
}

fn read_override(store: &impl EnvStore) -> Option<CString> {
    use std::os::unix::ffi::OsStringExt;

    let dir = store.get(TEXTDOMAINDIR_VAR).filter(|v| !v.is_empty())?;
    CString::new(dir.into_vec()).ok()
}

fn override_dir() -> Option<&'static CStr> {
    OVERRIDE_DIR
        .get_or_init(|| read_override(&ProcessEnv))
        .as_deref()
}

/// Pick the directory to bind: `override_dir` replaces the system catalog
/// directory and anything under `/tmp`; every other directory is kept.
pub fn redirect<'a>(dirname: &'a CStr, override_dir: Option<&'a CStr>) -> &'a CStr {
    let Some(replacement) = override_dir.filter(|d| !d.is_empty()) else {
        return dirname;
    };

    let dir = dirname.to_bytes();
    if dir == SYSTEM_LOCALE_DIR {
        tracing::debug!(
            "Overriding bindtextdomain call to {} -> {}",
            dirname.to_string_lossy(),
            replacement.to_string_lossy()
        );
        replacement
    } else if dir.starts_with(TEMP_PREFIX) {
        tracing::debug!(
            "Overriding bindtextdomain call to ({}) -> {}",
            dirname.to_string_lossy(),
            replacement.to_string_lossy()
        );
        replacement
    } else {
        dirname
    }
}

/// Forward to the real `bindtextdomain` with the redirected directory.
///
/// # Safety
/// Same contract as `bindtextdomain(3)`.
pub unsafe fn bind(domain: *const c_char, dirname: *const c_char) -> *mut c_char {
    let real = match NEXT_BINDTEXTDOMAIN.get() {
        Ok(f) => f,
        Err(e) => {
            tracing::debug!("{}", e);
            return std::ptr::null_mut();
        }
    };

    let dir = if dirname.is_null() {
        dirname
    } else {
        // SAFETY: non-null and NUL-terminated per the caller's contract.
        redirect(unsafe { CStr::from_ptr(dirname) }, override_dir()).as_ptr()
    };
    // SAFETY: `dir` is the caller's string or the process-lifetime override.
    unsafe { real(domain, dir) }
}

#[cfg(not(test))]
mod exports {
    use std::ffi::c_char;

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn bindtextdomain(
        domainname: *const c_char,
        dirname: *const c_char,
    ) -> *mut c_char {
        crate::initialize();
        // SAFETY: arguments come straight from the C caller.
        unsafe { super::bind(domainname, dirname) }
    }
}
