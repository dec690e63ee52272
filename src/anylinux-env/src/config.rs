//! Runtime configuration read from the process environment.
//!
//! Nothing here is cached: every interposed call takes a fresh [`Settings`]
//! snapshot, since the host program may change any of these variables
//! between calls.

use std::collections::{BTreeMap, BTreeSet};
use std::ffi::{CString, OsStr, OsString};
use std::os::unix::ffi::OsStrExt;

use crate::bundle::BundleRoot;
use crate::error::{EnvError, EnvResult};

/// Bundle root; unset disables classification and sanitization.
pub const APPDIR_VAR: &str = "APPDIR";

/// Colon-separated glob patterns of libraries `dlopen` must refuse.
pub const DO_NOT_LOAD_LIBS_VAR: &str = "ANYLINUX_DO_NOT_LOAD_LIBS";

/// `"1"` enables diagnostic output on stderr.
pub const DEBUG_VAR: &str = "ANYLINUX_LIB_DEBUG";

/// Bundled locale directory used by the text-domain redirector.
pub const TEXTDOMAINDIR_VAR: &str = "TEXTDOMAINDIR";

/// Replacement for `argv[0]`, consumed at load time.
pub const OVERRIDE_ARGV0_VAR: &str = "OVERRIDE_ARGV0";

/// Read/write access to a set of environment variables.
pub trait EnvStore {
    /// Returns the value of `name`, if set.
    fn get(&self, name: &str) -> Option<OsString>;

    /// Sets `name` to `value`, overwriting any existing value.
    fn set(&mut self, name: &str, value: &OsStr) -> EnvResult<()>;
}

/// The live environment of the current process.
///
/// Writes go through `setenv(3)` so that a failure is reported as an error
/// rather than a panic.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvStore for ProcessEnv {
    fn get(&self, name: &str) -> Option<OsString> {
        std::env::var_os(name)
    }

    fn set(&mut self, name: &str, value: &OsStr) -> EnvResult<()> {
        if name.is_empty() || name.contains('=') {
            return Err(EnvError::InvalidName(name.to_string()));
        }
        let c_name = CString::new(name).map_err(|_| EnvError::InvalidName(name.to_string()))?;
        let c_value =
            CString::new(value.as_bytes()).map_err(|_| EnvError::InvalidValue(name.to_string()))?;

        // SAFETY: both pointers are valid NUL-terminated strings for the
        // duration of the call; setenv copies them.
        let ret = unsafe { libc::setenv(c_name.as_ptr(), c_value.as_ptr(), 1) };
        if ret != 0 {
            return Err(EnvError::SetVar {
                name: name.to_string(),
                source: std::io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

/// An in-memory environment.
///
/// Names listed with [`MemoryEnv::read_only`] reject writes, which lets
/// callers exercise restoration failures.
#[derive(Debug, Clone, Default)]
pub struct MemoryEnv {
    vars: BTreeMap<String, OsString>,
    read_only: BTreeSet<String>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a variable.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<OsString>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Mark a variable as impossible to write.
    pub fn read_only(mut self, name: impl Into<String>) -> Self {
        self.read_only.insert(name.into());
        self
    }

    /// Iterate over all variables in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OsStr)> {
        self.vars.iter().map(|(k, v)| (k.as_str(), v.as_os_str()))
    }
}

impl EnvStore for MemoryEnv {
    fn get(&self, name: &str) -> Option<OsString> {
        self.vars.get(name).cloned()
    }

    fn set(&mut self, name: &str, value: &OsStr) -> EnvResult<()> {
        if name.is_empty() || name.contains('=') || name.contains('\0') {
            return Err(EnvError::InvalidName(name.to_string()));
        }
        if value.as_bytes().contains(&0) {
            return Err(EnvError::InvalidValue(name.to_string()));
        }
        if self.read_only.contains(name) {
            return Err(EnvError::SetVar {
                name: name.to_string(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            });
        }
        self.vars.insert(name.to_string(), value.to_os_string());
        Ok(())
    }
}

/// Per-call snapshot of the interposer configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Bundle root from `APPDIR`, `None` when unset or empty.
    pub bundle_root: Option<BundleRoot>,
    /// Raw `ANYLINUX_DO_NOT_LOAD_LIBS` value, `None` when unset or empty.
    pub blocked_libraries: Option<String>,
    /// Whether `ANYLINUX_LIB_DEBUG` is exactly `"1"`.
    pub debug: bool,
}

impl Settings {
    /// Read the current configuration from `store`.
    pub fn load(store: &impl EnvStore) -> Self {
        let bundle_root = store.get(APPDIR_VAR).and_then(BundleRoot::new);
        let blocked_libraries = store
            .get(DO_NOT_LOAD_LIBS_VAR)
            .map(|v| v.to_string_lossy().into_owned())
            .filter(|v| !v.is_empty());

        Self {
            bundle_root,
            blocked_libraries,
            debug: debug_enabled(store),
        }
    }

    /// Read the current configuration from the process environment.
    pub fn from_env() -> Self {
        Self::load(&ProcessEnv)
    }
}

/// Check `ANYLINUX_LIB_DEBUG` without building a full snapshot.
pub fn debug_enabled(store: &impl EnvStore) -> bool {
    store.get(DEBUG_VAR).is_some_and(|v| v == "1")
}
