//! Process-launch interception.
//!
//! Every `exec*` call funnels into [`exec_common`], which:
//! 1. canonicalizes the target path (best effort)
//! 2. restores the user's real directories in the live environment
//! 3. classifies the target against the bundle root
//! 4. strips bundle search paths from the child environment when needed
//! 5. calls the real function
//!
//! Any environment copy made for the call is owned by the call and released
//! before returning, including when the real call fails.

use std::borrow::Cow;
use std::collections::TryReserveError;
use std::ffi::{CStr, OsStr, c_char, c_int};
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr;

use anylinux_env::{
    BundleRoot, EnvError, EnvStore, LaunchPolicy, Settings, launch_policy, restore_dirs, sanitize,
};

use crate::errno;
use crate::launcher::ProcessLauncher;
use crate::resolver::ResolveError;

unsafe extern "C" {
    static mut environ: *const *const c_char;
}

/// Environment argument of an exec call.
#[derive(Debug, Clone, Copy)]
pub enum ExecEnv {
    /// Array supplied by the caller.
    Explicit(*const *const c_char),
    /// The process environment, read after directory restoration so that
    /// restored values are visible and no stale array is used.
    Ambient,
}

impl ExecEnv {
    fn resolve(self) -> *const *const c_char {
        match self {
            ExecEnv::Explicit(envp) => envp,
            // SAFETY: plain read of the libc global; callers of exec already
            // accept that the environment must not change concurrently.
            ExecEnv::Ambient => unsafe { environ },
        }
    }
}

/// Environment block handed to the real call.
struct ChildEnv {
    original: *const *const c_char,
    /// Null-terminated copy, present only when entries were filtered.
    filtered: Option<Vec<*const c_char>>,
}

impl ChildEnv {
    fn inherit(original: *const *const c_char) -> Self {
        Self {
            original,
            filtered: None,
        }
    }

    fn as_ptr(&self) -> *const *const c_char {
        match &self.filtered {
            Some(block) => block.as_ptr(),
            None => self.original,
        }
    }
}

/// Borrow each entry of a null-terminated environment array.
///
/// # Safety
/// `envp` must be null or a null-terminated array of NUL-terminated strings
/// that outlive `'a`.
unsafe fn borrow_env_block<'a>(envp: *const *const c_char) -> Result<Vec<&'a CStr>, TryReserveError> {
    let mut entries = Vec::new();
    if envp.is_null() {
        return Ok(entries);
    }

    let mut count = 0;
    // SAFETY: the array is null-terminated per the caller's contract.
    while unsafe { !(*envp.add(count)).is_null() } {
        count += 1;
    }

    entries.try_reserve_exact(count)?;
    for i in 0..count {
        // SAFETY: `i < count`, so the slot holds a valid C string.
        entries.push(unsafe { CStr::from_ptr(*envp.add(i)) });
    }
    Ok(entries)
}

/// Builder of the sanitized block handed to the real call.
type EnvFilter = unsafe fn(
    *const *const c_char,
    Option<&BundleRoot>,
) -> Result<Option<Vec<*const c_char>>, EnvError>;

/// Build a filtered copy of `envp`, or `None` when nothing needs copying.
///
/// # Safety
/// Same contract as [`borrow_env_block`].
unsafe fn filtered_env_block(
    envp: *const *const c_char,
    root: Option<&BundleRoot>,
) -> Result<Option<Vec<*const c_char>>, EnvError> {
    // SAFETY: forwarded from the caller's contract.
    let entries = unsafe { borrow_env_block(envp) }?;

    match sanitize(entries.as_slice(), root)? {
        Cow::Borrowed(_) => Ok(None),
        Cow::Owned(kept) => {
            let mut block = Vec::new();
            block.try_reserve_exact(kept.len() + 1)?;
            block.extend(kept.iter().map(|entry| entry.as_ptr()));
            block.push(ptr::null());
            Ok(Some(block))
        }
    }
}

fn canonicalize(filename: &[u8]) -> Option<PathBuf> {
    let canonical = std::fs::canonicalize(Path::new(OsStr::from_bytes(filename))).ok();
    tracing::debug!(
        "canonicalize file: {} -> {}",
        String::from_utf8_lossy(filename),
        canonical
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(null)".to_string())
    );
    canonical
}

/// Choose the environment block for the child.
///
/// # Safety
/// Same contract as [`borrow_env_block`].
unsafe fn prepare_child_env(
    policy: LaunchPolicy,
    envp: *const *const c_char,
    root: Option<&BundleRoot>,
    filter: EnvFilter,
) -> ChildEnv {
    match policy {
        LaunchPolicy::Inherit => {
            tracing::debug!("Internal process; leaving environment unchanged");
            return ChildEnv::inherit(envp);
        }
        LaunchPolicy::SanitizeExternal => {
            tracing::debug!("External process detected; cleaning environment");
        }
        LaunchPolicy::SanitizeForced(name) => {
            tracing::debug!(
                "Internal process detected ({}); cleaning environment anyway since this is needed",
                name
            );
        }
    }

    // SAFETY: forwarded from the caller's contract.
    match unsafe { filter(envp, root) } {
        Ok(filtered) => ChildEnv {
            original: envp,
            filtered,
        },
        Err(e) => {
            tracing::warn!("Error creating cleaned environment ({}); using original env", e);
            ChildEnv::inherit(envp)
        }
    }
}

/// Run one intercepted exec through the launch pipeline.
///
/// Returns whatever the real call returns; on failure `errno` is the value
/// the real call left.
///
/// # Safety
/// `file`, `argv` and an explicit environment must satisfy the contract of
/// `execve(2)`.
pub unsafe fn exec_common<L, S>(
    launcher: &L,
    store: &mut S,
    file: *const c_char,
    argv: *const *const c_char,
    env: ExecEnv,
) -> c_int
where
    L: ProcessLauncher,
    S: EnvStore,
{
    // SAFETY: forwarded from the caller's contract.
    unsafe { exec_with_filter(launcher, store, file, argv, env, filtered_env_block) }
}

unsafe fn exec_with_filter<L, S>(
    launcher: &L,
    store: &mut S,
    file: *const c_char,
    argv: *const *const c_char,
    env: ExecEnv,
    filter: EnvFilter,
) -> c_int
where
    L: ProcessLauncher,
    S: EnvStore,
{
    if file.is_null() {
        tracing::debug!("{} called with a null path", launcher.name());
        restore_dirs(store);
        // SAFETY: forwarded unchanged; the real call reports EFAULT.
        return unsafe { launcher.launch(file, argv, env.resolve()) };
    }

    // SAFETY: non-null and NUL-terminated per the exec contract.
    let filename = unsafe { CStr::from_ptr(file) }.to_bytes();
    tracing::debug!("Preparing to exec: {}", String::from_utf8_lossy(filename));

    let canonical = canonicalize(filename);

    restore_dirs(store);
    let settings = Settings::load(store);
    let root = settings.bundle_root.as_ref();

    let target = canonical
        .as_deref()
        .map(|p| p.as_os_str().as_bytes())
        .unwrap_or(filename);
    let policy = launch_policy(root, target, filename);

    let envp = env.resolve();
    let (ret, saved_errno) = {
        // SAFETY: `envp` is the caller's array or `environ`, both valid here.
        let child = unsafe { prepare_child_env(policy, envp, root, filter) };

        tracing::debug!("Calling exec for {}", String::from_utf8_lossy(filename));
        // SAFETY: `child` stays alive across the call.
        let ret = unsafe { launcher.launch(file, argv, child.as_ptr()) };
        let saved_errno = (ret == -1).then(errno::get);
        (ret, saved_errno)
    };

    if let Some(code) = saved_errno {
        tracing::debug!(
            "Underlying {} returned -1, errno={} ({})",
            launcher.name(),
            code,
            std::io::Error::from_raw_os_error(code)
        );
        errno::set(code);
    }
    ret
}

/// Entry point shared by the exported wrappers: fail with `ENOSYS` when the
/// real function is unavailable, otherwise run the pipeline.
///
/// # Safety
/// Same contract as [`exec_common`].
pub unsafe fn intercept<L, S>(
    launcher: Result<L, ResolveError>,
    store: &mut S,
    file: *const c_char,
    argv: *const *const c_char,
    env: ExecEnv,
) -> c_int
where
    L: ProcessLauncher,
    S: EnvStore,
{
    match launcher {
        // SAFETY: forwarded from the caller's contract.
        Ok(launcher) => unsafe { exec_common(&launcher, store, file, argv, env) },
        Err(e) => {
            tracing::debug!("Error getting original symbol: {}", e);
            errno::set(libc::ENOSYS);
            -1
        }
    }
}

#[cfg(not(test))]
mod exports {
    use std::borrow::Cow;
    use std::ffi::{CStr, c_char, c_int};

    use anylinux_env::ProcessEnv;

    use super::{ExecEnv, intercept};
    use crate::launcher::RealProcessLauncher;

    fn describe(file: *const c_char) -> Cow<'static, str> {
        if file.is_null() {
            Cow::Borrowed("(NULL)")
        } else {
            // SAFETY: non-null exec paths are NUL-terminated.
            Cow::Owned(unsafe { CStr::from_ptr(file) }.to_string_lossy().into_owned())
        }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn execve(
        filename: *const c_char,
        argv: *const *const c_char,
        envp: *const *const c_char,
    ) -> c_int {
        crate::initialize();
        tracing::debug!("execve call hijacked: {}", describe(filename));
        // SAFETY: arguments come straight from the C caller.
        unsafe {
            intercept(
                RealProcessLauncher::execve(),
                &mut ProcessEnv,
                filename,
                argv,
                ExecEnv::Explicit(envp),
            )
        }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn execv(filename: *const c_char, argv: *const *const c_char) -> c_int {
        crate::initialize();
        tracing::debug!("execv call hijacked: {}", describe(filename));
        // SAFETY: arguments come straight from the C caller.
        unsafe {
            intercept(
                RealProcessLauncher::execve(),
                &mut ProcessEnv,
                filename,
                argv,
                ExecEnv::Ambient,
            )
        }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn execvpe(
        filename: *const c_char,
        argv: *const *const c_char,
        envp: *const *const c_char,
    ) -> c_int {
        crate::initialize();
        tracing::debug!("execvpe hijacked: {}", describe(filename));
        // SAFETY: arguments come straight from the C caller.
        unsafe {
            intercept(
                RealProcessLauncher::execvpe(),
                &mut ProcessEnv,
                filename,
                argv,
                ExecEnv::Explicit(envp),
            )
        }
    }

    #[unsafe(no_mangle)]
    pub unsafe extern "C" fn execvp(filename: *const c_char, argv: *const *const c_char) -> c_int {
        crate::initialize();
        tracing::debug!("execvp hijacked: {}", describe(filename));
        // SAFETY: arguments come straight from the C caller.
        unsafe {
            intercept(
                RealProcessLauncher::execvpe(),
                &mut ProcessEnv,
                filename,
                argv,
                ExecEnv::Ambient,
            )
        }
    }
}
