//! Restoration of the user's real home and XDG directories.
//!
//! In portable mode the bundle points `HOME` and the XDG base directories at
//! private locations and saves the originals under `REAL_*` names. Children
//! must see the originals, so they are written back into the live
//! environment before every launch.

use crate::config::EnvStore;
use crate::error::EnvError;

/// `(live variable, saved original)` pairs, in restoration order.
pub const SHADOW_DIR_VARS: &[(&str, &str)] = &[
    ("XDG_DATA_HOME", "REAL_XDG_DATA_HOME"),
    ("XDG_CONFIG_HOME", "REAL_XDG_CONFIG_HOME"),
    ("XDG_CACHE_HOME", "REAL_XDG_CACHE_HOME"),
    ("HOME", "REAL_HOME"),
];

/// Outcome of one restoration pass.
#[derive(Debug, Default)]
pub struct RestoreReport {
    /// Live variables that were overwritten.
    pub restored: Vec<&'static str>,
    /// Live variables that could not be written, with the reason.
    pub failed: Vec<(&'static str, EnvError)>,
}

/// Copy every non-empty `REAL_*` value over its live counterpart.
///
/// Failures are logged and collected; they never stop the remaining
/// variables from being restored.
pub fn restore_dirs(store: &mut impl EnvStore) -> RestoreReport {
    let mut report = RestoreReport::default();

    for &(live, shadow) in SHADOW_DIR_VARS {
        let Some(value) = store.get(shadow).filter(|v| !v.is_empty()) else {
            continue;
        };
        match store.set(live, &value) {
            Ok(()) => {
                tracing::debug!("Restored {} to {}", live, value.to_string_lossy());
                report.restored.push(live);
            }
            Err(e) => {
                tracing::debug!(
                    "Failed to restore {} to {}: {}",
                    live,
                    value.to_string_lossy(),
                    e
                );
                report.failed.push((live, e));
            }
        }
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MemoryEnv;
    use pretty_assertions::assert_eq;
    use std::ffi::OsString;

    #[test]
    fn test_restores_all_shadowed_dirs() {
        let mut env = MemoryEnv::new()
            .with("HOME", "/opt/app/.home")
            .with("REAL_HOME", "/home/user")
            .with("XDG_CONFIG_HOME", "/opt/app/.config")
            .with("REAL_XDG_CONFIG_HOME", "/home/user/.config")
            .with("REAL_XDG_DATA_HOME", "/home/user/.local/share")
            .with("REAL_XDG_CACHE_HOME", "/home/user/.cache");

        let report = restore_dirs(&mut env);

        assert_eq!(
            report.restored,
            vec!["XDG_DATA_HOME", "XDG_CONFIG_HOME", "XDG_CACHE_HOME", "HOME"]
        );
        assert!(report.failed.is_empty());
        assert_eq!(env.get("HOME"), Some(OsString::from("/home/user")));
        assert_eq!(
            env.get("XDG_CONFIG_HOME"),
            Some(OsString::from("/home/user/.config"))
        );
        assert_eq!(
            env.get("XDG_DATA_HOME"),
            Some(OsString::from("/home/user/.local/share"))
        );
        assert_eq!(
            env.get("XDG_CACHE_HOME"),
            Some(OsString::from("/home/user/.cache"))
        );
    }

    #[test]
    fn test_unset_or_empty_shadow_is_ignored() {
        let mut env = MemoryEnv::new()
            .with("HOME", "/opt/app/.home")
            .with("REAL_HOME", "")
            .with("XDG_CACHE_HOME", "/opt/app/.cache");

        let report = restore_dirs(&mut env);

        assert!(report.restored.is_empty());
        assert_eq!(env.get("HOME"), Some(OsString::from("/opt/app/.home")));
        assert_eq!(
            env.get("XDG_CACHE_HOME"),
            Some(OsString::from("/opt/app/.cache"))
        );
    }

    #[test]
    fn test_failure_is_not_fatal() {
        let mut env = MemoryEnv::new()
            .with("HOME", "/opt/app/.home")
            .with("REAL_HOME", "/home/user")
            .with("REAL_XDG_DATA_HOME", "/home/user/.local/share")
            .read_only("XDG_DATA_HOME");

        let report = restore_dirs(&mut env);

        assert_eq!(report.restored, vec!["HOME"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, "XDG_DATA_HOME");
        assert_eq!(env.get("HOME"), Some(OsString::from("/home/user")));
        assert_eq!(env.get("XDG_DATA_HOME"), None);
    }

    #[test]
    fn test_restoring_twice_is_stable() {
        let mut env = MemoryEnv::new()
            .with("HOME", "/opt/app/.home")
            .with("REAL_HOME", "/home/user");
        restore_dirs(&mut env);
        let first: Vec<_> = env.iter().map(|(k, v)| (k.to_string(), v.to_owned())).collect();
        restore_dirs(&mut env);
        let second: Vec<_> = env.iter().map(|(k, v)| (k.to_string(), v.to_owned())).collect();
        assert_eq!(first, second);
    }
}
