//! End-to-end tests that load the built `libanylinux.so` into real programs.
//!
//! The shared object is looked up next to the test binary. When it has not
//! been built (for example when only the test target was compiled) the tests
//! print a note and return early.

#![cfg(target_os = "linux")]

use std::path::{Path, PathBuf};
use std::process::Command;

const APPDIR: &str = "/opt/anylinux-test-app";

fn preload_lib() -> Option<PathBuf> {
    let exe = std::env::current_exe().ok()?;
    let deps = exe.parent()?;
    [deps.join("libanylinux.so"), deps.parent()?.join("libanylinux.so")]
        .into_iter()
        .find(|p| p.is_file())
}

/// A command with a minimal environment that preloads the library.
fn preloaded(program: &str, lib: &Path) -> Command {
    let mut cmd = Command::new(program);
    cmd.env_clear()
        .env("PATH", "/usr/bin:/bin")
        .env("LD_PRELOAD", lib)
        .env("APPDIR", APPDIR)
        .env("LD_LIBRARY_PATH", format!("{APPDIR}/lib"))
        .env("HOME", format!("{APPDIR}/home"))
        .env("REAL_HOME", "/home/real");
    cmd
}

fn env_lines(cmd: &mut Command) -> Vec<String> {
    let output = cmd.output().expect("child should run");
    assert!(
        output.status.success(),
        "child failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(str::to_string)
        .collect()
}

macro_rules! require_lib {
    () => {
        match preload_lib() {
            Some(lib) => lib,
            None => {
                eprintln!("libanylinux.so not built; skipping");
                return;
            }
        }
    };
}

// ============================================================================
// PATH-SEARCHED EXEC WITH THE AMBIENT ENVIRONMENT
// ============================================================================

mod ambient_exec {
    use super::*;

    #[test]
    fn test_env_execvp_child_is_sanitized_and_restored() {
        let lib = require_lib!();
        // coreutils `env` replaces itself through execvp with the ambient
        // environment.
        let lines = env_lines(preloaded("/usr/bin/env", &lib).arg("printenv"));

        assert!(
            !lines.iter().any(|l| l.starts_with("LD_LIBRARY_PATH=")),
            "bundle library path leaked: {lines:?}"
        );
        assert!(lines.contains(&"HOME=/home/real".to_string()), "{lines:?}");
        assert!(lines.contains(&format!("APPDIR={APPDIR}")), "{lines:?}");
    }
}

// ============================================================================
// EXPLICIT-ENVIRONMENT EXEC
// ============================================================================

mod explicit_exec {
    use super::*;

    #[test]
    fn test_shell_exec_of_external_program_is_sanitized() {
        let lib = require_lib!();
        let lines = env_lines(
            preloaded("/bin/sh", &lib)
                .arg("-c")
                .arg("exec /usr/bin/printenv"),
        );

        assert!(
            !lines.iter().any(|l| l.starts_with("LD_LIBRARY_PATH=")),
            "bundle library path leaked: {lines:?}"
        );
        assert!(lines.contains(&"HOME=/home/real".to_string()), "{lines:?}");
    }

    #[test]
    fn test_internal_program_keeps_environment() {
        let lib = require_lib!();
        // With the bundle root at /usr, /usr/bin/printenv is inside it.
        let lines = env_lines(
            preloaded("/bin/sh", &lib)
                .env("APPDIR", "/usr")
                .env("LD_LIBRARY_PATH", "/usr/lib/anylinux-test")
                .arg("-c")
                .arg("exec /usr/bin/printenv"),
        );

        assert!(
            lines.contains(&"LD_LIBRARY_PATH=/usr/lib/anylinux-test".to_string()),
            "{lines:?}"
        );
    }
}
