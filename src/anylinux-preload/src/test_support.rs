//! Fakes for driving the interposers without replacing the test process.

use std::cell::RefCell;
use std::ffi::{CStr, CString, c_char, c_int, c_void};
use std::ptr;

use crate::errno;
use crate::launcher::{LibraryLoader, ProcessLauncher};

/// An owned, null-terminated `char *[]`.
pub struct CBlock {
    _strings: Vec<CString>,
    ptrs: Vec<*const c_char>,
}

impl CBlock {
    pub fn new(items: &[&str]) -> Self {
        let strings: Vec<CString> = items.iter().map(|s| CString::new(*s).unwrap()).collect();
        let mut ptrs: Vec<*const c_char> = strings.iter().map(|s| s.as_ptr()).collect();
        ptrs.push(ptr::null());
        Self {
            _strings: strings,
            ptrs,
        }
    }

    pub fn as_ptr(&self) -> *const *const c_char {
        self.ptrs.as_ptr()
    }
}

/// Copy a null-terminated string array into owned strings.
///
/// # Safety
/// `block` must be null or a valid null-terminated array.
pub unsafe fn read_block(block: *const *const c_char) -> Vec<String> {
    let mut out = Vec::new();
    if block.is_null() {
        return out;
    }
    let mut i = 0;
    loop {
        let item = unsafe { *block.add(i) };
        if item.is_null() {
            return out;
        }
        out.push(unsafe { CStr::from_ptr(item) }.to_string_lossy().into_owned());
        i += 1;
    }
}

#[derive(Debug, Clone)]
pub struct LaunchCall {
    pub file: String,
    pub argv: Vec<String>,
    pub env: Vec<String>,
    pub envp: *const *const c_char,
}

/// Records each launch and returns a fixed result.
pub struct RecordingLauncher {
    calls: RefCell<Vec<LaunchCall>>,
    fail_with: Option<c_int>,
}

impl RecordingLauncher {
    pub fn succeeding() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_with: None,
        }
    }

    /// Returns `-1` with `errno` set to `code`.
    pub fn failing(code: c_int) -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            fail_with: Some(code),
        }
    }

    pub fn calls(&self) -> Vec<LaunchCall> {
        self.calls.borrow().clone()
    }

    pub fn single_call(&self) -> LaunchCall {
        let calls = self.calls();
        assert_eq!(calls.len(), 1, "expected exactly one launch");
        calls.into_iter().next().unwrap()
    }
}

impl ProcessLauncher for RecordingLauncher {
    fn name(&self) -> &'static str {
        "recording-exec"
    }

    unsafe fn launch(
        &self,
        file: *const c_char,
        argv: *const *const c_char,
        envp: *const *const c_char,
    ) -> c_int {
        let file = if file.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(file) }.to_string_lossy().into_owned()
        };
        self.calls.borrow_mut().push(LaunchCall {
            file,
            argv: unsafe { read_block(argv) },
            env: unsafe { read_block(envp) },
            envp,
        });
        match self.fail_with {
            Some(code) => {
                errno::set(code);
                -1
            }
            None => 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoaderCall {
    Open { name: Option<String>, flags: c_int },
    Close(usize),
}

/// Records each call; opens succeed except for names listed as missing.
pub struct RecordingLoader {
    calls: RefCell<Vec<LoaderCall>>,
    missing: Vec<String>,
}

/// Address handed out for successful opens.
pub const FAKE_HANDLE: usize = 0x1000;

impl RecordingLoader {
    pub fn new() -> Self {
        Self {
            calls: RefCell::new(Vec::new()),
            missing: Vec::new(),
        }
    }

    pub fn missing(mut self, name: &str) -> Self {
        self.missing.push(name.to_string());
        self
    }

    pub fn calls(&self) -> Vec<LoaderCall> {
        self.calls.borrow().clone()
    }
}

impl LibraryLoader for RecordingLoader {
    unsafe fn open(&self, name: *const c_char, flags: c_int) -> *mut c_void {
        let name = if name.is_null() {
            None
        } else {
            Some(unsafe { CStr::from_ptr(name) }.to_string_lossy().into_owned())
        };
        let found = !name.as_ref().is_some_and(|n| self.missing.contains(n));
        self.calls.borrow_mut().push(LoaderCall::Open { name, flags });
        if found {
            FAKE_HANDLE as *mut c_void
        } else {
            ptr::null_mut()
        }
    }

    unsafe fn close(&self, handle: *mut c_void) -> c_int {
        self.calls.borrow_mut().push(LoaderCall::Close(handle as usize));
        0
    }
}
