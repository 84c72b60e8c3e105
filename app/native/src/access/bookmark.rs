//! Security-scoped bookmarks (macOS).
//!
//! Bookmarks are created with a read-only security scope, so the persisted
//! grant covers reading the one file and nothing else. When the process is
//! not sandboxed and the OS refuses to create a scoped bookmark, tokens fall
//! back to [`PassthroughProvider`]. Inside the sandbox a path token would not
//! survive a relaunch, so minting fails instead.

use std::collections::HashMap;
use std::ffi::CStr;
use std::path::{Path, PathBuf};

use objc::rc::autoreleasepool;
use objc::runtime::{BOOL, Class, NO, Object};
use objc::{msg_send, sel, sel_impl};
use parking_lot::Mutex;

use super::{AccessError, AccessProvider, DurableToken, PassthroughProvider, Resolved};

/// Prefix distinguishing bookmark tokens from passthrough tokens.
const BOOKMARK_MAGIC: &[u8] = b"TBM1";

/// `NSURLBookmarkCreationWithSecurityScope`.
const CREATION_WITH_SECURITY_SCOPE: u64 = 1 << 11;
/// `NSURLBookmarkCreationSecurityScopeAllowOnlyReadAccess`.
const CREATION_READ_ONLY: u64 = 1 << 12;
/// `NSURLBookmarkResolutionWithSecurityScope`.
const RESOLUTION_WITH_SECURITY_SCOPE: u64 = 1 << 10;
/// Set by the OS for every process running inside the App Sandbox.
const SANDBOX_CONTAINER_ENV: &str = "APP_SANDBOX_CONTAINER_ID";

/// `NSUTF8StringEncoding`.
const UTF8_ENCODING: u64 = 4;

/// A retained, security-scoped `NSURL` with its open count.
struct OpenUrl {
    url: *mut Object,
    count: usize,
}

// SAFETY: NSURL is immutable and documented as thread-safe.
unsafe impl Send for OpenUrl {}

/// Access provider backed by security-scoped bookmarks.
pub struct BookmarkProvider {
    fallback: PassthroughProvider,
    sandboxed: bool,
    open: Mutex<HashMap<PathBuf, OpenUrl>>,
}

impl Default for BookmarkProvider {
    fn default() -> Self { Self::new() }
}

impl BookmarkProvider {
    #[must_use]
    pub fn new() -> Self { Self::with_sandbox(std::env::var_os(SANDBOX_CONTAINER_ENV).is_some()) }

    /// Provider that treats the process as sandboxed or not, regardless of
    /// the environment.
    #[must_use]
    pub fn with_sandbox(sandboxed: bool) -> Self {
        Self {
            fallback: PassthroughProvider::new(),
            sandboxed,
            open: Mutex::new(HashMap::new()),
        }
    }

    /// Handles a bookmark that could not be created for `path`.
    fn mint_without_bookmark(&self, path: &Path, reason: String) -> Result<DurableToken, AccessError> {
        if self.sandboxed {
            tracing::warn!(path = %path.display(), %reason, "scoped bookmark refused inside sandbox");
            return Err(AccessError::Mint { path: path.to_path_buf(), reason });
        }

        tracing::debug!(path = %path.display(), %reason, "scoped bookmark unavailable, using path token");
        self.fallback.mint(path)
    }

    fn bookmark_bytes(token: &DurableToken) -> Option<&[u8]> {
        token.as_bytes().strip_prefix(BOOKMARK_MAGIC)
    }
}

impl AccessProvider for BookmarkProvider {
    fn mint(&self, path: &Path) -> Result<DurableToken, AccessError> {
        if !path.is_file() {
            return self.fallback.mint(path);
        }

        match autoreleasepool(|| unsafe { create_bookmark(path) }) {
            Ok(bytes) => {
                let mut token = BOOKMARK_MAGIC.to_vec();
                token.extend_from_slice(&bytes);
                Ok(DurableToken::from_bytes(token))
            }
            Err(reason) => self.mint_without_bookmark(path, reason),
        }
    }

    fn resolve(&self, token: &DurableToken) -> Result<Resolved, AccessError> {
        let Some(bytes) = Self::bookmark_bytes(token) else {
            return self.fallback.resolve(token);
        };

        autoreleasepool(|| unsafe {
            let (url, stale) = resolve_bookmark(bytes)?;
            Ok(Resolved {
                path: url_path(url)?,
                stale,
            })
        })
    }

    fn open(&self, token: &DurableToken) -> Result<Resolved, AccessError> {
        let Some(bytes) = Self::bookmark_bytes(token) else {
            return self.fallback.open(token);
        };

        autoreleasepool(|| unsafe {
            let (url, stale) = resolve_bookmark(bytes)?;
            let path = url_path(url)?;

            let mut open = self.open.lock();
            if let Some(entry) = open.get_mut(&path) {
                entry.count += 1;
                return Ok(Resolved { path, stale });
            }

            let granted: BOOL = msg_send![url, startAccessingSecurityScopedResource];
            if granted == NO {
                return Err(AccessError::Denied(path));
            }

            let retained: *mut Object = msg_send![url, retain];
            open.insert(path.clone(), OpenUrl { url: retained, count: 1 });
            Ok(Resolved { path, stale })
        })
    }

    fn close(&self, path: &Path) {
        let mut open = self.open.lock();
        let Some(entry) = open.get_mut(path) else {
            drop(open);
            self.fallback.close(path);
            return;
        };

        entry.count -= 1;
        if entry.count > 0 {
            return;
        }

        if let Some(entry) = open.remove(path) {
            unsafe {
                let _: () = msg_send![entry.url, stopAccessingSecurityScopedResource];
                let _: () = msg_send![entry.url, release];
            }
        }
    }

    fn open_scopes(&self) -> usize {
        let scoped: usize = self.open.lock().values().map(|entry| entry.count).sum();
        scoped + self.fallback.open_scopes()
    }
}

fn class(name: &str) -> Result<&'static Class, AccessError> {
    Class::get(name).ok_or_else(|| AccessError::Resolve(format!("Failed to get {name} class")))
}

/// Builds an `NSURL` for a filesystem path.
unsafe fn file_url(path: &Path) -> Result<*mut Object, AccessError> {
    let path_str = path.display().to_string();
    let string_class = class("NSString")?;
    let url_class = class("NSURL")?;

    unsafe {
        let ns_path: *mut Object = msg_send![string_class, alloc];
        let ns_path: *mut Object = msg_send![ns_path, initWithBytes:path_str.as_ptr() length:path_str.len() encoding:UTF8_ENCODING];
        if ns_path.is_null() {
            return Err(AccessError::Resolve("Failed to create path string".to_string()));
        }
        let ns_path: *mut Object = msg_send![ns_path, autorelease];

        let url: *mut Object = msg_send![url_class, fileURLWithPath: ns_path];
        if url.is_null() {
            return Err(AccessError::Resolve("Failed to create URL from path".to_string()));
        }
        Ok(url)
    }
}

unsafe fn create_bookmark(path: &Path) -> Result<Vec<u8>, String> {
    unsafe {
        let url = file_url(path).map_err(|err| err.to_string())?;
        let nil: *mut Object = std::ptr::null_mut();
        let mut error: *mut Object = std::ptr::null_mut();
        let options = CREATION_WITH_SECURITY_SCOPE | CREATION_READ_ONLY;

        let data: *mut Object = msg_send![url, bookmarkDataWithOptions:options includingResourceValuesForKeys:nil relativeToURL:nil error:&mut error];
        if data.is_null() {
            return Err(describe_error(error));
        }

        let length: usize = msg_send![data, length];
        let bytes: *const u8 = msg_send![data, bytes];
        if bytes.is_null() || length == 0 {
            return Err("empty bookmark".to_string());
        }
        Ok(std::slice::from_raw_parts(bytes, length).to_vec())
    }
}

unsafe fn resolve_bookmark(bytes: &[u8]) -> Result<(*mut Object, bool), AccessError> {
    let data_class = class("NSData")?;
    let url_class = class("NSURL")?;

    unsafe {
        let data: *mut Object = msg_send![data_class, dataWithBytes:bytes.as_ptr() length:bytes.len()];
        if data.is_null() {
            return Err(AccessError::Corrupt("Failed to wrap bookmark data".to_string()));
        }

        let nil: *mut Object = std::ptr::null_mut();
        let mut stale: BOOL = NO;
        let mut error: *mut Object = std::ptr::null_mut();
        let url: *mut Object = msg_send![url_class, URLByResolvingBookmarkData:data options:RESOLUTION_WITH_SECURITY_SCOPE relativeToURL:nil bookmarkDataIsStale:&mut stale error:&mut error];
        if url.is_null() {
            return Err(AccessError::Resolve(describe_error(error)));
        }

        Ok((url, stale != NO))
    }
}

unsafe fn url_path(url: *mut Object) -> Result<PathBuf, AccessError> {
    unsafe {
        let path: *mut Object = msg_send![url, path];
        ns_string(path)
            .map(PathBuf::from)
            .ok_or_else(|| AccessError::Resolve("Resolved URL has no path".to_string()))
    }
}

unsafe fn ns_string(value: *mut Object) -> Option<String> {
    if value.is_null() {
        return None;
    }
    unsafe {
        let bytes: *const std::os::raw::c_char = msg_send![value, UTF8String];
        if bytes.is_null() {
            return None;
        }
        Some(CStr::from_ptr(bytes).to_string_lossy().into_owned())
    }
}

unsafe fn describe_error(error: *mut Object) -> String {
    if error.is_null() {
        return "Unknown error".to_string();
    }
    unsafe {
        let description: *mut Object = msg_send![error, localizedDescription];
        ns_string(description).unwrap_or_else(|| "Unknown error".to_string())
    }
}
