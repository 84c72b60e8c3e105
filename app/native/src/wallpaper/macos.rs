//! macOS desktop picture backend.
//!
//! Uses `NSWorkspace.setDesktopImageURL(_:for:options:)` per `NSScreen`.

use std::ffi::CStr;
use std::path::{Path, PathBuf};

use objc::rc::autoreleasepool;
use objc::runtime::{BOOL, Class, NO, Object};
use objc::{msg_send, sel, sel_impl};

use super::{BackendError, DesktopBackend, Screen};

/// Factory desktop pictures, newest first.
const DEFAULT_PICTURES: &[&str] = &[
    "/System/Library/Desktop Pictures/Monterey Graphic.heic",
    "/System/Library/Desktop Pictures/Sonoma.heic",
    "/System/Library/Desktop Pictures/Ventura Graphic.heic",
    "/System/Library/CoreServices/DefaultDesktop.heic",
];

/// `NSUTF8StringEncoding`.
const UTF8_ENCODING: u64 = 4;

/// Desktop backend backed by `AppKit`.
#[derive(Debug, Default)]
pub struct MacBackend;

impl MacBackend {
    #[must_use]
    pub const fn new() -> Self { Self }
}

fn class(name: &str) -> Result<&'static Class, BackendError> {
    Class::get(name)
        .ok_or_else(|| BackendError::SetWallpaperFailed(format!("Failed to get {name} class")))
}

unsafe fn ns_string_to_string(value: *mut Object) -> Option<String> {
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

unsafe fn screens_array() -> Result<*mut Object, BackendError> {
    let screen_class = class("NSScreen")?;
    unsafe {
        let screens: *mut Object = msg_send![screen_class, screens];
        if screens.is_null() {
            return Err(BackendError::SetWallpaperFailed("Failed to get screens".to_string()));
        }
        Ok(screens)
    }
}

impl DesktopBackend for MacBackend {
    fn screens(&self) -> Result<Vec<Screen>, BackendError> {
        autoreleasepool(|| unsafe {
            let screens = screens_array()?;
            let count: usize = msg_send![screens, count];

            let mut result = Vec::with_capacity(count);
            for index in 0..count {
                let screen: *mut Object = msg_send![screens, objectAtIndex: index];
                let name: *mut Object = if screen.is_null() {
                    std::ptr::null_mut()
                } else {
                    msg_send![screen, localizedName]
                };
                result.push(Screen {
                    index,
                    name: ns_string_to_string(name).unwrap_or_else(|| format!("Display {}", index + 1)),
                });
            }
            Ok(result)
        })
    }

    fn set_for_screen(&self, path: &Path, screen: &Screen) -> Result<(), BackendError> {
        if !path.exists() {
            return Err(BackendError::FileNotFound(path.display().to_string()));
        }

        autoreleasepool(|| unsafe { set_desktop_image(path, screen.index) })
    }

    fn default_image(&self) -> Option<PathBuf> {
        DEFAULT_PICTURES.iter().map(PathBuf::from).find(|path| path.exists())
    }
}

unsafe fn set_desktop_image(path: &Path, screen_index: usize) -> Result<(), BackendError> {
    unsafe {
        let screens = screens_array()?;
        let count: usize = msg_send![screens, count];
        if screen_index >= count {
            return Err(BackendError::InvalidScreen(screen_index));
        }

        let screen: *mut Object = msg_send![screens, objectAtIndex: screen_index];
        if screen.is_null() {
            return Err(BackendError::InvalidScreen(screen_index));
        }

        let workspace_class = class("NSWorkspace")?;
        let workspace: *mut Object = msg_send![workspace_class, sharedWorkspace];
        if workspace.is_null() {
            return Err(BackendError::SetWallpaperFailed(
                "Failed to get shared workspace".to_string(),
            ));
        }

        let path_str = path.display().to_string();
        let string_class = class("NSString")?;
        let path_ns: *mut Object = msg_send![string_class, alloc];
        let path_ns: *mut Object =
            msg_send![path_ns, initWithBytes:path_str.as_ptr() length:path_str.len() encoding:UTF8_ENCODING];
        if path_ns.is_null() {
            return Err(BackendError::SetWallpaperFailed(
                "Failed to create path string".to_string(),
            ));
        }
        let path_ns: *mut Object = msg_send![path_ns, autorelease];

        let url_class = class("NSURL")?;
        let url: *mut Object = msg_send![url_class, fileURLWithPath: path_ns];
        if url.is_null() {
            return Err(BackendError::SetWallpaperFailed(
                "Failed to create URL from path".to_string(),
            ));
        }

        let dictionary_class = class("NSDictionary")?;
        let options: *mut Object = msg_send![dictionary_class, dictionary];
        let mut error: *mut Object = std::ptr::null_mut();

        let success: BOOL = msg_send![workspace, setDesktopImageURL:url forScreen:screen options:options error:&mut error];
        if success == NO {
            let message = if error.is_null() {
                None
            } else {
                let description: *mut Object = msg_send![error, localizedDescription];
                ns_string_to_string(description)
            };
            return Err(BackendError::SetWallpaperFailed(
                message.unwrap_or_else(|| "Unknown error".to_string()),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_for_screen_rejects_missing_file() {
        let backend = MacBackend::new();
        let screen = Screen { index: 0, name: "Built-in".to_string() };
        let err = backend
            .set_for_screen(Path::new("/nonexistent/path/to/wallpaper.jpg"), &screen)
            .unwrap_err();
        assert!(matches!(err, BackendError::FileNotFound(_)));
    }

    #[test]
    fn default_image_exists_when_reported() {
        if let Some(path) = MacBackend::new().default_image() {
            assert!(path.exists());
        }
    }
}
