use objc::rc::autoreleasepool;
use objc::runtime::{BOOL, Class, Object};
use objc::{msg_send, sel, sel_impl};

use crate::selection::Appearance;

/// `NSUTF8StringEncoding`.
const UTF8_ENCODING: u64 = 4;
const INTERFACE_STYLE_KEY: &str = "AppleInterfaceStyle";

/// Reads the `AppleInterfaceStyle` global default.
///
/// The key is only present (with value `Dark`) while dark mode is active.
pub fn interface_style() -> Appearance {
    let style = autoreleasepool(|| unsafe { read_global_string(INTERFACE_STYLE_KEY) });
    match style.as_deref() {
        Some(value) if value.eq_ignore_ascii_case("dark") => Appearance::Dark,
        _ => Appearance::Light,
    }
}

unsafe fn read_global_string(key: &str) -> Option<String> {
    let defaults_class = Class::get("NSUserDefaults")?;
    let string_class = Class::get("NSString")?;

    unsafe {
        let defaults: *mut Object = msg_send![defaults_class, standardUserDefaults];
        if defaults.is_null() {
            return None;
        }
        // Pick up writes made by System Settings since the last read.
        let _: BOOL = msg_send![defaults, synchronize];

        let ns_key: *mut Object = msg_send![string_class, alloc];
        let ns_key: *mut Object = msg_send![ns_key, initWithBytes:key.as_ptr() length:key.len() encoding:UTF8_ENCODING];
        if ns_key.is_null() {
            return None;
        }
        let ns_key: *mut Object = msg_send![ns_key, autorelease];

        let value: *mut Object = msg_send![defaults, stringForKey: ns_key];
        if value.is_null() {
            return None;
        }

        let utf8: *const std::os::raw::c_char = msg_send![value, UTF8String];
        if utf8.is_null() {
            return None;
        }
        Some(std::ffi::CStr::from_ptr(utf8).to_string_lossy().into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_interface_style_does_not_panic() {
        let appearance = interface_style();
        assert!(matches!(appearance, Appearance::Light | Appearance::Dark));
    }
}
