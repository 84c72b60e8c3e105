fn main() {
    // AppKit classes (NSWorkspace, NSScreen) are looked up by name at runtime,
    // so nothing references the frameworks at link time unless asked to.
    if std::env::var("CARGO_CFG_TARGET_OS").is_ok_and(|os| os == "macos") {
        println!("cargo:rustc-link-lib=framework=AppKit");
        println!("cargo:rustc-link-lib=framework=Foundation");
    }
}
