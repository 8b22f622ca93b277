//! Background-removal job binary
//!
//! Thin shim over `imgjobs::cli::bgremove_main`; all behavior lives in the
//! library so it stays testable.

#[cfg(feature = "cli")]
fn main() -> std::process::ExitCode {
    imgjobs::cli::bgremove_main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
