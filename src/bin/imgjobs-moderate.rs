//! Content-analysis job binary
//!
//! Thin shim over `imgjobs::cli::moderate_main`.

#[cfg(feature = "cli")]
fn main() -> std::process::ExitCode {
    imgjobs::cli::moderate_main()
}

#[cfg(not(feature = "cli"))]
fn main() {
    panic!("CLI feature not enabled. Please rebuild with --features cli");
}
