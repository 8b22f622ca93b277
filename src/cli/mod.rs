//! CLI entry points for the two job binaries
//!
//! Only available with the "cli" feature. Each job parses its own argv
//! surface, builds its pipeline eagerly, and prints exactly one JSON
//! document to stdout; diagnostics go to stderr via tracing.

mod bgremove;
mod moderate;

pub use bgremove::{main as bgremove_main, BgremoveCli};
pub use moderate::{main as moderate_main, ModerateCli};

use serde::Serialize;

/// Print the result document to stdout
///
/// stdout carries nothing else; the host parses it as JSON.
fn emit_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
