//! File-handling services kept out of the engine logic

pub mod io;

pub use io::{ImageIo, LoadedImage};
