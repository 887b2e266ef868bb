//! Command Line Interface (CLI) layer for cropmap.
//!
//! This module defines argument parsing (`args`), error types (`errors`),
//! and the dispatch logic (`runner`) for the `area`, `advise`, `request` and
//! `postprocess` commands. It wires user-provided options to the library
//! functionality exposed via `cropmap::api`.
//!
//! If you are embedding cropmap into another application, prefer using
//! the high-level `cropmap::api` module instead of calling the CLI code.
pub mod args;
pub mod errors;
pub mod runner;

pub use args::CliArgs;
pub use runner::run;
