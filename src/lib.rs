//! devdock Library
//!
//! Headless front-end for the devdock orchestrators: terminal prompts, a
//! static workspace view and the command runner behind the `devdock` binary.

pub mod headless;

pub use headless::{HeadlessRunner, StaticWorkspace, TerminalUi};
