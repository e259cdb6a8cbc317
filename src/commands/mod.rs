// ABOUTME: Command implementations behind the CLI subcommands
// ABOUTME: Exports export, import, and list commands plus the shared progress renderer

pub mod export;
pub mod import;
pub mod list;
mod render;

pub use export::{export, ExportArgs};
pub use import::{import, ImportArgs};
pub use list::list;
