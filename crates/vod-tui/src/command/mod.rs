//! Running user-configured command chains against a playable item.

pub mod exec;
pub mod process;
pub mod template;

pub use exec::play;
