//! Data models for the repository index

pub mod branch;
pub mod commit;
pub mod diff;
pub mod pending;
pub mod reference;

pub use branch::*;
pub use commit::*;
pub use diff::*;
pub use pending::*;
pub use reference::*;
