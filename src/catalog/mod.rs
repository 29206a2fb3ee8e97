pub mod diff;
pub mod identity;

pub use diff::diff;
