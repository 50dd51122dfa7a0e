pub mod record;
pub mod seen_state;
pub mod source;

// Re-exports for convenience
pub use record::*;
pub use seen_state::*;
pub use source::*;
