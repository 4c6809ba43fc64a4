//! Testing utilities and harness for prompts

pub mod recording;
pub mod testing;

// Re-export testing utilities
pub use recording::*;
pub use testing::*;

pub mod prelude {
    pub use crate::recording::*;
    pub use crate::testing::*;
}
