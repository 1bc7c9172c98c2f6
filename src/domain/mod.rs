pub mod dialogue;
pub mod pipeline;
pub mod synthesis;
