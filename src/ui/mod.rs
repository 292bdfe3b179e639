pub mod progress;
pub mod prompts;
