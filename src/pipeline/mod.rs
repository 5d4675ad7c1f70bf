pub mod import;
pub mod extraction;
pub mod language_detect;
pub mod summarize;
pub mod search;
pub mod qa;
pub mod processor;
