pub mod app;
pub mod prompt;
