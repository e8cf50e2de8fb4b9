pub mod app;
pub mod file;
