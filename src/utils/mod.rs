//! Utility modules: developer trace sink and logger setup.
pub mod devlog;
pub mod logger;
