pub mod logger;

#[cfg(feature = "cli")]
pub mod cli;
