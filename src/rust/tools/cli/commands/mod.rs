#![cfg(feature = "cli")]

pub mod inspect;
pub mod keys;
pub mod play;
pub mod ports;
