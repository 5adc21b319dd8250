//! Library crate for dirscan-rs exposing reusable modules.
pub mod controller;
pub mod patterns;
pub mod probe;
pub mod scanner;
pub mod server;
pub mod types;
pub mod wordlist;
