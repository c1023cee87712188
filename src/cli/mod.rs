//! CLI module for SymptomBuddy
//!
//! Handles command-line argument parsing.

pub mod args;

pub use args::{Args, Commands, MemoryTypeArg, Verdict, VerdictArg};
