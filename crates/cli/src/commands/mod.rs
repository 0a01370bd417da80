//! CLI Commands

pub mod list;
pub mod run;
