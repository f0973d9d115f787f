//! CLI subcommands

pub mod disasm;
pub mod run;
