pub mod config_ops;
pub mod opcodes;
pub mod simulate;
