pub mod bootstrap;
pub mod commands;
pub mod derived_state;
