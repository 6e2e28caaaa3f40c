//! Subcommand entry points

pub mod connect;
pub mod init;
pub mod list;
