pub mod add;
pub mod branch;
pub mod commit;
pub mod config;
pub mod init;
pub mod log;
pub mod push;
