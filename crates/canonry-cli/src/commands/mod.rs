pub mod graph;
pub mod init;
pub mod normalize;
pub mod rename;
pub mod repair;
pub mod validate;
