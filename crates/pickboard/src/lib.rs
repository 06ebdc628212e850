// Library root: the command-line front end over pickboard-core, exposed so
// integration tests can drive it.

pub mod cli;
pub mod config;
pub mod render;
