pub mod analysis;
pub mod config;
pub mod consts;
pub mod error;
pub mod logging;
pub mod protocol;
pub mod server;
pub mod services;
pub mod tools;
pub mod workflow;
