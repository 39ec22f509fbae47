pub mod config;
pub mod logging;

pub mod aggregate;
pub mod control;
pub mod gate;
pub mod registry;
pub mod scheduler;
pub mod task;
pub mod work;
