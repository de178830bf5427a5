pub mod cancel;
pub mod config;
pub mod logging;
pub mod pool;
pub mod probe;
pub mod retry;
