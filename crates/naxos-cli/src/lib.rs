pub mod check;
pub mod run;
pub mod tracing_init;
pub mod transport;
