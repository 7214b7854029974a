//! Host tick sources for `tickline-scheduler`.
//!
//! Each driver implements [`TickDriver`](tickline_scheduler::TickDriver) on top of
//! a different host clock. The deterministic `ManualDriver` lives in the core crate.

pub mod thread;
#[cfg(feature = "tokio")]
pub mod tokio_driver;

pub use thread::ThreadDriver;
#[cfg(feature = "tokio")]
pub use tokio_driver::TokioDriver;
