//! OpenOCD register reader
//!
//! Connects to a running OpenOCD daemon over its TCL interface, reads a batch of
//! CPU registers and prints them. The connection is released when the client is
//! dropped, on every exit path.

pub mod capture;
pub mod config;
pub mod openocd_client;
pub mod registers;

pub use capture::{capture_registers, report_and_close};
pub use config::{Args, Config};
pub use openocd_client::{OpenOcd, OpenocdError};
pub use registers::RegisterSnapshot;
