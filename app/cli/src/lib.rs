//! Hillview CLI: run a server, or invoke methods on remote objects and
//! print their streamed results.

pub use cmd::{Cli, Command};
pub use printer::{Printer, Status};

pub mod cmd;
pub mod printer;
