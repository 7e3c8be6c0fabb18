//! Ping command.

use crate::cmd::{Connect, call::Call};
use anyhow::Result;
use clap::Args;

/// Ask the initial object for the worker list.
#[derive(Args, Debug)]
pub struct Ping {
    /// Connection options.
    #[command(flatten)]
    pub connect: Connect,
}

impl Ping {
    /// The equivalent `call` invocation.
    pub fn into_call(self) -> Call {
        Call {
            object: protocol::INITIAL_OBJECT_ID.to_owned(),
            method: "ping".to_owned(),
            args: None,
            connect: self.connect,
        }
    }

    /// Ping the server and print the workers.
    pub async fn run(self) -> Result<()> {
        self.into_call().run().await
    }
}
