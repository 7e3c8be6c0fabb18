//! Generic method invocation.

use crate::{
    cmd::Connect,
    printer::{Printer, Status},
};
use anyhow::{Context, Result, bail};
use clap::Args;
use client::Arguments;
use std::io::Write;

/// Invoke `method` on `object`.
#[derive(Args, Debug)]
pub struct Call {
    /// Target object id; `0` is the initial object.
    pub object: String,

    /// Method name.
    pub method: String,

    /// Method arguments as JSON.
    #[arg(long)]
    pub args: Option<String>,

    /// Connection options.
    #[command(flatten)]
    pub connect: Connect,
}

impl Call {
    /// Arguments to send, validated as JSON.
    pub fn arguments(&self) -> Result<Arguments> {
        match &self.args {
            Some(args) => {
                serde_json::from_str::<serde_json::Value>(args)
                    .with_context(|| format!("--args is not valid JSON: {args}"))?;
                Ok(Arguments::raw(args.as_str()))
            }
            None => Ok(Arguments::none()),
        }
    }

    /// Run against stdout/stderr; fails when the operation reported an error.
    pub async fn run(self) -> Result<()> {
        let status = self.run_with(std::io::stdout(), std::io::stderr()).await?;
        if status.failed() {
            bail!("{}.{} failed", status.object, status.method);
        }
        Ok(())
    }

    /// Run the operation, printing into `out` and `err`. Ctrl-c cancels it.
    pub async fn run_with<W, E>(self, out: W, err: E) -> Result<Status>
    where
        W: Write + Send + 'static,
        E: Write + Send + 'static,
    {
        let ctx = self.connect.context()?;
        let args = self.arguments()?;
        let op = ctx.create_operation(self.object.as_str(), self.method.as_str(), args);
        tracing::info!(
            "calling {}.{} on {}",
            op.target(),
            op.method(),
            op.server_url()
        );

        let printer = Printer::new(op.clone(), out, err);
        let status = printer.status();
        let mut join = op.invoke(printer);
        tokio::select! {
            done = &mut join => done?,
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted, cancelling request {}", op.request_id());
                op.cancel();
                join.await?;
            }
        }
        Ok(status)
    }
}
