//! Serve entrypoint shared by the binary, the CLI and tests.

use crate::{ServerConfig, object::ObjectManager, targets::InitialObject, ws};
use anyhow::{Context, Result};
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

/// A running server.
///
/// Dropping the handle leaves the server running until the runtime stops;
/// call [`shutdown`](Self::shutdown) to stop it gracefully.
pub struct ServeHandle {
    addr: SocketAddr,
    objects: Arc<ObjectManager>,
    stop: Option<oneshot::Sender<()>>,
    task: JoinHandle<std::io::Result<()>>,
}

impl ServeHandle {
    /// Address the listener is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.addr
    }

    /// WebSocket URL of the RPC endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}{}", self.addr, protocol::RPC_PATH)
    }

    /// Objects currently registered.
    pub fn objects(&self) -> &Arc<ObjectManager> {
        &self.objects
    }

    /// Stop accepting connections and wait for the server task.
    pub async fn shutdown(mut self) -> Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        self.wait().await
    }

    /// Wait until the server task ends.
    pub async fn wait(self) -> Result<()> {
        self.task.await?.context("server terminated")
    }
}

/// Bind the configured address and serve a fresh registry holding the
/// initial object.
pub async fn serve(config: &ServerConfig) -> Result<ServeHandle> {
    let objects = Arc::new(ObjectManager::new());
    objects.insert(
        protocol::INITIAL_OBJECT_ID,
        InitialObject::new(config.cluster.workers.clone()),
    );

    let bind = config.bind_address();
    let listener = TcpListener::bind(&bind)
        .await
        .with_context(|| format!("cannot bind {bind}"))?;
    serve_on(listener, objects)
}

/// Serve `objects` on an already-bound listener.
pub fn serve_on(listener: TcpListener, objects: Arc<ObjectManager>) -> Result<ServeHandle> {
    let addr = listener.local_addr()?;
    tracing::info!("hillview server listening on {addr}");

    let app = ws::router(Arc::clone(&objects));
    let (stop, stopped) = oneshot::channel::<()>();
    let task = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stopped.await;
                tracing::info!("shutting down");
            })
            .await
    });

    Ok(ServeHandle {
        addr,
        objects,
        stop: Some(stop),
        task,
    })
}
