//! JSON-RPC Server
//!
//! Request/response methods plus the `queue.subscribe.v1` push channel,
//! served over HTTP and WebSocket on one TCP port.

use crate::handler::RpcHandler;
use crate::notifier::BroadcastNotifier;
use crate::types::{
    BoothRequest, JoinRequest, LeaveRequest, PositionRequest, UpdateSettingsRequest,
    UpdateStatusRequest,
};
use boothline_core::application::QueueDirectory;
use jsonrpsee::core::SubscriptionResult;
use jsonrpsee::server::{PendingSubscriptionSink, Server, ServerHandle, SubscriptionMessage};
use jsonrpsee::types::Params;
use jsonrpsee::RpcModule;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, info, warn};

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9631;

/// RPC Server Configuration
#[derive(Debug, Clone)]
pub struct RpcServerConfig {
    pub host: String,
    /// 0 binds an ephemeral port
    pub port: u16,
}

impl Default for RpcServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_RPC_HOST.to_string(),
            port: DEFAULT_RPC_PORT,
        }
    }
}

/// RPC Server
pub struct RpcServer {
    config: RpcServerConfig,
    handler: Arc<RpcHandler>,
    notifier: BroadcastNotifier,
}

impl RpcServer {
    pub fn new(
        config: RpcServerConfig,
        directory: Arc<QueueDirectory>,
        notifier: BroadcastNotifier,
    ) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(directory)),
            notifier,
        }
    }

    /// Start the JSON-RPC server, returning the bound address and its handle
    pub async fn start(self) -> Result<(SocketAddr, ServerHandle), String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;
        let local_addr = server
            .local_addr()
            .map_err(|e| format!("Failed to read bound address: {}", e))?;

        let mut module = RpcModule::new(());

        let handler = self.handler.clone();
        module
            .register_async_method("queue.join.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: JoinRequest = params.parse()?;
                    handler.join(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.leave.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: LeaveRequest = params.parse()?;
                    handler.leave(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.serve_next.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: BoothRequest = params.parse()?;
                    handler.serve_next(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.complete.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: BoothRequest = params.parse()?;
                    handler.complete(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: BoothRequest = params.parse()?;
                    handler.status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("queue.position.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: PositionRequest = params.parse()?;
                    handler.position(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        // Admin APIs
        let handler = self.handler.clone();
        module
            .register_async_method("admin.settings.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: UpdateSettingsRequest = params.parse()?;
                    handler.update_settings(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let handler = self.handler.clone();
        module
            .register_async_method("admin.status.v1", move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: UpdateStatusRequest = params.parse()?;
                    handler.update_status(req).await
                }
            })
            .map_err(|e| e.to_string())?;

        let notifier = self.notifier.clone();
        module
            .register_subscription(
                "queue.subscribe.v1",
                "queue.updated.v1",
                "queue.unsubscribe.v1",
                move |params, pending, _, _| {
                    let notifier = notifier.clone();
                    async move { stream_booth_updates(params, pending, notifier).await }
                },
            )
            .map_err(|e| e.to_string())?;

        info!(addr = %local_addr, "JSON-RPC server started");

        let handle = server.start(module);
        Ok((local_addr, handle))
    }
}

/// Forward every event for one booth until the client goes away
async fn stream_booth_updates(
    params: Params<'static>,
    pending: PendingSubscriptionSink,
    notifier: BroadcastNotifier,
) -> SubscriptionResult {
    let req: BoothRequest = match params.parse() {
        Ok(req) => req,
        Err(e) => {
            pending.reject(e).await;
            return Ok(());
        }
    };

    // Receiver first so nothing committed after accept() is missed
    let mut rx = notifier.subscribe();
    let sink = pending.accept().await?;
    debug!(booth_id = %req.booth_id, "Subscriber attached");

    loop {
        tokio::select! {
            _ = sink.closed() => break,
            msg = rx.recv() => match msg {
                Ok(event) => {
                    if event.booth_id != req.booth_id {
                        continue;
                    }
                    let message = SubscriptionMessage::from_json(&event)?;
                    if sink.send(message).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(booth_id = %req.booth_id, skipped = skipped, "Subscriber lagged, events dropped");
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    debug!(booth_id = %req.booth_id, "Subscriber detached");
    Ok(())
}
