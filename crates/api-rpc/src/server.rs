//! JSON-RPC Server
//!
//! Binds the queue methods on localhost TCP. Only 127.0.0.1 is ever bound;
//! exposing the engine beyond the machine is a reverse proxy's job.

use crate::handler::RpcHandler;
use crate::types::{
    ClaimRequest, GenerateRequest, HistoryRequest, JoinRequest, NextRequest, PauseRequest,
    ResetRequest, SkipRequest, StatusRequest, WaitTimeRequest,
};
use jsonrpsee::server::{Server, ServerHandle};
use jsonrpsee::RpcModule;
use std::sync::Arc;
use tracing::info;
use waitless_core::application::QueueService;

const DEFAULT_RPC_HOST: &str = "127.0.0.1";
const DEFAULT_RPC_PORT: u16 = 9530;

/// RPC Server Configuration
pub struct RpcServerConfig {
    pub host: String,
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
}

macro_rules! register {
    ($module:expr, $handler:expr, $name:literal, $req:ty, $method:ident) => {{
        let handler = $handler.clone();
        $module
            .register_async_method($name, move |params, _, _| {
                let handler = handler.clone();
                async move {
                    let req: $req = params.parse()?;
                    handler.$method(req).await
                }
            })
            .map_err(|e| e.to_string())?;
    }};
}

impl RpcServer {
    pub fn new(config: RpcServerConfig, service: Arc<QueueService>) -> Self {
        Self {
            config,
            handler: Arc::new(RpcHandler::new(service)),
        }
    }

    /// Start the JSON-RPC server
    pub async fn start(self) -> Result<ServerHandle, String> {
        let addr = format!("{}:{}", self.config.host, self.config.port);

        info!(
            host = %self.config.host,
            port = %self.config.port,
            "Starting JSON-RPC server on TCP (localhost only)"
        );

        let server = Server::builder()
            .build(&addr)
            .await
            .map_err(|e| format!("Failed to build server on {}: {}", addr, e))?;

        let mut module = RpcModule::new(());

        register!(module, self.handler, "queue.status.v1", StatusRequest, status);
        register!(module, self.handler, "queue.join.v1", JoinRequest, join);
        register!(module, self.handler, "queue.next.v1", NextRequest, next);
        register!(module, self.handler, "queue.skip.v1", SkipRequest, skip);
        register!(module, self.handler, "queue.generate.v1", GenerateRequest, generate);
        register!(module, self.handler, "queue.claim.v1", ClaimRequest, claim);
        register!(module, self.handler, "queue.pause.v1", PauseRequest, pause);
        register!(module, self.handler, "queue.resume.v1", PauseRequest, resume);
        register!(module, self.handler, "queue.waitTime.v1", WaitTimeRequest, wait_time);
        register!(module, self.handler, "queue.reset.v1", ResetRequest, reset);
        register!(module, self.handler, "queue.history.v1", HistoryRequest, history);

        info!("JSON-RPC server started successfully");

        let handle = server.start(module);
        Ok(handle)
    }
}
