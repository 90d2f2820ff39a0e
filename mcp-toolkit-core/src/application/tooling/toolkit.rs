use super::adapter::McpTool;
use super::connection::Connection;
use super::descriptor::ToolDescriptor;
use super::error::ToolkitError;
use super::interface::CallableTool;
use super::launch::LaunchSpec;
use super::protocol::ClientConnector;
use super::rpc::JsonRpcConnector;
use crate::application::lifecycle::ActiveToolkits;
use crate::config::ServerConfig;
use crate::constants::TERMINATION_GRACE;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub type ToolkitId = Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolkitState {
    Idle,
    Initializing,
    Ready,
}

/// Owns one tool server connection and the tools it offers.
///
/// Cheap to clone; clones share the same connection. The process-wide
/// [`ActiveToolkits`] registry only holds weak references, so dropping the last
/// handle drops the connection (and `kill_on_drop` stops the child).
#[derive(Clone)]
pub struct Toolkit {
    inner: Arc<ToolkitInner>,
}

pub(crate) struct ToolkitInner {
    id: ToolkitId,
    config: ServerConfig,
    connector: Arc<dyn ClientConnector>,
    registry: Arc<ActiveToolkits>,
    grace: Duration,
    init_gate: AsyncMutex<()>,
    slot: Mutex<Slot>,
}

struct Slot {
    state: ToolkitState,
    connection: Option<Arc<Connection>>,
    tools: Vec<McpTool>,
}

impl Drop for ToolkitInner {
    fn drop(&mut self) {
        self.registry.unregister(self.id);
    }
}

pub struct ToolkitBuilder {
    config: ServerConfig,
    connector: Option<Arc<dyn ClientConnector>>,
    registry: Option<Arc<ActiveToolkits>>,
    grace: Duration,
}

impl ToolkitBuilder {
    pub fn connector(mut self, connector: Arc<dyn ClientConnector>) -> Self {
        self.connector = Some(connector);
        self
    }

    /// Register in `registry` instead of the process-wide one.
    pub fn registry(mut self, registry: Arc<ActiveToolkits>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn termination_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    pub fn build(self) -> Toolkit {
        Toolkit {
            inner: Arc::new(ToolkitInner {
                id: Uuid::new_v4(),
                config: self.config,
                connector: self
                    .connector
                    .unwrap_or_else(|| Arc::new(JsonRpcConnector::default())),
                registry: self.registry.unwrap_or_else(ActiveToolkits::global),
                grace: self.grace,
                init_gate: AsyncMutex::new(()),
                slot: Mutex::new(Slot {
                    state: ToolkitState::Idle,
                    connection: None,
                    tools: Vec::new(),
                }),
            }),
        }
    }
}

impl Toolkit {
    pub fn new(config: ServerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn builder(config: ServerConfig) -> ToolkitBuilder {
        ToolkitBuilder {
            config,
            connector: None,
            registry: None,
            grace: TERMINATION_GRACE,
        }
    }

    pub(crate) fn from_inner(inner: Arc<ToolkitInner>) -> Self {
        Self { inner }
    }

    pub(crate) fn downgrade(&self) -> Weak<ToolkitInner> {
        Arc::downgrade(&self.inner)
    }

    pub fn id(&self) -> ToolkitId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.config.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    pub fn state(&self) -> ToolkitState {
        self.slot().state
    }

    /// Tools in the order the server listed them. Empty unless ready.
    pub fn tools(&self) -> Vec<McpTool> {
        self.slot().tools.clone()
    }

    pub fn tool(&self, name: &str) -> Option<McpTool> {
        self.slot()
            .tools
            .iter()
            .find(|tool| tool.name() == name)
            .cloned()
    }

    /// Tools as trait objects for an agent framework.
    pub fn callables(&self) -> Vec<Arc<dyn CallableTool>> {
        self.tools()
            .into_iter()
            .map(|tool| Arc::new(tool) as Arc<dyn CallableTool>)
            .collect()
    }

    pub fn pid(&self) -> Option<u32> {
        self.slot().connection.as_ref().and_then(|c| c.pid())
    }

    pub fn instructions(&self) -> Option<String> {
        self.slot()
            .connection
            .as_ref()
            .and_then(|c| c.instructions())
    }

    pub fn is_registered(&self) -> bool {
        self.inner.registry.contains(self.inner.id)
    }

    /// Spawn the server, list its tools and wrap each one. No-op when already ready.
    ///
    /// Any failure releases whatever was set up before the error is returned.
    pub async fn initialize(&self) -> Result<(), ToolkitError> {
        let _gate = self.inner.init_gate.lock().await;
        if self.state() == ToolkitState::Ready {
            return Ok(());
        }

        let spec = match LaunchSpec::from_config(&self.inner.config) {
            Ok(spec) => spec,
            Err(err) => {
                warn!(server = %self.name(), %err, "Invalid toolkit configuration");
                self.cleanup().await;
                return Err(err);
            }
        };

        let connection = Arc::new(
            Connection::new(self.name(), Arc::clone(&self.inner.connector))
                .with_termination_grace(self.inner.grace),
        );
        {
            let mut slot = self.slot();
            slot.state = ToolkitState::Initializing;
            slot.connection = Some(Arc::clone(&connection));
            slot.tools.clear();
        }
        self.inner.registry.register(self);

        let tools = match self.populate(&connection, &spec).await {
            Ok(tools) => tools,
            Err(err) => {
                warn!(server = %self.name(), %err, "Toolkit initialization failed");
                self.cleanup().await;
                return Err(err);
            }
        };

        let mut slot = self.slot();
        let still_ours = slot
            .connection
            .as_ref()
            .is_some_and(|current| Arc::ptr_eq(current, &connection));
        if !still_ours {
            return Err(ToolkitError::Transport {
                server: self.name().to_string(),
                message: "toolkit was cleaned up during initialization".to_string(),
            });
        }
        info!(
            server = %self.name(),
            tool_count = tools.len(),
            "Toolkit ready"
        );
        slot.state = ToolkitState::Ready;
        slot.tools = tools;
        Ok(())
    }

    async fn populate(
        &self,
        connection: &Arc<Connection>,
        spec: &LaunchSpec,
    ) -> Result<Vec<McpTool>, ToolkitError> {
        connection.connect(spec).await?;
        let listed = connection.list_tools().await?;
        debug!(server = %self.name(), listed = listed.len(), "Listed remote tools");
        let descriptors = ToolDescriptor::from_listings(self.name(), listed)?;
        Ok(descriptors
            .into_iter()
            .map(|descriptor| McpTool::new(descriptor, Arc::clone(connection)))
            .collect())
    }

    /// Release the connection and tools. Idempotent and never fails.
    ///
    /// Returns `true` when this call tore a connection down, `false` when there
    /// was nothing left to release.
    pub async fn cleanup(&self) -> bool {
        self.inner.registry.unregister(self.inner.id);

        let connection = {
            let mut slot = self.slot();
            slot.state = ToolkitState::Idle;
            slot.tools.clear();
            slot.connection.take()
        };

        match connection {
            Some(connection) => {
                let outcome = connection.close().await;
                info!(server = %self.name(), ?outcome, "Toolkit cleaned up");
                true
            }
            None => {
                debug!(server = %self.name(), "Toolkit had nothing to clean up");
                false
            }
        }
    }

    fn slot(&self) -> MutexGuard<'_, Slot> {
        self.inner.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Toolkit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Toolkit")
            .field("id", &self.inner.id)
            .field("name", &self.name())
            .field("state", &self.state())
            .finish()
    }
}
