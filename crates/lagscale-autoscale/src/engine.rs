//! Scale engine — owns one scale loop task per registered object.
//!
//! Registering an object that is already running swaps its configuration
//! through a watch channel; the loop picks it up on its next tick.
//! Deregistering cancels the loop and waits for the task to exit.
//! Dropping the engine cancels every loop it still owns.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, watch, RwLock};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use lagscale_core::{
    EngineConfig, EngineSettings, ObjectId, ResolvedObject, ScalableObject, ScaleError,
    ScaleResult,
};
use lagscale_trigger::{SourceRegistry, TriggerEvaluator};

use crate::executor::ScalingExecutor;
use crate::report::TickReport;
use crate::scale_loop::ScaleLoop;

/// Per-object loop state.
struct LoopSlot {
    /// Handle to the background scale loop.
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    config_tx: watch::Sender<Arc<ResolvedObject>>,
}

/// Manages scale loops for all registered scalable objects.
pub struct ScaleEngine {
    evaluator: TriggerEvaluator,
    executor: Arc<dyn ScalingExecutor>,
    settings: EngineSettings,
    /// Active loops: object id → slot.
    loops: Arc<RwLock<HashMap<ObjectId, LoopSlot>>>,
    reports: broadcast::Sender<TickReport>,
    /// Parent of every loop's token; cancelled when the engine is dropped.
    shutdown: CancellationToken,
}

impl ScaleEngine {
    /// Create an engine with no registered objects.
    pub fn new(
        registry: SourceRegistry,
        executor: Arc<dyn ScalingExecutor>,
        settings: EngineSettings,
    ) -> Self {
        let (reports, _) = broadcast::channel(settings.report_buffer.max(1));
        Self {
            evaluator: TriggerEvaluator::new(registry),
            executor,
            settings,
            loops: Arc::new(RwLock::new(HashMap::new())),
            reports,
            shutdown: CancellationToken::new(),
        }
    }

    /// Subscribe to tick reports from every loop.
    pub fn subscribe(&self) -> broadcast::Receiver<TickReport> {
        self.reports.subscribe()
    }

    /// Start scaling `object`, or reconfigure it if already registered.
    ///
    /// Invalid objects are rejected here and never reach a loop.
    pub async fn register(&self, object: &ScalableObject) -> ScaleResult<()> {
        let resolved = Arc::new(object.resolve()?);
        let id = resolved.id.clone();

        let mut loops = self.loops.write().await;
        if let Some(slot) = loops.get(&id)
            && !slot.handle.is_finished()
        {
            slot.config_tx.send_replace(resolved);
            info!(object = %id, "scalable object reconfigured");
            return Ok(());
        }

        let (config_tx, config_rx) = watch::channel(resolved);
        let cancel = self.shutdown.child_token();
        let scale_loop = ScaleLoop::new(
            config_rx,
            self.evaluator.clone(),
            self.executor.clone(),
            self.reports.clone(),
            cancel.clone(),
        )
        .with_timeout_cap(self.settings.trigger_timeout_cap());

        let handle = tokio::spawn(scale_loop.run());

        loops.insert(
            id.clone(),
            LoopSlot {
                handle,
                cancel,
                config_tx,
            },
        );

        info!(object = %id, "scalable object registered");
        Ok(())
    }

    /// Register every object in `config`.
    ///
    /// All objects are validated before any loop starts.
    pub async fn register_all(&self, config: &EngineConfig) -> ScaleResult<usize> {
        config.resolve_all()?;
        for object in &config.scaled_objects {
            self.register(object).await?;
        }
        Ok(config.scaled_objects.len())
    }

    /// Stop scaling an object and wait for its loop to exit.
    pub async fn deregister(&self, id: &ObjectId) -> ScaleResult<()> {
        let slot = self.loops.write().await.remove(id);
        let Some(slot) = slot else {
            return Err(ScaleError::NotRegistered(id.to_string()));
        };

        slot.cancel.cancel();
        if let Err(e) = slot.handle.await {
            debug!(object = %id, error = %e, "scale loop task ended abnormally");
        }
        info!(object = %id, "scalable object deregistered");
        Ok(())
    }

    /// Stop all loops (for graceful shutdown).
    pub async fn stop_all(&self) {
        let slots: Vec<(ObjectId, LoopSlot)> = self.loops.write().await.drain().collect();
        for (_, slot) in &slots {
            slot.cancel.cancel();
        }
        for (id, slot) in slots {
            if let Err(e) = slot.handle.await {
                debug!(object = %id, error = %e, "scale loop task ended abnormally");
            }
        }
        info!("all scale loops stopped");
    }

    /// Registered object ids, sorted.
    pub async fn registered(&self) -> Vec<ObjectId> {
        let loops = self.loops.read().await;
        let mut ids: Vec<ObjectId> = loops.keys().cloned().collect();
        ids.sort();
        ids
    }

    /// Whether `id` currently has a scale loop.
    pub async fn is_registered(&self, id: &ObjectId) -> bool {
        self.loops.read().await.contains_key(id)
    }
}

impl Drop for ScaleEngine {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
