//! Scaling executor — applies decided replica counts to workloads.

use async_trait::async_trait;

use lagscale_core::ObjectId;

/// Applies a replica count to the workload behind a scalable object.
///
/// Called at most once per tick per object. Failures are reported in the
/// tick report and retried naturally on the next tick.
#[async_trait]
pub trait ScalingExecutor: Send + Sync {
    async fn set_replicas(&self, object: &ObjectId, replicas: u32) -> anyhow::Result<()>;
}

/// Callback type for performing scaling actions.
///
/// Called with (object, target_replicas).
pub type ScaleCallback = Box<dyn Fn(&ObjectId, u32) -> BoxFuture + Send + Sync>;

/// Future returned by a [`ScaleCallback`].
pub type BoxFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = anyhow::Result<()>> + Send>>;

/// Adapts a plain callback into a `ScalingExecutor`.
pub struct CallbackExecutor {
    scale_fn: ScaleCallback,
}

impl CallbackExecutor {
    pub fn new(scale_fn: ScaleCallback) -> Self {
        Self { scale_fn }
    }
}

#[async_trait]
impl ScalingExecutor for CallbackExecutor {
    async fn set_replicas(&self, object: &ObjectId, replicas: u32) -> anyhow::Result<()> {
        (self.scale_fn)(object, replicas).await
    }
}
