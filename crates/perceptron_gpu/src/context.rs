//! Process-wide wgpu device context.

use std::sync::{Arc, OnceLock};

use perceptron_core::EngineError;
use tracing::{info, warn};
use wgpu::{
    Adapter, AdapterInfo, Backends, Device, DeviceDescriptor, Features, Instance,
    InstanceDescriptor, Limits, MemoryHints, PowerPreference, Queue, RequestAdapterOptions,
};

/// Adapter, device and queue shared by every [`crate::ParallelEngine`].
pub struct GpuContext {
    pub adapter: Adapter,
    pub device: Device,
    pub queue: Queue,
}

static SHARED: OnceLock<Result<Arc<GpuContext>, EngineError>> = OnceLock::new();

impl GpuContext {
    /// Returns the process-wide context, creating it on first use.
    ///
    /// A creation failure is remembered; later callers get the same error
    /// without probing the system again.
    pub fn shared() -> Result<Arc<GpuContext>, EngineError> {
        SHARED
            .get_or_init(|| {
                let result = pollster::block_on(Self::new_async()).map(Arc::new);
                if let Err(err) = &result {
                    warn!(%err, "compute device initialisation failed");
                }
                result
            })
            .clone()
    }

    /// Creates a fresh context on the highest-performance adapter available.
    pub async fn new_async() -> Result<Self, EngineError> {
        let instance = Instance::new(&InstanceDescriptor {
            backends: Backends::all(),
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&RequestAdapterOptions {
                power_preference: PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .map_err(|err| {
                EngineError::DeviceUnavailable(format!("no compatible GPU adapter found: {err}"))
            })?;

        // Ask for everything the adapter offers so large batches fit in one binding.
        let required_limits = adapter.limits();
        let (device, queue) = adapter
            .request_device(&DeviceDescriptor {
                label: Some("perceptron_device"),
                required_features: Features::empty(),
                required_limits,
                memory_hints: MemoryHints::Performance,
                ..Default::default()
            })
            .await
            .map_err(|err| {
                EngineError::DeviceUnavailable(format!("failed to request wgpu device: {err}"))
            })?;

        let context = Self {
            adapter,
            device,
            queue,
        };
        let adapter_info = context.adapter_info();
        info!(
            adapter = %adapter_info.name,
            backend = ?adapter_info.backend,
            max_group_size = context.max_group_size(),
            max_buffer_bytes = context.max_binding_bytes(),
            "compute device ready"
        );
        Ok(context)
    }

    pub fn adapter_info(&self) -> AdapterInfo {
        self.adapter.get_info()
    }

    pub fn limits(&self) -> Limits {
        self.device.limits()
    }

    /// Largest number of lanes one workgroup may hold on this device.
    pub fn max_group_size(&self) -> u32 {
        let limits = self.limits();
        limits
            .max_compute_invocations_per_workgroup
            .min(limits.max_compute_workgroup_size_x)
            .max(1)
    }

    /// Workgroups allowed along each dispatch dimension.
    pub fn max_groups_per_dimension(&self) -> u32 {
        self.limits().max_compute_workgroups_per_dimension.max(1)
    }

    /// Largest buffer that can be both allocated and bound as storage.
    pub fn max_binding_bytes(&self) -> u64 {
        let limits = self.limits();
        limits
            .max_buffer_size
            .min(u64::from(limits.max_storage_buffer_binding_size))
    }
}
