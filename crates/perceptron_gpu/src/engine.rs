//! Data-parallel forward pass: one wgpu compute lane per record.

use std::{borrow::Cow, collections::HashMap, sync::Arc};

use perceptron_core::{
    EngineError, EngineKind, FeatureBatch, ForwardEngine, OutputBatch, ParameterVector,
};
use perceptron_shaders::{compute, find_compute_entry_point, forward_pass_source};
use tracing::{debug, info};
use wgpu::{
    BindGroupLayout, BindGroupLayoutDescriptor, BindGroupLayoutEntry, BindingType,
    BufferBindingType, CommandEncoderDescriptor, ComputePassDescriptor, ComputePipeline,
    ComputePipelineDescriptor, ErrorFilter, PipelineLayout, PipelineLayoutDescriptor,
    ShaderModuleDescriptor, ShaderSource, ShaderStages,
};

use crate::{dispatch::DispatchPlan, staging::StagedBatch, GpuContext};

/// Runs the forward pass on the shared compute device.
///
/// Pipelines are built once per workgroup size and kept for later calls; the
/// buffers of a call never outlive it.
pub struct ParallelEngine {
    context: Arc<GpuContext>,
    bind_group_layout: BindGroupLayout,
    pipeline_layout: PipelineLayout,
    pipelines: HashMap<u32, ComputePipeline>,
    max_group_size: u32,
}

impl ParallelEngine {
    /// Builds an engine on the process-wide device, failing fast when no
    /// device or kernel is available.
    pub fn new() -> Result<Self, EngineError> {
        Self::with_context(GpuContext::shared()?)
    }

    pub fn with_context(context: Arc<GpuContext>) -> Result<Self, EngineError> {
        let device = &context.device;
        let storage_entry = |binding, read_only| BindGroupLayoutEntry {
            binding,
            visibility: ShaderStages::COMPUTE,
            ty: BindingType::Buffer {
                ty: BufferBindingType::Storage { read_only },
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        };
        let bind_group_layout = device.create_bind_group_layout(&BindGroupLayoutDescriptor {
            label: Some("forward_pass_bind_group_layout"),
            entries: &[
                storage_entry(0, true),
                storage_entry(1, true),
                storage_entry(2, true),
                storage_entry(3, false),
            ],
        });
        let pipeline_layout = device.create_pipeline_layout(&PipelineLayoutDescriptor {
            label: Some("forward_pass_pipeline_layout"),
            bind_group_layouts: &[&bind_group_layout],
            push_constant_ranges: &[],
        });

        let max_group_size = context.max_group_size();
        let mut engine = Self {
            context,
            bind_group_layout,
            pipeline_layout,
            pipelines: HashMap::new(),
            max_group_size,
        };
        // Resolve the kernel up front so a broken shader aborts before any run.
        engine.ensure_pipeline(max_group_size)?;
        Ok(engine)
    }

    /// Caps the workgroup size below the device maximum.
    pub fn with_max_group_size(mut self, limit: u32) -> Self {
        self.max_group_size = self.max_group_size.min(limit.max(1));
        self
    }

    pub fn max_group_size(&self) -> u32 {
        self.max_group_size
    }

    pub fn context(&self) -> &Arc<GpuContext> {
        &self.context
    }

    /// Partition used for a batch of `records` records.
    pub fn plan(&self, records: usize) -> Result<DispatchPlan, EngineError> {
        DispatchPlan::new(
            records,
            self.max_group_size,
            self.context.max_groups_per_dimension(),
        )
    }

    fn ensure_pipeline(&mut self, group_size: u32) -> Result<(), EngineError> {
        if !self.pipelines.contains_key(&group_size) {
            let pipeline = self.build_pipeline(group_size)?;
            self.pipelines.insert(group_size, pipeline);
        }
        Ok(())
    }

    fn build_pipeline(&self, group_size: u32) -> Result<ComputePipeline, EngineError> {
        let source =
            forward_pass_source(group_size).map_err(|err| resolution_error(err.to_string()))?;
        let declared = find_compute_entry_point(&source, compute::FORWARD_PASS_ENTRY)
            .map_err(|err| resolution_error(err.to_string()))?;
        if declared[0] != group_size {
            return Err(resolution_error(format!(
                "kernel declares {} lanes per group, expected {group_size}",
                declared[0]
            )));
        }

        let device = &self.context.device;
        device.push_error_scope(ErrorFilter::Validation);
        let module = device.create_shader_module(ShaderModuleDescriptor {
            label: Some("forward_pass.wgsl"),
            source: ShaderSource::Wgsl(Cow::Owned(source)),
        });
        let pipeline = device.create_compute_pipeline(&ComputePipelineDescriptor {
            label: Some("forward_pass_pipeline"),
            layout: Some(&self.pipeline_layout),
            module: &module,
            entry_point: Some(compute::FORWARD_PASS_ENTRY),
            compilation_options: Default::default(),
            cache: None,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(resolution_error(err.to_string()));
        }

        debug!(group_size, "built forward-pass pipeline");
        Ok(pipeline)
    }
}

impl ForwardEngine for ParallelEngine {
    fn kind(&self) -> EngineKind {
        EngineKind::Parallel
    }

    fn compute(
        &mut self,
        batch: &FeatureBatch,
        params: &ParameterVector,
    ) -> Result<OutputBatch, EngineError> {
        params.check_compatible(batch)?;
        let plan = self.plan(batch.record_count())?;
        info!(
            records = plan.lanes,
            features = batch.feature_count(),
            group_size = plan.group_size,
            groups_x = plan.groups_x,
            groups_y = plan.groups_y,
            "dispatching forward pass"
        );

        self.ensure_pipeline(plan.group_size)?;
        let pipeline = self.pipelines.get(&plan.group_size).ok_or_else(|| {
            resolution_error(format!("no pipeline cached for {} lanes", plan.group_size))
        })?;

        let staged = StagedBatch::upload(&self.context, batch, params)?;
        let bind_group = staged.bind_group(&self.context, &self.bind_group_layout);

        let mut encoder = self
            .context
            .device
            .create_command_encoder(&CommandEncoderDescriptor {
                label: Some("forward_pass_encoder"),
            });
        {
            let mut pass = encoder.begin_compute_pass(&ComputePassDescriptor {
                label: Some("forward_pass"),
                timestamp_writes: None,
            });
            pass.set_pipeline(pipeline);
            pass.set_bind_group(0, &bind_group, &[]);
            pass.dispatch_workgroups(plan.groups_x, plan.groups_y, 1);
        }
        staged.encode_readback(&mut encoder);
        self.context.queue.submit(Some(encoder.finish()));

        let outputs = staged.read_outputs(&self.context)?;
        if outputs.len() != batch.record_count() {
            return Err(EngineError::shape(
                "forward pass outputs",
                batch.record_count(),
                outputs.len(),
            ));
        }
        Ok(OutputBatch::from(outputs))
    }
}

fn resolution_error(reason: String) -> EngineError {
    EngineError::KernelResolution {
        entry_point: compute::FORWARD_PASS_ENTRY.to_string(),
        reason,
    }
}
