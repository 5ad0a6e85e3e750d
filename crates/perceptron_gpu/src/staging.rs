//! Device buffers for one forward-pass call, and the typed readback boundary.

use std::{mem::size_of, sync::mpsc};

use perceptron_core::{EngineError, FeatureBatch, ParameterVector, Scalar};
use tracing::debug;
use wgpu::{
    util::{BufferInitDescriptor, DeviceExt},
    BindGroup, BindGroupDescriptor, BindGroupEntry, BindGroupLayout, Buffer, BufferDescriptor,
    BufferUsages, CommandEncoder, ErrorFilter, MapMode, PollType,
};

use crate::GpuContext;

const SCALAR_BYTES: u64 = size_of::<Scalar>() as u64;

/// Input, parameter, output and readback buffers for a single batch.
///
/// Created per `compute` call and dropped once results are back on the host.
pub struct StagedBatch {
    inputs: Buffer,
    weights: Buffer,
    biases: Buffer,
    outputs: Buffer,
    readback: Buffer,
    records: usize,
}

impl StagedBatch {
    /// Uploads `batch` and `params` and allocates a zeroed output of one float per record.
    pub fn upload(
        context: &GpuContext,
        batch: &FeatureBatch,
        params: &ParameterVector,
    ) -> Result<Self, EngineError> {
        params.check_compatible(batch)?;
        let records = batch.record_count();
        let expected_inputs = records * batch.feature_count();
        if batch.as_slice().len() != expected_inputs {
            return Err(EngineError::shape(
                "input staging",
                expected_inputs,
                batch.as_slice().len(),
            ));
        }

        let max_bytes = context.max_binding_bytes();
        let input_bytes = byte_len(expected_inputs);
        let output_bytes = byte_len(records);
        for (label, bytes) in [
            ("forward_pass_inputs", input_bytes),
            ("forward_pass_outputs", output_bytes),
        ] {
            if bytes > max_bytes {
                return Err(EngineError::Allocation {
                    label: label.into(),
                    bytes,
                    reason: format!("exceeds the device binding limit of {max_bytes} bytes"),
                });
            }
        }

        let device = &context.device;
        device.push_error_scope(ErrorFilter::OutOfMemory);
        let inputs = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("forward_pass_inputs"),
            contents: bytemuck::cast_slice(batch.as_slice()),
            usage: BufferUsages::STORAGE,
        });
        let weights = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("forward_pass_weights"),
            contents: bytemuck::cast_slice(params.weights()),
            usage: BufferUsages::STORAGE,
        });
        let biases = device.create_buffer_init(&BufferInitDescriptor {
            label: Some("forward_pass_biases"),
            contents: bytemuck::bytes_of(&params.bias()),
            usage: BufferUsages::STORAGE,
        });
        let outputs = device.create_buffer(&BufferDescriptor {
            label: Some("forward_pass_outputs"),
            size: output_bytes,
            usage: BufferUsages::STORAGE | BufferUsages::COPY_SRC,
            mapped_at_creation: false,
        });
        let readback = device.create_buffer(&BufferDescriptor {
            label: Some("forward_pass_readback"),
            size: output_bytes,
            usage: BufferUsages::MAP_READ | BufferUsages::COPY_DST,
            mapped_at_creation: false,
        });
        if let Some(err) = pollster::block_on(device.pop_error_scope()) {
            return Err(EngineError::Allocation {
                label: "forward_pass_buffers".into(),
                bytes: input_bytes + 2 * output_bytes,
                reason: err.to_string(),
            });
        }

        debug!(records, input_bytes, output_bytes, "staged forward-pass buffers");
        Ok(Self {
            inputs,
            weights,
            biases,
            outputs,
            readback,
            records,
        })
    }

    /// Binds the buffers in kernel order: inputs, weights, biases, outputs.
    pub fn bind_group(&self, context: &GpuContext, layout: &BindGroupLayout) -> BindGroup {
        context.device.create_bind_group(&BindGroupDescriptor {
            label: Some("forward_pass_bind_group"),
            layout,
            entries: &[
                BindGroupEntry {
                    binding: 0,
                    resource: self.inputs.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 1,
                    resource: self.weights.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 2,
                    resource: self.biases.as_entire_binding(),
                },
                BindGroupEntry {
                    binding: 3,
                    resource: self.outputs.as_entire_binding(),
                },
            ],
        })
    }

    /// Records the output → readback copy after the compute pass.
    pub fn encode_readback(&self, encoder: &mut CommandEncoder) {
        encoder.copy_buffer_to_buffer(
            &self.outputs,
            0,
            &self.readback,
            0,
            byte_len(self.records),
        );
    }

    /// Blocks until the submitted work has finished, then copies the results out.
    pub fn read_outputs(self, context: &GpuContext) -> Result<Vec<Scalar>, EngineError> {
        let slice = self.readback.slice(..);
        let (sender, receiver) = mpsc::channel();
        slice.map_async(MapMode::Read, move |result| {
            let _ = sender.send(result);
        });
        context
            .device
            .poll(PollType::Wait)
            .map_err(|err| EngineError::Readback(err.to_string()))?;
        receiver
            .recv()
            .map_err(|err| EngineError::Readback(err.to_string()))?
            .map_err(|err| EngineError::Readback(err.to_string()))?;

        let values = {
            let data = slice.get_mapped_range();
            floats_from_bytes(&data, self.records)
        };
        self.readback.unmap();
        values
    }
}

/// Converts a mapped byte range into exactly `expected` floats.
pub fn floats_from_bytes(bytes: &[u8], expected: usize) -> Result<Vec<Scalar>, EngineError> {
    let expected_bytes = expected * size_of::<Scalar>();
    if bytes.len() != expected_bytes {
        return Err(EngineError::shape(
            "output readback bytes",
            expected_bytes,
            bytes.len(),
        ));
    }
    let values: &[Scalar] = bytemuck::try_cast_slice(bytes)
        .map_err(|err| EngineError::Readback(format!("unaligned result range: {err}")))?;
    Ok(values.to_vec())
}

fn byte_len(values: usize) -> u64 {
    values as u64 * SCALAR_BYTES
}
