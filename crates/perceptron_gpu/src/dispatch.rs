//! Work partitioning for the one-lane-per-record dispatch.

use perceptron_core::EngineError;

/// How `lanes` records are grouped into workgroups and laid out on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchPlan {
    /// One lane per record.
    pub lanes: u32,
    /// Lanes per workgroup; never larger than `lanes` or the device maximum.
    pub group_size: u32,
    pub groups_x: u32,
    pub groups_y: u32,
}

impl DispatchPlan {
    /// Plans a dispatch covering `records` lanes.
    ///
    /// The grid only grows into `y` once `groups_x` hits `max_groups_per_dim`.
    pub fn new(
        records: usize,
        max_group_size: u32,
        max_groups_per_dim: u32,
    ) -> Result<Self, EngineError> {
        let lanes = u32::try_from(records).map_err(|_| too_large(records, "exceeds u32 lanes"))?;
        if lanes == 0 {
            return Err(EngineError::shape("dispatch lanes", 1, 0));
        }
        let group_size = max_group_size.max(1).min(lanes);
        let max_groups_per_dim = max_groups_per_dim.max(1);

        let total_groups = lanes.div_ceil(group_size);
        let groups_x = total_groups.min(max_groups_per_dim);
        let groups_y = total_groups.div_ceil(groups_x);
        if groups_y > max_groups_per_dim {
            return Err(too_large(records, "exceeds the device's 2-D dispatch grid"));
        }

        Ok(Self {
            lanes,
            group_size,
            groups_x,
            groups_y,
        })
    }

    pub fn group_count(&self) -> u64 {
        u64::from(self.groups_x) * u64::from(self.groups_y)
    }

    /// Invocations the device actually runs; lanes past `lanes` exit immediately.
    pub fn scheduled_lanes(&self) -> u64 {
        self.group_count() * u64::from(self.group_size)
    }
}

fn too_large(records: usize, reason: &str) -> EngineError {
    EngineError::Allocation {
        label: "forward_pass_dispatch".into(),
        bytes: records as u64 * std::mem::size_of::<f32>() as u64,
        reason: format!("{records} records {reason}"),
    }
}
