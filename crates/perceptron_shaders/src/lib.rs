//! Centralized storage for WGSL shader sources and shader-related helpers.

use naga::{
    valid::{Capabilities, ValidationFlags, Validator},
    ShaderStage,
};
use thiserror::Error;

pub mod compute {
    /// Forward-pass kernel with the default workgroup size baked in.
    pub const FORWARD_PASS: &str = include_str!("kernels/forward_pass.wgsl");
    /// Entry point the device pipeline binds.
    pub const FORWARD_PASS_ENTRY: &str = "forward_pass";
    /// Workgroup size written in [`FORWARD_PASS`].
    pub const DEFAULT_WORKGROUP_SIZE: u32 = 64;
}

const WORKGROUP_SIZE_DECL: &str = "const WORKGROUP_SIZE: u32 = 64u;";

#[derive(Debug, Error)]
pub enum KernelLookupError {
    #[error("WGSL parse error:\n{0}")]
    Parse(String),
    #[error("WGSL validation error:\n{0}")]
    Validation(String),
    #[error("no compute entry point named '{0}'")]
    MissingEntryPoint(String),
    #[error("workgroup size must be at least 1")]
    EmptyWorkgroup,
}

/// Returns the forward-pass kernel specialised to `workgroup_size` lanes per group.
///
/// WGSL fixes `@workgroup_size` at pipeline creation, so each group size gets
/// its own source.
pub fn forward_pass_source(workgroup_size: u32) -> Result<String, KernelLookupError> {
    if workgroup_size == 0 {
        return Err(KernelLookupError::EmptyWorkgroup);
    }
    Ok(compute::FORWARD_PASS.replacen(
        WORKGROUP_SIZE_DECL,
        &format!("const WORKGROUP_SIZE: u32 = {workgroup_size}u;"),
        1,
    ))
}

/// Parses and validates `source`, then looks up the compute entry point `name`.
///
/// Returns the entry point's declared workgroup size.
pub fn find_compute_entry_point(source: &str, name: &str) -> Result<[u32; 3], KernelLookupError> {
    let module = naga::front::wgsl::parse_str(source)
        .map_err(|err| KernelLookupError::Parse(err.emit_to_string(source)))?;
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| KernelLookupError::Validation(err.into_inner().to_string()))?;

    module
        .entry_points
        .iter()
        .find(|ep| ep.name == name && ep.stage == ShaderStage::Compute)
        .map(|ep| ep.workgroup_size)
        .ok_or_else(|| KernelLookupError::MissingEntryPoint(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validate_wgsl(label: &str, source: &str) {
        let module =
            naga::front::wgsl::parse_str(source).unwrap_or_else(|err| panic!("{label}: {err:?}"));
        let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
        validator
            .validate(&module)
            .unwrap_or_else(|err| panic!("{label}: {err:?}"));
    }

    #[test]
    fn compute_shader_validates() {
        validate_wgsl("forward_pass", compute::FORWARD_PASS);
    }

    #[test]
    fn default_source_declares_default_workgroup() {
        assert!(compute::FORWARD_PASS.contains(WORKGROUP_SIZE_DECL));
        let size =
            find_compute_entry_point(compute::FORWARD_PASS, compute::FORWARD_PASS_ENTRY).unwrap();
        assert_eq!(size, [compute::DEFAULT_WORKGROUP_SIZE, 1, 1]);
    }

    #[test]
    fn specialised_sources_carry_requested_workgroup() {
        for lanes in [1, 17, 256] {
            let source = forward_pass_source(lanes).unwrap();
            validate_wgsl("forward_pass_specialised", &source);
            let size = find_compute_entry_point(&source, compute::FORWARD_PASS_ENTRY).unwrap();
            assert_eq!(size, [lanes, 1, 1]);
        }
        assert!(matches!(
            forward_pass_source(0),
            Err(KernelLookupError::EmptyWorkgroup)
        ));
    }

    #[test]
    fn missing_entry_point_is_reported() {
        let err = find_compute_entry_point(compute::FORWARD_PASS, "backward_pass").unwrap_err();
        assert!(matches!(err, KernelLookupError::MissingEntryPoint(name) if name == "backward_pass"));
    }

    #[test]
    fn malformed_source_is_reported() {
        let err = find_compute_entry_point("fn broken( {", "forward_pass").unwrap_err();
        assert!(matches!(err, KernelLookupError::Parse(_)));
    }
}
