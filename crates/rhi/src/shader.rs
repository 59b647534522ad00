//! SPIR-V loading and shader module creation.

use std::ffi::CString;
use std::path::Path;
use std::sync::Arc;

use ash::vk;
use tracing::{debug, info};

use crate::device::Device;
use crate::error::{RhiError, RhiResult};

/// SPIR-V magic number (first word of every valid module).
const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Shader stage type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader stage
    Vertex,
    /// Fragment shader stage
    Fragment,
}

impl ShaderStage {
    /// Converts the shader stage to Vulkan shader stage flags.
    pub fn to_vk_stage(self) -> vk::ShaderStageFlags {
        match self {
            ShaderStage::Vertex => vk::ShaderStageFlags::VERTEX,
            ShaderStage::Fragment => vk::ShaderStageFlags::FRAGMENT,
        }
    }

    /// Returns a human-readable name for the shader stage.
    pub fn name(self) -> &'static str {
        match self {
            ShaderStage::Vertex => "vertex",
            ShaderStage::Fragment => "fragment",
        }
    }
}

impl std::fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Vulkan shader module wrapper.
///
/// Holds the VkShaderModule, its stage, and the entry point name the
/// pipeline stage info must reference.
pub struct Shader {
    /// Reference to the logical device.
    device: Arc<Device>,
    /// Vulkan shader module handle.
    module: vk::ShaderModule,
    /// Shader stage type.
    stage: ShaderStage,
    /// Entry point function name.
    entry_point: CString,
}

impl Shader {
    /// Creates a shader module from a SPIR-V file on disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, the contents are not
    /// valid SPIR-V, or module creation fails.
    pub fn from_spirv_file(
        device: Arc<Device>,
        path: &Path,
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        debug!("Loading {} shader from {:?}", stage, path);

        let bytes = std::fs::read(path).map_err(|e| {
            RhiError::ShaderError(format!("Failed to read shader file {:?}: {}", path, e))
        })?;

        Self::from_spirv_bytes(device, &bytes, stage, entry_point)
    }

    /// Creates a shader module from in-memory SPIR-V bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the byte length is not a multiple of 4, the
    /// SPIR-V magic number is missing, the entry point name contains an
    /// interior NUL, or module creation fails.
    pub fn from_spirv_bytes(
        device: Arc<Device>,
        bytes: &[u8],
        stage: ShaderStage,
        entry_point: &str,
    ) -> RhiResult<Self> {
        let code = validate_spirv(bytes)?;

        let create_info = vk::ShaderModuleCreateInfo::default().code(&code);

        let module = unsafe { device.handle().create_shader_module(&create_info, None)? };

        let entry_point_cstring = CString::new(entry_point)
            .map_err(|e| RhiError::ShaderError(format!("Invalid entry point name: {}", e)))?;

        info!(
            "Created {} shader module ({} words, entry point '{}')",
            stage,
            code.len(),
            entry_point
        );

        Ok(Self {
            device,
            module,
            stage,
            entry_point: entry_point_cstring,
        })
    }

    /// Returns the Vulkan shader module handle.
    #[inline]
    pub fn handle(&self) -> vk::ShaderModule {
        self.module
    }

    /// Returns the shader stage.
    #[inline]
    pub fn stage(&self) -> ShaderStage {
        self.stage
    }

    /// Returns the entry point function name.
    #[inline]
    pub fn entry_point(&self) -> &std::ffi::CStr {
        &self.entry_point
    }

    /// Builds the pipeline stage info for this shader.
    ///
    /// The returned structure borrows from this shader and must not outlive
    /// it.
    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo<'_> {
        vk::PipelineShaderStageCreateInfo::default()
            .stage(self.stage.to_vk_stage())
            .module(self.module)
            .name(&self.entry_point)
    }
}

impl Drop for Shader {
    fn drop(&mut self) {
        unsafe {
            self.device
                .handle()
                .destroy_shader_module(self.module, None);
        }
        debug!("Destroyed {} shader module", self.stage);
    }
}

/// Validates raw bytes as SPIR-V and repacks them into little-endian words.
fn validate_spirv(bytes: &[u8]) -> Result<Vec<u32>, RhiError> {
    if bytes.is_empty() || !bytes.len().is_multiple_of(4) {
        return Err(RhiError::ShaderError(format!(
            "SPIR-V code must be a non-empty multiple of 4 bytes, got {} bytes",
            bytes.len()
        )));
    }

    let code: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    if code[0] != SPIRV_MAGIC {
        return Err(RhiError::ShaderError(format!(
            "Not a SPIR-V module: bad magic 0x{:08x}",
            code[0]
        )));
    }

    Ok(code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_to_vk_flags() {
        assert_eq!(
            ShaderStage::Vertex.to_vk_stage(),
            vk::ShaderStageFlags::VERTEX
        );
        assert_eq!(
            ShaderStage::Fragment.to_vk_stage(),
            vk::ShaderStageFlags::FRAGMENT
        );
    }

    #[test]
    fn stage_display() {
        assert_eq!(format!("{}", ShaderStage::Vertex), "vertex");
        assert_eq!(format!("{}", ShaderStage::Fragment), "fragment");
    }

    #[test]
    fn spirv_rejects_misaligned_bytes() {
        let misaligned = vec![0u8; 5];
        assert!(validate_spirv(&misaligned).is_err());
    }

    #[test]
    fn spirv_rejects_empty_input() {
        assert!(validate_spirv(&[]).is_err());
    }

    #[test]
    fn spirv_rejects_bad_magic() {
        let bogus = [0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0];
        assert!(validate_spirv(&bogus).is_err());
    }

    #[test]
    fn spirv_accepts_magic_header() {
        // Minimal header: magic, version 1.0, zero generator/bound/schema.
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&SPIRV_MAGIC.to_le_bytes());
        bytes.extend_from_slice(&0x0001_0000u32.to_le_bytes());
        bytes.extend_from_slice(&[0u8; 12]);

        let code = validate_spirv(&bytes).unwrap();
        assert_eq!(code.len(), 5);
        assert_eq!(code[0], SPIRV_MAGIC);
    }
}
