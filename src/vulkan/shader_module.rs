use std::{ffi::CStr, io::Cursor, path::Path, sync::Arc};

use ash::vk;

use super::context::Context;
use crate::error::RenderError;

const SHADER_ENTRY_NAME: &CStr = unsafe { CStr::from_bytes_with_nul_unchecked(b"main\0") };

/// Compiled SPIR-V for one pipeline stage. The module lives as long as this value.
pub struct ShaderModule {
    context: Arc<Context>,
    inner: vk::ShaderModule,
    stage: vk::ShaderStageFlags,
}

impl ShaderModule {
    /// Loads `<out dir>/shaders/<name>.spv` as written by the build script.
    pub fn load(
        context: Arc<Context>,
        stage: vk::ShaderStageFlags,
        name: &str,
    ) -> Result<Self, RenderError> {
        let path = Path::new(env!("OUT_DIR"))
            .join("shaders")
            .join(format!("{name}.spv"));

        let shader_load_error = |source| RenderError::ShaderLoad {
            path: path.clone(),
            source,
        };

        let bytes = std::fs::read(&path).map_err(shader_load_error)?;
        let shader_code =
            ash::util::read_spv(&mut Cursor::new(&bytes[..])).map_err(shader_load_error)?;

        let inner = {
            let create_info = vk::ShaderModuleCreateInfo::builder().code(&shader_code);
            unsafe { context.device.create_shader_module(&create_info, None) }
                .expect("Could not create shader module")
        };

        Ok(Self {
            context,
            inner,
            stage,
        })
    }

    pub fn stage_create_info(&self) -> vk::PipelineShaderStageCreateInfo {
        vk::PipelineShaderStageCreateInfo::builder()
            .module(self.inner)
            .name(SHADER_ENTRY_NAME)
            .stage(self.stage)
            .build()
    }
}

impl Drop for ShaderModule {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_shader_module(self.inner, None);
        }
    }
}
