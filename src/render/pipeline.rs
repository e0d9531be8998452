use std::sync::Arc;

use ash::vk;
use log::info;

use super::shader_groups::ShaderGroup;
use super::shader_types::PushConstants;
use crate::error::RenderError;
use crate::vulkan::context::Context;
use crate::vulkan::shader_module::ShaderModule;

pub const PUSH_CONSTANT_STAGES: vk::ShaderStageFlags = vk::ShaderStageFlags::from_raw(
    vk::ShaderStageFlags::RAYGEN_KHR.as_raw() | vk::ShaderStageFlags::MISS_KHR.as_raw(),
);

/// Shader stages of one group, as indices into the stage list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct GroupStages {
    general: u32,
    closest_hit: u32,
    intersection: u32,
}

impl GroupStages {
    const fn general(stage: u32) -> Self {
        Self {
            general: stage,
            closest_hit: vk::SHADER_UNUSED_KHR,
            intersection: vk::SHADER_UNUSED_KHR,
        }
    }
}

/// Stage files in pipeline order
const STAGES: [(&str, vk::ShaderStageFlags); 7] = [
    ("raygen.rgen", vk::ShaderStageFlags::RAYGEN_KHR),
    ("miss.rmiss", vk::ShaderStageFlags::MISS_KHR),
    ("triangles.rchit", vk::ShaderStageFlags::CLOSEST_HIT_KHR),
    ("sphere.rint", vk::ShaderStageFlags::INTERSECTION_KHR),
    ("sphere.rchit", vk::ShaderStageFlags::CLOSEST_HIT_KHR),
    ("box.rint", vk::ShaderStageFlags::INTERSECTION_KHR),
    ("box.rchit", vk::ShaderStageFlags::CLOSEST_HIT_KHR),
];

fn group_stages(group: ShaderGroup) -> GroupStages {
    match group {
        ShaderGroup::RayGen => GroupStages::general(0),
        ShaderGroup::Miss => GroupStages::general(1),
        ShaderGroup::TrianglesHitGroup => GroupStages {
            general: vk::SHADER_UNUSED_KHR,
            closest_hit: 2,
            intersection: vk::SHADER_UNUSED_KHR,
        },
        ShaderGroup::SphereHitGroup => GroupStages {
            general: vk::SHADER_UNUSED_KHR,
            closest_hit: 4,
            intersection: 3,
        },
        ShaderGroup::BoxHitGroup => GroupStages {
            general: vk::SHADER_UNUSED_KHR,
            closest_hit: 6,
            intersection: 5,
        },
    }
}

fn group_type(group: ShaderGroup) -> vk::RayTracingShaderGroupTypeKHR {
    match group {
        ShaderGroup::RayGen | ShaderGroup::Miss => vk::RayTracingShaderGroupTypeKHR::GENERAL,
        ShaderGroup::TrianglesHitGroup => vk::RayTracingShaderGroupTypeKHR::TRIANGLES_HIT_GROUP,
        ShaderGroup::SphereHitGroup | ShaderGroup::BoxHitGroup => {
            vk::RayTracingShaderGroupTypeKHR::PROCEDURAL_HIT_GROUP
        }
    }
}

fn shader_group_create_infos() -> Vec<vk::RayTracingShaderGroupCreateInfoKHR> {
    ShaderGroup::ALL
        .iter()
        .map(|&group| {
            let stages = group_stages(group);
            vk::RayTracingShaderGroupCreateInfoKHR::builder()
                .ty(group_type(group))
                .general_shader(stages.general)
                .closest_hit_shader(stages.closest_hit)
                .any_hit_shader(vk::SHADER_UNUSED_KHR)
                .intersection_shader(stages.intersection)
                .build()
        })
        .collect()
}

pub struct RayTracingPipeline {
    pub inner: vk::Pipeline,
    pub layout: vk::PipelineLayout,
    context: Arc<Context>,
}

impl RayTracingPipeline {
    pub fn new(
        context: Arc<Context>,
        descriptor_set_layout: vk::DescriptorSetLayout,
    ) -> Result<Self, RenderError> {
        context.check_push_constant_size(PushConstants::SIZE)?;
        let device = &context.device;

        let shader_modules = STAGES
            .iter()
            .map(|&(name, stage)| ShaderModule::load(context.clone(), stage, name))
            .collect::<Result<Vec<_>, _>>()?;
        let shader_stages: Vec<vk::PipelineShaderStageCreateInfo> = shader_modules
            .iter()
            .map(ShaderModule::stage_create_info)
            .collect();
        let shader_groups = shader_group_create_infos();

        let push_constant_range = vk::PushConstantRange {
            stage_flags: PUSH_CONSTANT_STAGES,
            offset: 0,
            size: PushConstants::SIZE,
        };

        let layout_create_info = vk::PipelineLayoutCreateInfo::builder()
            .set_layouts(std::slice::from_ref(&descriptor_set_layout))
            .push_constant_ranges(std::slice::from_ref(&push_constant_range));

        let layout = unsafe { device.create_pipeline_layout(&layout_create_info, None) }
            .expect("Could not create pipeline layout");

        let create_info = vk::RayTracingPipelineCreateInfoKHR::builder()
            .stages(&shader_stages)
            .groups(&shader_groups)
            .max_pipeline_ray_recursion_depth(1)
            .layout(layout);

        let pipeline = unsafe {
            context
                .context_raytracing
                .ray_tracing_pipeline
                .create_ray_tracing_pipelines(
                    vk::DeferredOperationKHR::null(),
                    vk::PipelineCache::null(),
                    std::slice::from_ref(&create_info),
                    None,
                )
        }
        .expect("Could not create ray tracing pipeline")[0];

        info!(
            "Created ray tracing pipeline with {} stages and {} groups",
            shader_stages.len(),
            shader_groups.len()
        );

        Ok(Self {
            inner: pipeline,
            layout,
            context,
        })
    }
}

impl Drop for RayTracingPipeline {
    fn drop(&mut self) {
        unsafe {
            self.context.device.destroy_pipeline(self.inner, None);
            self.context.device.destroy_pipeline_layout(self.layout, None);
        }
    }
}
