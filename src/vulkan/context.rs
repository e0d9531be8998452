use std::ffi::CStr;
use std::mem::ManuallyDrop;
use std::sync::{Mutex, MutexGuard};

use ash::{
    extensions::khr::{
        AccelerationStructure, BufferDeviceAddress, RayTracingPipeline, Synchronization2,
    },
    vk::{self, ApplicationInfo, DeviceCreateInfo, DeviceQueueCreateInfo, InstanceCreateInfo},
};
use gpu_allocator::vulkan::{Allocator, AllocatorCreateDesc};
use log::info;
use raw_window_handle::{HasRawDisplayHandle, HasRawWindowHandle};
use winit::{event_loop::EventLoop, window::Window};

use crate::error::RenderError;

pub struct Context {
    _entry: ash::Entry,
    pub instance: ash::Instance,

    pub surface_loader: ash::extensions::khr::Surface,
    pub surface: vk::SurfaceKHR,

    pub context_raytracing: ContextRaytracing,
    pub synchronisation2_loader: ash::extensions::khr::Synchronization2,

    pub physical_device: vk::PhysicalDevice,
    pub physical_device_properties: vk::PhysicalDeviceProperties,
    pub queue_family_index: u32,

    pub device: ash::Device,
    pub queue: vk::Queue,

    pub buffer_device_address: BufferDeviceAddress,
    allocator: ManuallyDrop<Mutex<Allocator>>,
}

pub struct ContextRaytracing {
    pub ray_tracing_pipeline: RayTracingPipeline,
    pub physical_device_ray_tracing_pipeline_properties_khr:
        vk::PhysicalDeviceRayTracingPipelinePropertiesKHR,

    pub acceleration_structure: AccelerationStructure,
    pub physical_device_acceleration_structure_properties_khr:
        vk::PhysicalDeviceAccelerationStructurePropertiesKHR,
}

impl Context {
    pub fn new(event_loop: &EventLoop<()>, window: &Window) -> Result<Self, RenderError> {
        let entry = unsafe { ash::Entry::load() }.expect("Could not load vulkan library");

        let instance = {
            let surface_extension =
                ash_window::enumerate_required_extensions(event_loop.raw_display_handle())
                    .expect("Could not enumerate surface extensions");

            let app_info = ApplicationInfo::builder().api_version(vk::API_VERSION_1_3);
            let create_info = InstanceCreateInfo::builder()
                .application_info(&app_info)
                .enabled_extension_names(surface_extension);
            unsafe { entry.create_instance(&create_info, None) }.expect("Could not create instance")
        };

        let surface = unsafe {
            ash_window::create_surface(
                &entry,
                &instance,
                window.raw_display_handle(),
                window.raw_window_handle(),
                None,
            )
        }
        .expect("Could not create surface");
        let surface_loader = ash::extensions::khr::Surface::new(&entry, &instance);

        let (physical_device, queue_family_index) =
            find_physical_device(&instance, &surface, &surface_loader)?;

        let physical_device_properties =
            unsafe { instance.get_physical_device_properties(physical_device) };
        let device_name =
            unsafe { CStr::from_ptr(physical_device_properties.device_name.as_ptr()) };
        info!("Using {:?}", device_name);

        let device = create_logical_device(&instance, &physical_device, queue_family_index);

        let queue = unsafe { device.get_device_queue(queue_family_index, 0) };

        let synchronisation2_loader = Synchronization2::new(&instance, &device);

        let ray_tracing_pipeline = RayTracingPipeline::new(&instance, &device);
        let physical_device_ray_tracing_pipeline_properties_khr =
            unsafe { RayTracingPipeline::get_properties(&instance, physical_device) };

        let acceleration_structure = AccelerationStructure::new(&instance, &device);
        let physical_device_acceleration_structure_properties_khr =
            unsafe { AccelerationStructure::get_properties(&instance, physical_device) };

        let buffer_device_address = BufferDeviceAddress::new(&instance, &device);

        let context_raytracing = ContextRaytracing {
            ray_tracing_pipeline,
            physical_device_ray_tracing_pipeline_properties_khr,
            acceleration_structure,
            physical_device_acceleration_structure_properties_khr,
        };

        let allocator = Allocator::new(&AllocatorCreateDesc {
            instance: instance.clone(),
            device: device.clone(),
            physical_device,
            debug_settings: Default::default(),
            buffer_device_address: true,
            allocation_sizes: Default::default(),
        })
        .expect("Could not create allocator");

        Ok(Self {
            _entry: entry,
            instance,

            surface,
            surface_loader,

            context_raytracing,
            synchronisation2_loader,

            physical_device,
            physical_device_properties,
            queue_family_index,

            device,
            queue,
            buffer_device_address,
            allocator: ManuallyDrop::new(Mutex::new(allocator)),
        })
    }

    pub fn allocator(&self) -> MutexGuard<'_, Allocator> {
        self.allocator.lock().expect("Allocator lock was poisoned")
    }

    pub fn check_push_constant_size(&self, requested: u32) -> Result<(), RenderError> {
        check_push_constant_limit(
            requested,
            self.physical_device_properties.limits.max_push_constants_size,
        )
    }
}

impl Drop for Context {
    fn drop(&mut self) {
        // every allocation has been freed by now, the allocator must go before the device
        unsafe { ManuallyDrop::drop(&mut self.allocator) };

        unsafe { self.device.destroy_device(None) };

        unsafe { self.surface_loader.destroy_surface(self.surface, None) };

        unsafe { self.instance.destroy_instance(None) };
    }
}

pub fn check_push_constant_limit(requested: u32, limit: u32) -> Result<(), RenderError> {
    if requested > limit {
        return Err(RenderError::PushConstantsTooLarge { requested, limit });
    }
    Ok(())
}

fn required_extensions() -> [&'static CStr; 6] {
    [
        ash::extensions::khr::Swapchain::name(),
        ash::extensions::khr::Synchronization2::name(),
        ash::extensions::khr::AccelerationStructure::name(),
        ash::extensions::khr::RayTracingPipeline::name(),
        ash::extensions::khr::DeferredHostOperations::name(),
        ash::extensions::khr::BufferDeviceAddress::name(),
    ]
}

/// Names of the extensions and features the device lacks
fn missing_capabilities(
    instance: &ash::Instance,
    physical_device: vk::PhysicalDevice,
) -> Vec<String> {
    let extension_properties =
        unsafe { instance.enumerate_device_extension_properties(physical_device) }
            .expect("Could not enumerate device extension properties");
    let supported_extensions: Vec<&CStr> = extension_properties
        .iter()
        .map(|property| unsafe { CStr::from_ptr(property.extension_name.as_ptr()) })
        .collect();

    let mut missing: Vec<String> = required_extensions()
        .into_iter()
        .filter(|extension| !supported_extensions.contains(extension))
        .map(|extension| extension.to_string_lossy().into_owned())
        .collect();

    let mut vulkan12_features = vk::PhysicalDeviceVulkan12Features::default();
    let mut vulkan13_features = vk::PhysicalDeviceVulkan13Features::default();
    let mut ray_tracing_pipeline_features =
        vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default();
    let mut acceleration_structure_features =
        vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default();
    let core_features = {
        let mut features = vk::PhysicalDeviceFeatures2::builder()
            .push_next(&mut vulkan12_features)
            .push_next(&mut vulkan13_features)
            .push_next(&mut ray_tracing_pipeline_features)
            .push_next(&mut acceleration_structure_features);
        unsafe { instance.get_physical_device_features2(physical_device, &mut features) };
        features.features
    };

    let features = [
        ("samplerAnisotropy", core_features.sampler_anisotropy),
        (
            "shaderStorageImageWriteWithoutFormat",
            core_features.shader_storage_image_write_without_format,
        ),
        ("bufferDeviceAddress", vulkan12_features.buffer_device_address),
        ("runtimeDescriptorArray", vulkan12_features.runtime_descriptor_array),
        (
            "shaderSampledImageArrayNonUniformIndexing",
            vulkan12_features.shader_sampled_image_array_non_uniform_indexing,
        ),
        ("synchronization2", vulkan13_features.synchronization2),
        (
            "rayTracingPipeline",
            ray_tracing_pipeline_features.ray_tracing_pipeline,
        ),
        (
            "accelerationStructure",
            acceleration_structure_features.acceleration_structure,
        ),
    ];
    missing.extend(
        features
            .into_iter()
            .filter(|(_, supported)| *supported != vk::TRUE)
            .map(|(name, _)| name.to_string()),
    );

    missing
}

fn find_physical_device(
    instance: &ash::Instance,
    surface: &vk::SurfaceKHR,
    surface_loader: &ash::extensions::khr::Surface,
) -> Result<(vk::PhysicalDevice, u32), RenderError> {
    let physical_devices = unsafe { instance.enumerate_physical_devices() }
        .expect("Could not enumerate physical devices");

    let mut first_missing: Option<Vec<String>> = None;
    let capable_devices: Vec<vk::PhysicalDevice> = physical_devices
        .into_iter()
        .filter(|pd| {
            let missing = missing_capabilities(instance, *pd);
            if missing.is_empty() {
                return true;
            }
            first_missing.get_or_insert(missing);
            false
        })
        .collect();

    capable_devices
        .into_iter()
        .filter_map(|pd| {
            unsafe { instance.get_physical_device_queue_family_properties(pd) }
                .iter()
                .enumerate()
                .position(|(index, info)| {
                    let supports_graphics = info.queue_flags.contains(vk::QueueFlags::GRAPHICS);
                    let supports_surface = unsafe {
                        surface_loader.get_physical_device_surface_support(
                            pd,
                            index as u32,
                            *surface,
                        )
                    }
                    .unwrap_or(false);

                    supports_graphics && supports_surface
                })
                .map(|i| (pd, i as u32))
        })
        .min_by_key(|(pd, _)| {
            let device_type = unsafe { instance.get_physical_device_properties(*pd) }.device_type;

            match device_type {
                vk::PhysicalDeviceType::DISCRETE_GPU => 0,
                vk::PhysicalDeviceType::INTEGRATED_GPU => 1,
                vk::PhysicalDeviceType::VIRTUAL_GPU => 2,
                vk::PhysicalDeviceType::CPU => 3,
                vk::PhysicalDeviceType::OTHER => 4,
                _ => 5,
            }
        })
        .ok_or_else(|| {
            RenderError::MissingCapability(match first_missing {
                Some(missing) => missing.join(", "),
                None => "a graphics queue that can present to the window".to_string(),
            })
        })
}

fn create_logical_device(
    instance: &ash::Instance,
    physical_device: &vk::PhysicalDevice,
    queue_family_index: u32,
) -> ash::Device {
    let device_extensions = required_extensions().map(|extension| extension.as_ptr());

    let queue_priorities = [1.0];
    let queue_create_info = DeviceQueueCreateInfo::builder()
        .queue_family_index(queue_family_index)
        .queue_priorities(&queue_priorities);

    let enabled_features = vk::PhysicalDeviceFeatures {
        sampler_anisotropy: vk::TRUE,
        shader_storage_image_write_without_format: vk::TRUE,
        ..vk::PhysicalDeviceFeatures::default()
    };

    let mut physical_device_vulkan12_features = vk::PhysicalDeviceVulkan12Features {
        buffer_device_address: vk::TRUE,
        runtime_descriptor_array: vk::TRUE,
        shader_sampled_image_array_non_uniform_indexing: vk::TRUE,
        ..vk::PhysicalDeviceVulkan12Features::default()
    };

    let mut physical_device_vulkan13_features = vk::PhysicalDeviceVulkan13Features {
        synchronization2: vk::TRUE,
        ..vk::PhysicalDeviceVulkan13Features::default()
    };

    let mut enabled_ray_tracing_pipeline_features =
        vk::PhysicalDeviceRayTracingPipelineFeaturesKHR {
            ray_tracing_pipeline: vk::TRUE,
            ..vk::PhysicalDeviceRayTracingPipelineFeaturesKHR::default()
        };

    let mut enabled_acceleration_structure_features =
        vk::PhysicalDeviceAccelerationStructureFeaturesKHR {
            acceleration_structure: vk::TRUE,
            ..vk::PhysicalDeviceAccelerationStructureFeaturesKHR::default()
        };

    let create_info = DeviceCreateInfo::builder()
        .queue_create_infos(std::slice::from_ref(&queue_create_info))
        .enabled_extension_names(&device_extensions)
        .enabled_features(&enabled_features)
        .push_next(&mut physical_device_vulkan12_features)
        .push_next(&mut physical_device_vulkan13_features)
        .push_next(&mut enabled_ray_tracing_pipeline_features)
        .push_next(&mut enabled_acceleration_structure_features);

    unsafe { instance.create_device(*physical_device, &create_info, None) }
        .expect("Could not create logical device")
}
