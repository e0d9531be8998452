use std::sync::Arc;

use ash::vk;
use log::{debug, info};
use winit::dpi::PhysicalSize;

use crate::vulkan::context::Context;

/// Swapchain whose images are only ever written by transfer commands.
pub struct SwapchainContainer {
    pub loader: ash::extensions::khr::Swapchain,
    pub inner: vk::SwapchainKHR,

    pub images: Vec<vk::Image>,

    pub surface_format: vk::SurfaceFormatKHR,
    pub extent: vk::Extent2D,

    present_mode: vk::PresentModeKHR,

    context: Arc<Context>,
}

impl SwapchainContainer {
    pub fn new(
        context: Arc<Context>,
        window_size: PhysicalSize<u32>,
        preferred_present_mode: vk::PresentModeKHR,
    ) -> Self {
        let formats = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_formats(context.physical_device, context.surface)
        }
        .expect("Could not get surface formats from physical device");

        let present_modes = unsafe {
            context
                .surface_loader
                .get_physical_device_surface_present_modes(context.physical_device, context.surface)
        }
        .expect("Could not get present modes from physical device");

        let surface_format = formats
            .into_iter()
            .min_by_key(|fmt| match (fmt.format, fmt.color_space) {
                (vk::Format::B8G8R8A8_SRGB, _) => 1,
                (vk::Format::R8G8B8A8_SRGB, vk::ColorSpaceKHR::SRGB_NONLINEAR) => 2,
                (_, _) => 3,
            })
            .expect("Could not fetch image format");

        let present_mode = present_modes
            .into_iter()
            .find(|&pm| pm == preferred_present_mode)
            .unwrap_or(vk::PresentModeKHR::FIFO);
        info!(
            "Swapchain uses {:?} with present mode {:?}",
            surface_format.format, present_mode
        );

        let loader = ash::extensions::khr::Swapchain::new(&context.instance, &context.device);

        let mut swapchain = Self {
            loader,
            inner: vk::SwapchainKHR::null(),
            images: vec![],
            surface_format,
            extent: vk::Extent2D::default(),
            present_mode,
            context,
        };
        swapchain.create(window_size);
        swapchain
    }

    /// Format of the storage image the ray generation shader writes before it is copied into
    /// a swapchain image.
    pub fn storage_format(&self) -> vk::Format {
        storage_format(self.surface_format.format)
    }

    pub fn recreate(&mut self, window_size: PhysicalSize<u32>) {
        unsafe { self.context.device.device_wait_idle() }
            .expect("Could not wait for device idle");
        self.create(window_size);
    }

    fn create(&mut self, window_size: PhysicalSize<u32>) {
        let capabilities = unsafe {
            self.context
                .surface_loader
                .get_physical_device_surface_capabilities(
                    self.context.physical_device,
                    self.context.surface,
                )
        }
        .expect("Could not get surface capabilities from physical device");

        let num_images = capabilities.min_image_count.max(2);

        let swapchain_extent = {
            if capabilities.current_extent.width != u32::MAX {
                capabilities.current_extent
            } else {
                vk::Extent2D {
                    width: window_size.width.clamp(
                        capabilities.min_image_extent.width,
                        capabilities.max_image_extent.width,
                    ),
                    height: window_size.height.clamp(
                        capabilities.min_image_extent.height,
                        capabilities.max_image_extent.height,
                    ),
                }
            }
        };

        let create_info = vk::SwapchainCreateInfoKHR::builder()
            .surface(self.context.surface)
            .min_image_count(num_images)
            .image_format(self.surface_format.format)
            .image_color_space(self.surface_format.color_space)
            .image_extent(swapchain_extent)
            .image_array_layers(1)
            .image_usage(vk::ImageUsageFlags::TRANSFER_DST)
            .image_sharing_mode(vk::SharingMode::EXCLUSIVE)
            .pre_transform(capabilities.current_transform)
            .composite_alpha(vk::CompositeAlphaFlagsKHR::OPAQUE)
            .present_mode(self.present_mode)
            .clipped(true)
            .old_swapchain(self.inner);

        let swapchain = unsafe { self.loader.create_swapchain(&create_info, None) }
            .expect("Could not create swapchain");

        let images = unsafe { self.loader.get_swapchain_images(swapchain) }
            .expect("Could not get swapchain images");

        // We brutally assume that the old swapchain is not in use anymore
        if self.inner != vk::SwapchainKHR::null() {
            unsafe { self.loader.destroy_swapchain(self.inner, None) };
        }
        debug!(
            "Swapchain with {} images of {}x{}",
            images.len(),
            swapchain_extent.width,
            swapchain_extent.height
        );

        self.inner = swapchain;
        self.extent = swapchain_extent;
        self.images = images;
    }
}

/// Storage images cannot use sRGB formats, so the shader writes gamma corrected values into
/// the linear twin of the swapchain format.
pub fn storage_format(swapchain_format: vk::Format) -> vk::Format {
    match swapchain_format {
        vk::Format::B8G8R8A8_SRGB => vk::Format::B8G8R8A8_UNORM,
        vk::Format::R8G8B8A8_SRGB => vk::Format::R8G8B8A8_UNORM,
        vk::Format::A8B8G8R8_SRGB_PACK32 => vk::Format::A8B8G8R8_UNORM_PACK32,
        other => other,
    }
}

impl Drop for SwapchainContainer {
    fn drop(&mut self) {
        unsafe { self.loader.destroy_swapchain(self.inner, None) };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn srgb_formats_map_to_unorm() {
        assert_eq!(
            storage_format(vk::Format::B8G8R8A8_SRGB),
            vk::Format::B8G8R8A8_UNORM
        );
        assert_eq!(
            storage_format(vk::Format::R8G8B8A8_SRGB),
            vk::Format::R8G8B8A8_UNORM
        );
    }

    #[test]
    fn linear_formats_are_kept() {
        assert_eq!(
            storage_format(vk::Format::B8G8R8A8_UNORM),
            vk::Format::B8G8R8A8_UNORM
        );
    }
}
