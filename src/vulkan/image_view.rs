use std::sync::Arc;

use ash::vk;

use crate::vulkan::context::Context;
use crate::vulkan::image::Image;

/// Two dimensional color view over every mip level of an image. Keeps the image alive.
pub struct ImageView {
    pub inner: vk::ImageView,
    pub image: Arc<Image>,
    context: Arc<Context>,
}

impl ImageView {
    pub fn new_color(context: Arc<Context>, image: Image) -> Self {
        let image = Arc::new(image);
        let create_info = vk::ImageViewCreateInfo::builder()
            .image(image.inner)
            .view_type(vk::ImageViewType::TYPE_2D)
            .format(image.format)
            .components(vk::ComponentMapping::default())
            .subresource_range(image.full_subresource_range(vk::ImageAspectFlags::COLOR));

        let inner = unsafe { context.device.create_image_view(&create_info, None) }
            .expect("Could not create image view");

        Self {
            inner,
            image,
            context,
        }
    }

    pub fn extent_2d(&self) -> vk::Extent2D {
        vk::Extent2D {
            width: self.image.extent.width,
            height: self.image.extent.height,
        }
    }
}

impl Drop for ImageView {
    fn drop(&mut self) {
        unsafe { self.context.device.destroy_image_view(self.inner, None) };
    }
}
