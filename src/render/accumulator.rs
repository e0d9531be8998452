/// Counts how many samples are already blended into the accumulation image.
///
/// The count written to the uniform block is the number of earlier samples, so the shader
/// weighs the new sample with `1 / (count + 1)` and a count of zero overwrites the image.
#[derive(Debug, Default)]
pub struct FrameAccumulator {
    sample_count: u32,
}

impl FrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advances to the next frame and returns how many samples the frame blends with.
    /// Without accumulation every frame overwrites the image and the count is held at zero.
    pub fn advance(&mut self, camera_moved: bool, accumulate: bool) -> u32 {
        if !accumulate {
            self.sample_count = 0;
            return 0;
        }
        if camera_moved {
            self.sample_count = 0;
        }
        let previous = self.sample_count;
        self.sample_count = self.sample_count.saturating_add(1);
        previous
    }

    /// Forgets all samples, the next frame starts a fresh image
    pub fn reset(&mut self) {
        self.sample_count = 0;
    }

    /// Samples held by the accumulation image after the last frame
    pub fn sample_count(&self) -> u32 {
        self.sample_count
    }
}
