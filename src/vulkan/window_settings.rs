use ash::vk;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum PresentMode {
    Immediate,
    Mailbox,
    #[default]
    Fifo,
    FifoRelaxed,
}

impl From<PresentMode> for vk::PresentModeKHR {
    fn from(mode: PresentMode) -> Self {
        match mode {
            PresentMode::Immediate => vk::PresentModeKHR::IMMEDIATE,
            PresentMode::Mailbox => vk::PresentModeKHR::MAILBOX,
            PresentMode::Fifo => vk::PresentModeKHR::FIFO,
            PresentMode::FifoRelaxed => vk::PresentModeKHR::FIFO_RELAXED,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn present_modes_parse_by_name() {
        let mode: PresentMode = serde_json::from_str("\"Mailbox\"").unwrap();
        assert_eq!(vk::PresentModeKHR::from(mode), vk::PresentModeKHR::MAILBOX);
    }
}
