// See: https://github.com/ash-rs/ash/blob/master/examples/src/lib.rs#L30C1-L40C2
// Simple offset_of macro akin to C++ offsetof
#[macro_export]
macro_rules! offset_of {
    ($base:path, $field:ident) => {{
        #[allow(unused_unsafe)]
        unsafe {
            let b: $base = std::mem::zeroed();
            std::ptr::addr_of!(b.$field) as isize - std::ptr::addr_of!(b) as isize
        }
    }};
}

pub fn aligned_size(value: u32, alignment: u32) -> u32 {
    assert!(alignment.is_power_of_two());
    (value + alignment - 1) & !(alignment - 1)
}

pub fn aligned_device_address(address: u64, alignment: u64) -> u64 {
    assert!(alignment.is_power_of_two());
    (address + alignment - 1) & !(alignment - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rounds_up_to_alignment() {
        assert_eq!(aligned_size(32, 64), 64);
        assert_eq!(aligned_size(64, 64), 64);
        assert_eq!(aligned_size(65, 64), 128);
        assert_eq!(aligned_size(0, 16), 0);
        assert_eq!(aligned_device_address(0x1001, 0x40), 0x1040);
        assert_eq!(aligned_device_address(0x1040, 0x40), 0x1040);
    }
}
