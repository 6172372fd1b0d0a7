/// The handful of target-dependent facts the type algebra needs: how wide
/// `long` and pointers are. Parameterized rather than hardcoded so the
/// core isn't pinned to one architecture's assumptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Target {
    pub long_size: u32,
    pub pointer_size: u32,
}

impl Default for Target {
    fn default() -> Self {
        Self { long_size: 4, pointer_size: 4 }
    }
}
