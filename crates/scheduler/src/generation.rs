//! Navigation epoch used to discard stale render results

/// Counter bumped once per executed navigation.
///
/// Owned by the UI thread alone, so it needs no synchronization. Work items
/// carry the value current when they were created; results whose value no
/// longer matches are stale.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderGeneration(u64);

impl RenderGeneration {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn current(&self) -> u64 {
        self.0
    }

    /// Advance by exactly one and return the new value
    pub fn bump(&mut self) -> u64 {
        self.0 = self.0.wrapping_add(1);
        self.0
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.0 == generation
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_bumps_by_one() {
        let mut generation = RenderGeneration::new();
        assert_eq!(generation.current(), 0);
        assert_eq!(generation.bump(), 1);
        assert_eq!(generation.bump(), 2);
        assert!(generation.is_current(2));
        assert!(!generation.is_current(1));
    }
}
