//! Target platform information affecting type sizes.

use target_lexicon::Triple;

/// Target platform information for type layout.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TargetInfo {
    /// Target triple (e.g., "x86_64-unknown-linux-gnu")
    pub triple: Triple,
    /// Pointer size in bytes (4 for 32-bit, 8 for 64-bit)
    pub pointer_size: u32,
}

impl TargetInfo {
    /// Create target info from a triple.
    pub fn from_triple(triple: Triple) -> Self {
        let pointer_size = match triple.pointer_width() {
            Ok(target_lexicon::PointerWidth::U16) => 2,
            Ok(target_lexicon::PointerWidth::U32) => 4,
            Ok(target_lexicon::PointerWidth::U64) => 8,
            _ => 8, // Default to 64-bit
        };
        Self {
            triple,
            pointer_size,
        }
    }

    /// Target info for the current host.
    pub fn host() -> Self {
        Self::from_triple(Triple::host())
    }

    pub fn is_64bit(&self) -> bool {
        self.pointer_size == 8
    }
}

impl Default for TargetInfo {
    fn default() -> Self {
        Self::host()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn pointer_size_follows_triple() {
        let t32 = TargetInfo::from_triple(Triple::from_str("i686-unknown-linux-gnu").unwrap());
        assert_eq!(t32.pointer_size, 4);
        let t64 = TargetInfo::from_triple(Triple::from_str("aarch64-apple-darwin").unwrap());
        assert_eq!(t64.pointer_size, 8);
        assert!(t64.is_64bit());
    }
}
