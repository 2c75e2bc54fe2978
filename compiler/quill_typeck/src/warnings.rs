//! Warning-state flags.
//!
//! The active warning configuration is part of the checker's global mutable
//! state: each analyzed declaration backs up the flags in force after it was
//! processed, and restoring a snapshot restores them, so replayed analysis
//! warns exactly as continuous analysis would have.

use bitflags::bitflags;

bitflags! {
    /// Which warning classes are currently enabled.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct WarningFlags: u8 {
        /// Warn when a binding shadows an earlier one.
        const SHADOWING = 1 << 0;
        /// Warn when a type alias redefines an earlier alias.
        const REDEFINED_TYPE = 1 << 1;
    }
}

impl Default for WarningFlags {
    fn default() -> Self {
        WarningFlags::all()
    }
}
