use crate::release::ReleaseEntry;

/// Decides whether a release the user asked to skip stays hidden.
///
/// Background checks honor the stored preference. Manual checks use the
/// override variant, which never skips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SkipPolicy {
    manual_override: bool,
}

impl SkipPolicy {
    pub const BACKGROUND: Self = Self {
        manual_override: false,
    };

    pub const MANUAL: Self = Self {
        manual_override: true,
    };

    #[must_use]
    pub fn is_manual_override(self) -> bool {
        self.manual_override
    }

    #[must_use]
    pub fn should_skip(
        self,
        entry: &ReleaseEntry,
        stored_skip: Option<&str>,
        force_show: bool,
    ) -> bool {
        if self.manual_override || entry.critical || force_show {
            return false;
        }

        stored_skip.is_some_and(|skipped| skipped == entry.version)
    }
}
