use serde::{Deserialize, Serialize};

/// Logical sound a notification can produce. Each category has its own
/// cooldown clock and its own on/off switch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundCategory {
    /// A build, test or mutating git command finished cleanly.
    Success,
    /// A task, command or debug session failed.
    Failure,
    /// Compile/lint errors appeared in the workspace.
    Error,
    /// The user has been working continuously for a long stretch.
    FocusReminder,
}

impl SoundCategory {
    pub const ALL: [SoundCategory; 4] = [
        SoundCategory::Success,
        SoundCategory::Failure,
        SoundCategory::Error,
        SoundCategory::FocusReminder,
    ];

    /// File stem of the bundled asset for this category (extension chosen per platform).
    pub fn asset_stem(self) -> &'static str {
        match self {
            SoundCategory::Success => "papapa",
            SoundCategory::Failure => "fahhhhh",
            SoundCategory::Error => "pssst",
            SoundCategory::FocusReminder => "muneere-kann-chimm",
        }
    }

    /// Human-readable label used in toggle confirmations.
    pub fn label(self) -> &'static str {
        match self {
            SoundCategory::Success => "Success",
            SoundCategory::Failure => "Failure",
            SoundCategory::Error => "Error",
            SoundCategory::FocusReminder => "Focus reminder",
        }
    }

    fn index(self) -> usize {
        match self {
            SoundCategory::Success => 0,
            SoundCategory::Failure => 1,
            SoundCategory::Error => 2,
            SoundCategory::FocusReminder => 3,
        }
    }
}

/// In-memory enable flags: one master switch gating everything, plus one per
/// category. Nothing here is ever written to disk.
#[derive(Debug, Clone)]
pub struct SoundSwitches {
    master: bool,
    per_category: [bool; 4],
}

impl Default for SoundSwitches {
    fn default() -> Self {
        Self {
            master: true,
            per_category: [true; 4],
        }
    }
}

impl SoundSwitches {
    /// True only when both the master switch and the category switch are on.
    pub fn is_enabled(&self, category: SoundCategory) -> bool {
        self.master && self.per_category[category.index()]
    }

    #[cfg(test)]
    pub fn master_enabled(&self) -> bool {
        self.master
    }

    /// Flips the master switch and returns the new state.
    pub fn toggle_all(&mut self) -> bool {
        self.master = !self.master;
        self.master
    }

    /// Flips a single category switch and returns its new state.
    /// The master switch is left untouched.
    pub fn toggle(&mut self, category: SoundCategory) -> bool {
        let slot = &mut self.per_category[category.index()];
        *slot = !*slot;
        *slot
    }
}
