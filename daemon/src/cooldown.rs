use std::collections::HashMap;
use std::time::Instant;

use crate::category::SoundCategory;
use crate::config::CooldownConfig;

/// Per-category rate limiter.
///
/// Each category keeps its own last-fired timestamp; categories never share
/// state. The caller supplies `now`, so the gate is deterministic under test.
/// The gate is owned by the event loop and mutated through `&mut self`, which
/// makes [`CooldownGate::try_fire`] a single check-and-set step.
#[derive(Debug)]
pub struct CooldownGate {
    cooldowns: CooldownConfig,
    last_fired: HashMap<SoundCategory, Instant>,
}

impl CooldownGate {
    pub fn new(cooldowns: CooldownConfig) -> Self {
        Self {
            cooldowns,
            last_fired: HashMap::new(),
        }
    }

    /// Returns true if `category` has never fired or its cooldown has elapsed.
    pub fn allow(&self, category: SoundCategory, now: Instant) -> bool {
        match self.last_fired.get(&category) {
            None => true,
            Some(last) => {
                now.saturating_duration_since(*last) >= self.cooldowns.for_category(category)
            }
        }
    }

    pub fn record(&mut self, category: SoundCategory, now: Instant) {
        self.last_fired.insert(category, now);
    }

    /// Atomic form of `allow` + `record`: on success the clock is updated and
    /// `true` is returned; otherwise nothing changes.
    pub fn try_fire(&mut self, category: SoundCategory, now: Instant) -> bool {
        if !self.allow(category, now) {
            return false;
        }
        self.record(category, now);
        true
    }

    /// Applies new durations without resetting any last-fired clock.
    pub fn set_cooldowns(&mut self, cooldowns: CooldownConfig) {
        self.cooldowns = cooldowns;
    }
}
