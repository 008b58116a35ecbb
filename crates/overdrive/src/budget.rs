//! Memory budget values and the dynamic scaling policy.
//!
//! The game caps five resource pools with hardcoded byte budgets sized for
//! 2010 hardware. Presets here replace them wholesale; [`ScalePolicy`]
//! trims them back under sustained frame-time pressure.

/// Per-pool budgets in megabytes. The unit games configuration and
/// scaling both work in; conversion to bytes happens only at the patch
/// boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BudgetMb {
    pub exterior_texture: u32,
    pub interior_geometry: u32,
    pub interior_texture: u32,
    pub interior_water: u32,
    pub actor_memory: u32,
}

impl BudgetMb {
    /// Converts to byte values, saturating pools that would overflow the
    /// 32-bit address space.
    #[must_use]
    pub fn to_bytes(self) -> Budget {
        let bytes = |mb: u32| u32::try_from(u64::from(mb) << 20).unwrap_or(u32::MAX);
        Budget {
            exterior_texture: bytes(self.exterior_texture),
            interior_geometry: bytes(self.interior_geometry),
            interior_texture: bytes(self.interior_texture),
            interior_water: bytes(self.interior_water),
            actor_memory: bytes(self.actor_memory),
        }
    }
}

/// Per-pool budgets in bytes, as stored in the game executable.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Budget {
    pub exterior_texture: u32,
    pub interior_geometry: u32,
    pub interior_texture: u32,
    pub interior_water: u32,
    pub actor_memory: u32,
}

impl Budget {
    /// Converts to megabyte values, truncating sub-megabyte remainders.
    #[must_use]
    pub fn to_mb(self) -> BudgetMb {
        BudgetMb {
            exterior_texture: self.exterior_texture >> 20,
            interior_geometry: self.interior_geometry >> 20,
            interior_texture: self.interior_texture >> 20,
            interior_water: self.interior_water >> 20,
            actor_memory: self.actor_memory >> 20,
        }
    }
}

/// Named budget tiers, from the shipped game values up to the edge of the
/// 32-bit large-address-aware limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BudgetPreset {
    /// The values the game ships with.
    Default,
    /// Balanced increase for unmodded play on modern hardware.
    Recommended,
    /// Sized for heavily modded load orders.
    Aggressive,
    /// Sized for large texture packs.
    Ultra,
    /// Everything the address space allows; expect instability without a
    /// large-address-aware executable.
    Extreme,
}

impl BudgetPreset {
    /// Parses a preset name as written in the configuration file.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "default" => Some(Self::Default),
            "recommended" => Some(Self::Recommended),
            "aggressive" => Some(Self::Aggressive),
            "ultra" => Some(Self::Ultra),
            "extreme" => Some(Self::Extreme),
            _ => None,
        }
    }

    /// The configuration-file spelling of this preset.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Recommended => "recommended",
            Self::Aggressive => "aggressive",
            Self::Ultra => "ultra",
            Self::Extreme => "extreme",
        }
    }

    /// The byte budgets this preset assigns to each pool.
    #[must_use]
    pub fn budget(self) -> Budget {
        match self {
            Self::Default => Budget {
                exterior_texture: 0x0140_0000,
                interior_geometry: 0x00A0_0000,
                interior_texture: 0x0640_0000,
                interior_water: 0x00A0_0000,
                actor_memory: 0x00A0_0000,
            },
            Self::Recommended => Budget {
                exterior_texture: 0x0400_0000,
                interior_geometry: 0x0200_0000,
                interior_texture: 0x1000_0000,
                interior_water: 0x0200_0000,
                actor_memory: 0x0200_0000,
            },
            Self::Aggressive => Budget {
                exterior_texture: 0x0C00_0000,
                interior_geometry: 0x0600_0000,
                interior_texture: 0x3000_0000,
                interior_water: 0x0600_0000,
                actor_memory: 0x0600_0000,
            },
            Self::Ultra => Budget {
                exterior_texture: 0x2000_0000,
                interior_geometry: 0x1000_0000,
                interior_texture: 0x8000_0000,
                interior_water: 0x1000_0000,
                actor_memory: 0x1000_0000,
            },
            Self::Extreme => Budget {
                exterior_texture: 0x4000_0000,
                interior_geometry: 0x2000_0000,
                interior_texture: 0xC000_0000,
                interior_water: 0x2000_0000,
                actor_memory: 0x2000_0000,
            },
        }
    }

    /// Applies non-zero per-pool overrides (in MB) on top of this preset.
    #[must_use]
    pub fn with_overrides(self, overrides: BudgetMb) -> Budget {
        let mut budget = self.budget();
        let overrides = overrides.to_bytes();
        if overrides.exterior_texture != 0 {
            budget.exterior_texture = overrides.exterior_texture;
        }
        if overrides.interior_geometry != 0 {
            budget.interior_geometry = overrides.interior_geometry;
        }
        if overrides.interior_texture != 0 {
            budget.interior_texture = overrides.interior_texture;
        }
        if overrides.interior_water != 0 {
            budget.interior_water = overrides.interior_water;
        }
        if overrides.actor_memory != 0 {
            budget.actor_memory = overrides.actor_memory;
        }
        budget
    }
}

/// Decides how budgets move in response to smoothed frame time.
///
/// Asymmetric on purpose: cuts are fast (a missed frame target costs the
/// player immediately) and recovery is slow (to avoid oscillating across
/// the target). Inside the dead band between the two thresholds nothing
/// moves.
#[derive(Debug, Clone, Copy)]
pub struct ScalePolicy {
    /// Frame time the scaling aims to hold, in milliseconds.
    pub target_frame_ms: f64,
    /// Fractional cut applied per adjustment while over target.
    pub scale_down: f64,
    /// Fractional growth applied per adjustment while comfortably under.
    pub scale_up: f64,
    /// Per-pool lower bounds in MB.
    pub floor: BudgetMb,
    /// Per-pool upper bounds in MB.
    pub ceiling: BudgetMb,
}

impl ScalePolicy {
    /// Returns the adjusted budgets for the observed smoothed frame time,
    /// or `None` when nothing should change.
    #[must_use]
    pub fn adjust(&self, current: BudgetMb, ema_ms: f64) -> Option<BudgetMb> {
        if self.target_frame_ms <= 0.0 {
            return None;
        }
        let over = ema_ms - self.target_frame_ms;
        let factor = if over > 0.5 {
            -self.scale_down
        } else if over < -1.0 {
            self.scale_up
        } else {
            return None;
        };
        let scale = |cur: u32, lo: u32, hi: u32| {
            let next = f64::from(cur) * (1.0 + factor);
            (next as u32).clamp(lo, hi)
        };
        let next = BudgetMb {
            exterior_texture: scale(
                current.exterior_texture,
                self.floor.exterior_texture,
                self.ceiling.exterior_texture,
            ),
            interior_geometry: scale(
                current.interior_geometry,
                self.floor.interior_geometry,
                self.ceiling.interior_geometry,
            ),
            interior_texture: scale(
                current.interior_texture,
                self.floor.interior_texture,
                self.ceiling.interior_texture,
            ),
            interior_water: scale(
                current.interior_water,
                self.floor.interior_water,
                self.ceiling.interior_water,
            ),
            actor_memory: scale(
                current.actor_memory,
                self.floor.actor_memory,
                self.ceiling.actor_memory,
            ),
        };
        if next == current {
            None
        } else {
            Some(next)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat(mb: u32) -> BudgetMb {
        BudgetMb {
            exterior_texture: mb,
            interior_geometry: mb,
            interior_texture: mb,
            interior_water: mb,
            actor_memory: mb,
        }
    }

    fn policy() -> ScalePolicy {
        ScalePolicy {
            target_frame_ms: 16.67,
            scale_down: 0.2,
            scale_up: 0.02,
            floor: flat(32),
            ceiling: flat(4096),
        }
    }

    #[test]
    fn preset_names_round_trip() {
        for preset in [
            BudgetPreset::Default,
            BudgetPreset::Recommended,
            BudgetPreset::Aggressive,
            BudgetPreset::Ultra,
            BudgetPreset::Extreme,
        ] {
            assert_eq!(BudgetPreset::from_name(preset.name()), Some(preset));
        }
        assert_eq!(BudgetPreset::from_name("custom"), None);
    }

    #[test]
    fn default_preset_matches_shipped_game_values() {
        let budget = BudgetPreset::Default.budget();
        assert_eq!(budget.exterior_texture, 20 << 20);
        assert_eq!(budget.interior_geometry, 10 << 20);
        assert_eq!(budget.interior_texture, 100 << 20);
        assert_eq!(budget.interior_water, 10 << 20);
        assert_eq!(budget.actor_memory, 10 << 20);
    }

    #[test]
    fn presets_grow_monotonically() {
        let tiers = [
            BudgetPreset::Default,
            BudgetPreset::Recommended,
            BudgetPreset::Aggressive,
            BudgetPreset::Ultra,
            BudgetPreset::Extreme,
        ];
        for pair in tiers.windows(2) {
            let (lo, hi) = (pair[0].budget(), pair[1].budget());
            assert!(lo.exterior_texture < hi.exterior_texture);
            assert!(lo.interior_texture < hi.interior_texture);
        }
    }

    #[test]
    fn overrides_replace_only_nonzero_pools() {
        let overrides = BudgetMb {
            exterior_texture: 256,
            interior_geometry: 0,
            interior_texture: 0,
            interior_water: 0,
            actor_memory: 48,
        };
        let budget = BudgetPreset::Default.with_overrides(overrides);
        assert_eq!(budget.exterior_texture, 256 << 20);
        assert_eq!(budget.actor_memory, 48 << 20);
        assert_eq!(
            budget.interior_texture,
            BudgetPreset::Default.budget().interior_texture
        );
    }

    #[test]
    fn mb_conversion_saturates_at_address_space() {
        let oversized = flat(8192);
        assert_eq!(oversized.to_bytes().interior_texture, u32::MAX);
        assert_eq!(flat(100).to_bytes().to_mb(), flat(100));
    }

    #[test]
    fn over_target_cuts_budgets() {
        let next = policy()
            .adjust(flat(1000), 20.0)
            .expect("over target must cut");
        assert_eq!(next.interior_texture, 800);
    }

    #[test]
    fn under_target_recovers_slowly() {
        let next = policy()
            .adjust(flat(1000), 14.0)
            .expect("well under target must grow");
        assert_eq!(next.interior_texture, 1020);
    }

    #[test]
    fn dead_band_holds_steady() {
        let p = policy();
        assert_eq!(p.adjust(flat(1000), 16.67), None);
        assert_eq!(p.adjust(flat(1000), 17.0), None);
        assert_eq!(p.adjust(flat(1000), 16.0), None);
    }

    #[test]
    fn cuts_stop_at_the_floor() {
        let p = policy();
        assert_eq!(
            p.adjust(flat(32), 25.0),
            None,
            "already at the floor, nothing to cut"
        );
        let next = p.adjust(flat(36), 25.0).expect("still above the floor");
        assert_eq!(next.actor_memory, 32);
    }

    #[test]
    fn growth_stops_at_the_ceiling() {
        assert_eq!(policy().adjust(flat(4096), 10.0), None);
    }

    #[test]
    fn zero_target_disables_scaling() {
        let mut p = policy();
        p.target_frame_ms = 0.0;
        assert_eq!(p.adjust(flat(1000), 50.0), None);
    }
}
