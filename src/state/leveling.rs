//! Mapping from accumulated XP to a user level.

/// Leveling function consumed by the gamification profile stores.
pub type LevelCurve = fn(u64) -> u32;

/// `level = floor(sqrt(xp / 100)) + 1`.
pub fn default_level_curve(xp: u64) -> u32 {
    let level = (xp / 100).isqrt().saturating_add(1);
    u32::try_from(level).unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn curve_starts_at_level_one() {
        assert_eq!(default_level_curve(0), 1);
        assert_eq!(default_level_curve(99), 1);
    }

    #[test]
    fn curve_grows_with_square_root() {
        assert_eq!(default_level_curve(100), 2);
        assert_eq!(default_level_curve(399), 2);
        assert_eq!(default_level_curve(400), 3);
        assert_eq!(default_level_curve(10_000), 11);
    }
}
