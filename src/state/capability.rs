/// Subscription-tier gate consumed before a duel can be created.
pub trait CapabilityGate: Send + Sync {
    fn has_duel_capability(&self, tier: &str) -> bool;
}

/// Grants duels to an explicit list of tiers (case-insensitive).
#[derive(Debug, Clone)]
pub struct TierAllowList {
    tiers: Vec<String>,
}

impl TierAllowList {
    pub fn new(tiers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            tiers: tiers
                .into_iter()
                .map(|tier| tier.into().trim().to_lowercase())
                .collect(),
        }
    }
}

impl CapabilityGate for TierAllowList {
    fn has_duel_capability(&self, tier: &str) -> bool {
        let tier = tier.trim().to_lowercase();
        self.tiers.iter().any(|allowed| *allowed == tier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn listed_tiers_are_allowed_regardless_of_case() {
        let gate = TierAllowList::new(["premium", "Family"]);
        assert!(gate.has_duel_capability("premium"));
        assert!(gate.has_duel_capability(" PREMIUM "));
        assert!(gate.has_duel_capability("family"));
        assert!(!gate.has_duel_capability("free"));
        assert!(!gate.has_duel_capability(""));
    }
}
