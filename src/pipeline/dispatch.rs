//! Declarative host table driving stage selection

use crate::config::DomainConfig;

/// Dispatch tiers, in the order a link is classified
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Tier {
    /// Single-hop CDN handled by its own solver
    DirectCdn,
    /// Already at the terminal host; only the direct-link resolver runs
    Final,
    /// First intermediate page (Extractor A)
    IntermediateA,
    /// Second intermediate page (Extractor B)
    IntermediateB,
    /// Ad-wait page handled by the timer decoder
    Timer,
}

impl Tier {
    /// Classification order
    pub const ORDER: [Tier; 5] = [
        Tier::DirectCdn,
        Tier::Final,
        Tier::IntermediateA,
        Tier::IntermediateB,
        Tier::Timer,
    ];
}

/// A host pattern bound to a tier
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DomainRule {
    /// Substring searched for in the link
    pub pattern: String,
    /// Tier the pattern selects
    pub tier: Tier,
}

/// Host patterns for every tier plus the set that stops the timer loop
#[derive(Clone, Debug)]
pub struct DomainTable {
    rules: Vec<DomainRule>,
    downstream: Vec<String>,
}

impl DomainTable {
    /// Build the table from configured host lists
    pub fn from_config(config: &DomainConfig) -> Self {
        let tiers = [
            (Tier::DirectCdn, &config.direct_cdn),
            (Tier::Final, &config.final_tier),
            (Tier::IntermediateA, &config.intermediate_a),
            (Tier::IntermediateB, &config.intermediate_b),
            (Tier::Timer, &config.timer),
        ];

        let rules = tiers
            .into_iter()
            .flat_map(|(tier, patterns)| {
                patterns
                    .iter()
                    .filter(|p| !p.is_empty())
                    .map(move |p| DomainRule {
                        pattern: p.clone(),
                        tier,
                    })
            })
            .collect();

        Self {
            rules,
            downstream: config
                .downstream
                .iter()
                .filter(|p| !p.is_empty())
                .cloned()
                .collect(),
        }
    }

    /// Whether the link contains any pattern of the given tier
    pub fn matches(&self, link: &str, tier: Tier) -> bool {
        self.rules
            .iter()
            .any(|rule| rule.tier == tier && link.contains(&rule.pattern))
    }

    /// First tier (in [`Tier::ORDER`]) the link belongs to
    pub fn classify(&self, link: &str) -> Option<Tier> {
        Tier::ORDER
            .into_iter()
            .find(|tier| self.matches(link, *tier))
    }

    /// Whether the link is at a host some later stage can handle
    pub fn is_downstream(&self, link: &str) -> bool {
        self.downstream.iter().any(|p| link.contains(p.as_str()))
    }

    /// All rules, in classification order
    pub fn rules(&self) -> &[DomainRule] {
        &self.rules
    }
}

impl Default for DomainTable {
    fn default() -> Self {
        Self::from_config(&DomainConfig::default())
    }
}
