use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;

use super::TrafficError;

/// One kind of simulated shopper behaviour
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scenario {
    Browse,
    Search,
    PlaceOrder,
    CheckOrderStatus,
    TriggerError,
    Burst,
}

impl Scenario {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Browse => "browse",
            Scenario::Search => "search",
            Scenario::PlaceOrder => "place_order",
            Scenario::CheckOrderStatus => "check_order_status",
            Scenario::TriggerError => "trigger_error",
            Scenario::Burst => "burst",
        }
    }
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Default weights, in percent
pub const DEFAULT_WEIGHTS: [(Scenario, u32); 6] = [
    (Scenario::Browse, 35),
    (Scenario::Search, 20),
    (Scenario::PlaceOrder, 25),
    (Scenario::CheckOrderStatus, 10),
    (Scenario::TriggerError, 5),
    (Scenario::Burst, 5),
];

/// Weighted distribution over scenarios
#[derive(Debug, Clone)]
pub struct ScenarioMix {
    scenarios: Vec<Scenario>,
    index: WeightedIndex<u32>,
}

impl ScenarioMix {
    pub fn new(weights: &[(Scenario, u32)]) -> Result<Self, TrafficError> {
        let index = WeightedIndex::new(weights.iter().map(|(_, w)| *w))
            .map_err(|e| TrafficError::InvalidMix(e.to_string()))?;

        Ok(Self {
            scenarios: weights.iter().map(|(s, _)| *s).collect(),
            index,
        })
    }

    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> Scenario {
        self.scenarios[self.index.sample(rng)]
    }
}

impl Default for ScenarioMix {
    fn default() -> Self {
        Self::new(&DEFAULT_WEIGHTS).expect("default scenario weights are valid")
    }
}
