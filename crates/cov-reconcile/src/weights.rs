use std::collections::BTreeMap;

use cov_delegation::{DelegationRouting, LbmBoost};
use cov_schemas::{CoverageAssertion, Layer};

/// Authority weight per recognized layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerWeights {
    pub um_criteria: f64,
    pub lbm_guideline: f64,
    pub policy_stance: f64,
    pub overlay: f64,
    pub vendor_claim: f64,
}

impl LayerWeights {
    /// Weights with no delegation in play.
    pub const BASE: LayerWeights = LayerWeights {
        um_criteria: 1.00,
        lbm_guideline: 0.95,
        policy_stance: 0.70,
        overlay: 0.50,
        vendor_claim: 0.30,
    };

    /// Weights for one query, given its delegation routing.
    ///
    /// Full boost lifts LBM guideline to parity with UM criteria and demotes
    /// policy stance. Tie-break boost nudges LBM guideline just under UM
    /// criteria. Inapplicable routing never reweights.
    pub fn for_routing(routing: &DelegationRouting) -> Self {
        if !routing.lob_applicable {
            return Self::BASE;
        }
        match routing.boost {
            LbmBoost::Full => LayerWeights {
                lbm_guideline: 1.00,
                policy_stance: 0.40,
                ..Self::BASE
            },
            LbmBoost::TieBreak => LayerWeights {
                lbm_guideline: 0.98,
                ..Self::BASE
            },
            LbmBoost::None => Self::BASE,
        }
    }

    /// Unknown layers weigh nothing.
    pub fn layer(&self, layer: &Layer) -> f64 {
        match layer {
            Layer::UmCriteria => self.um_criteria,
            Layer::LbmGuideline => self.lbm_guideline,
            Layer::PolicyStance => self.policy_stance,
            Layer::Overlay => self.overlay,
            Layer::VendorClaim => self.vendor_claim,
            Layer::Unknown(_) => 0.0,
        }
    }

    /// Ranking weight of one assertion. An unrecognized status also weighs
    /// nothing, whatever its layer.
    pub fn of(&self, assertion: &CoverageAssertion) -> f64 {
        if let cov_schemas::AssertionStatus::Unknown(_) = assertion.status {
            return 0.0;
        }
        self.layer(&assertion.layer)
    }

    pub fn as_map(&self) -> BTreeMap<String, f64> {
        [
            (Layer::UmCriteria, self.um_criteria),
            (Layer::LbmGuideline, self.lbm_guideline),
            (Layer::PolicyStance, self.policy_stance),
            (Layer::Overlay, self.overlay),
            (Layer::VendorClaim, self.vendor_claim),
        ]
        .into_iter()
        .map(|(l, w)| (l.as_str().to_string(), w))
        .collect()
    }
}

impl Default for LayerWeights {
    fn default() -> Self {
        Self::BASE
    }
}
