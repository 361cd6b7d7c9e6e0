use std::fmt;

use rand::{Rng, SeedableRng, rngs::SmallRng};
use serde::{Deserialize, Serialize};

use crate::{attributes::SegmentAttributes, geometry::curvature};

/// Label shown for a Low segment on which no rule fired.
pub const SAFE_ROUTE_LABEL: &str = "Safe Route";

/// Scores above this are at least Moderate.
pub const MODERATE_ABOVE: u32 = 20;
/// Scores above this are High.
pub const HIGH_ABOVE: u32 = 50;

/// The known-hazard vocabulary, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hazard {
    SharpCurve,
    PoorLighting,
    NarrowRoad,
    TrafficCongestion,
    BadVisibility,
    KnownBlackspot,
    HighSpeedZone,
    WindingRoad,
}

impl Hazard {
    pub const COUNT: usize = 8;

    pub const ALL: [Hazard; Self::COUNT] = [
        Hazard::SharpCurve,
        Hazard::PoorLighting,
        Hazard::NarrowRoad,
        Hazard::TrafficCongestion,
        Hazard::BadVisibility,
        Hazard::KnownBlackspot,
        Hazard::HighSpeedZone,
        Hazard::WindingRoad,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Hazard::SharpCurve => "Sharp Curve",
            Hazard::PoorLighting => "Poor Lighting",
            Hazard::NarrowRoad => "Narrow Road",
            Hazard::TrafficCongestion => "Traffic Congestion",
            Hazard::BadVisibility => "Bad Visibility",
            Hazard::KnownBlackspot => "Known Blackspot",
            Hazard::HighSpeedZone => "High Speed Zone",
            Hazard::WindingRoad => "Winding Road",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Hazard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RiskCategory {
    Low,
    Moderate,
    High,
}

impl RiskCategory {
    pub fn from_score(score: u32) -> Self {
        if score > HIGH_ABOVE {
            RiskCategory::High
        } else if score > MODERATE_ABOVE {
            RiskCategory::Moderate
        } else {
            RiskCategory::Low
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Moderate => "Moderate",
            RiskCategory::High => "High",
        }
    }

    /// Display colour used by the map client.
    pub fn color(self) -> &'static str {
        match self {
            RiskCategory::Low => "#20BD5F",
            RiskCategory::Moderate => "#F5A623",
            RiskCategory::High => "#E11B23",
        }
    }
}

impl fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RiskFactor {
    pub weight: u32,
    pub hazard: Hazard,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskResult {
    pub score: u32,
    pub category: RiskCategory,
    /// Fired rules in evaluation order, at most one per hazard.
    pub factors: Vec<RiskFactor>,
}

impl RiskResult {
    fn from_factors(factors: Vec<RiskFactor>) -> Self {
        let score = factors.iter().map(|f| f.weight).sum();
        Self {
            score,
            category: RiskCategory::from_score(score),
            factors,
        }
    }

    pub fn color(&self) -> &'static str {
        self.category.color()
    }

    pub fn hazards(&self) -> impl Iterator<Item = Hazard> + '_ {
        self.factors.iter().map(|f| f.hazard)
    }

    /// Never empty: a quiet Low segment reads "Safe Route".
    pub fn reasons(&self) -> Vec<&'static str> {
        if self.factors.is_empty() && self.category == RiskCategory::Low {
            return vec![SAFE_ROUTE_LABEL];
        }
        self.hazards().map(Hazard::label).collect()
    }
}

/// Tunable weights, thresholds and probabilities of the scoring rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RiskConfig {
    pub sharp_curve_deg: f64,
    pub winding_road_deg: f64,
    pub sharp_curve_weight: u32,
    pub winding_road_weight: u32,
    pub narrow_road_weight: u32,
    pub congestion_probability: f64,
    /// Running score a segment must exceed before it can be a blackspot.
    pub blackspot_min_score: u32,
    pub blackspot_probability: f64,
    pub blackspot_weight: u32,
    pub high_speed_weight: u32,
    pub poor_lighting_weight: u32,
    /// The visibility score is added as `score * visibility_multiplier`.
    pub visibility_multiplier: u32,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            sharp_curve_deg: 45.0,
            winding_road_deg: 20.0,
            sharp_curve_weight: 30,
            winding_road_weight: 10,
            narrow_road_weight: 20,
            congestion_probability: 0.3,
            blackspot_min_score: 20,
            blackspot_probability: 0.2,
            blackspot_weight: 40,
            high_speed_weight: 10,
            poor_lighting_weight: 15,
            visibility_multiplier: 1,
        }
    }
}

impl RiskConfig {
    /// Same rules with the simulated hazards switched off.
    pub fn deterministic() -> Self {
        Self {
            congestion_probability: 0.0,
            blackspot_probability: 0.0,
            ..Self::default()
        }
    }
}

/// Decides whether a simulated hazard fires on a segment.
pub trait DecisionSource {
    fn decide(&mut self, hazard: Hazard, probability: f64) -> bool;
}

impl<F> DecisionSource for F
where
    F: FnMut(Hazard, f64) -> bool,
{
    fn decide(&mut self, hazard: Hazard, probability: f64) -> bool {
        self(hazard, probability)
    }
}

/// Answers every question the same way.
#[derive(Debug, Clone, Copy)]
pub struct FixedDecisions(pub bool);

impl DecisionSource for FixedDecisions {
    fn decide(&mut self, _hazard: Hazard, _probability: f64) -> bool {
        self.0
    }
}

/// Bernoulli draws from an owned generator.
#[derive(Debug, Clone)]
pub struct RandomDecisions<R> {
    rng: R,
}

impl<R: Rng> RandomDecisions<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RandomDecisions<SmallRng> {
    pub fn seeded(seed: u64) -> Self {
        Self::new(SmallRng::seed_from_u64(seed))
    }

    pub fn from_entropy() -> Self {
        Self::new(SmallRng::from_os_rng())
    }
}

impl<R: Rng> DecisionSource for RandomDecisions<R> {
    fn decide(&mut self, _hazard: Hazard, probability: f64) -> bool {
        if probability.is_nan() || probability <= 0.0 {
            return false;
        }
        if probability >= 1.0 {
            return true;
        }
        self.rng.random_bool(probability)
    }
}

#[derive(Debug, Clone, Default)]
pub struct RiskClassifier {
    config: RiskConfig,
}

impl RiskClassifier {
    pub fn new(config: RiskConfig) -> Self {
        Self { config }
    }

    /// Scores one segment. Rules are additive and evaluated in a fixed order;
    /// the blackspot guard only sees the curvature and lane contributions.
    pub fn classify<D>(&self, attrs: &SegmentAttributes, visibility: u32, decisions: &mut D) -> RiskResult
    where
        D: DecisionSource + ?Sized,
    {
        let cfg = &self.config;
        let mut factors = Factors::default();

        let curve = attrs.geometry.as_deref().map(curvature).unwrap_or(0.0);
        if curve > cfg.sharp_curve_deg {
            factors.push(cfg.sharp_curve_weight, Hazard::SharpCurve);
        } else if curve > cfg.winding_road_deg {
            factors.push(cfg.winding_road_weight, Hazard::WindingRoad);
        }

        if attrs.lane_count() <= 1 {
            factors.push(cfg.narrow_road_weight, Hazard::NarrowRoad);
            if decisions.decide(Hazard::TrafficCongestion, cfg.congestion_probability) {
                factors.push(0, Hazard::TrafficCongestion);
            }
        }

        if factors.score() > cfg.blackspot_min_score
            && decisions.decide(Hazard::KnownBlackspot, cfg.blackspot_probability)
        {
            factors.push(cfg.blackspot_weight, Hazard::KnownBlackspot);
        }

        if let Some(highway) = &attrs.highway {
            if highway.is_high_speed() {
                factors.push(cfg.high_speed_weight, Hazard::HighSpeedZone);
            } else if highway.is_poorly_lit() {
                factors.push(cfg.poor_lighting_weight, Hazard::PoorLighting);
            }
        }

        if visibility > 0 {
            factors.push(
                visibility.saturating_mul(cfg.visibility_multiplier),
                Hazard::BadVisibility,
            );
        }

        tracing::trace!(curvature = curve, score = factors.score(), "classified segment");
        RiskResult::from_factors(factors.0)
    }
}

#[derive(Default)]
struct Factors(Vec<RiskFactor>);

impl Factors {
    fn push(&mut self, weight: u32, hazard: Hazard) {
        if self.0.iter().all(|f| f.hazard != hazard) {
            self.0.push(RiskFactor { weight, hazard });
        }
    }

    fn score(&self) -> u32 {
        self.0.iter().map(|f| f.weight).sum()
    }
}
