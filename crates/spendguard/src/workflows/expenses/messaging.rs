use std::sync::{Mutex, PoisonError};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

use super::domain::RiskLevel;

const NAME_SLOT: &str = "{name}";

const LOW_TEMPLATES: [&str; 3] = [
    "🌟 Great job, {name}! Your expense looks clean and compliant!",
    "✨ Perfect! {name}, you're a compliance superstar!",
    "🎯 Excellent work, {name}! Keep up the good expense habits!",
];

const MEDIUM_TEMPLATES: [&str; 3] = [
    "⚠️ Hey {name}, this expense needs a closer look. Double-check the details!",
    "🔍 {name}, we noticed some flags. Please review your submission.",
    "💡 {name}, consider adding more details to improve compliance!",
];

const HIGH_TEMPLATES: [&str; 3] = [
    "🚨 Hold on, {name}! This expense has multiple red flags. Please review carefully.",
    "⛔ {name}, this expense requires immediate attention from your manager.",
    "🔴 Alert! {name}, this expense shows high-risk patterns. Contact finance team.",
];

pub fn templates(level: RiskLevel) -> &'static [&'static str; 3] {
    match level {
        RiskLevel::Low => &LOW_TEMPLATES,
        RiskLevel::Medium => &MEDIUM_TEMPLATES,
        RiskLevel::High => &HIGH_TEMPLATES,
    }
}

/// Picks one of the level's templates uniformly and fills in the display name.
pub fn render_message<R>(level: RiskLevel, display_name: &str, rng: &mut R) -> String
where
    R: Rng + ?Sized,
{
    let options = templates(level);
    let template = options.choose(rng).copied().unwrap_or(options[0]);
    template.replace(NAME_SLOT, display_name)
}

/// Shared message source for the service; seed it to make selections reproducible.
#[derive(Debug)]
pub struct MessageComposer {
    rng: Mutex<StdRng>,
}

impl MessageComposer {
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    pub fn from_entropy() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn from_seed(seed: Option<u64>) -> Self {
        seed.map_or_else(Self::from_entropy, Self::seeded)
    }

    pub fn compose(&self, level: RiskLevel, display_name: &str) -> String {
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        render_message(level, display_name, &mut *rng)
    }
}
