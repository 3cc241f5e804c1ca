/// Multi-factor scoring of a candidate against a recommendation context.
///
/// Scoring is a pure function of (candidate, context, now): no hidden state,
/// no mutation, so arbitrarily many scoring passes may run concurrently over
/// the same snapshot.
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

use crate::models::{
    Candidate, Mode, PopularitySignal, RatingScale, RecommendationContext, ScoreBreakdown,
    ScoredCandidate, UserState,
};

/// State → mode compatibility table. Each state enumerates a partial map of
/// the modes it favors; absent modes contribute zero. Injected into the
/// engine so it can be swapped or tested without global state.
#[derive(Debug, Clone)]
pub struct StateWeights(HashMap<UserState, HashMap<Mode, f64>>);

impl StateWeights {
    pub fn new(table: HashMap<UserState, HashMap<Mode, f64>>) -> Self {
        Self(table)
    }

    pub fn weight(&self, state: UserState, mode: Mode) -> f64 {
        self.0
            .get(&state)
            .and_then(|modes| modes.get(&mode))
            .copied()
            .unwrap_or(0.0)
    }
}

impl Default for StateWeights {
    fn default() -> Self {
        let mut table = HashMap::new();
        table.insert(
            UserState::Anxious,
            HashMap::from([(Mode::Comfort, 20.0), (Mode::Calm, 15.0), (Mode::Beauty, 10.0)]),
        );
        table.insert(
            UserState::Sad,
            HashMap::from([(Mode::Comfort, 20.0), (Mode::Beauty, 12.0), (Mode::Reflect, 8.0)]),
        );
        table.insert(
            UserState::Tired,
            HashMap::from([(Mode::Calm, 18.0), (Mode::Comfort, 12.0), (Mode::Beauty, 5.0)]),
        );
        table.insert(
            UserState::Restless,
            HashMap::from([(Mode::Energy, 20.0), (Mode::Logic, 12.0), (Mode::Calm, 6.0)]),
        );
        table.insert(
            UserState::Numb,
            HashMap::from([(Mode::Beauty, 15.0), (Mode::Energy, 10.0), (Mode::Reflect, 5.0)]),
        );
        // Blank deliberately has no entry: it weights nothing and is never
        // penalized.
        Self(table)
    }
}

/// Scoring constants. These were tuned by observation, not derived, so they
/// live in configuration rather than code.
#[derive(Debug, Clone)]
pub struct ScoringConfig {
    pub mode_match: f64,
    pub focus_match: f64,
    pub fresh_week: f64,
    pub fresh_month: f64,
    pub fresh_quarter: f64,
    pub popularity_cap: f64,
    /// (minimum exclusive count, bonus) tiers, checked highest first.
    pub count_bonus: Vec<(u64, f64)>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            mode_match: 50.0,
            focus_match: 25.0,
            fresh_week: 10.0,
            fresh_month: 5.0,
            fresh_quarter: 2.0,
            popularity_cap: 15.0,
            count_bonus: vec![(1000, 3.0), (500, 2.0), (100, 1.0)],
        }
    }
}

pub struct ScoringEngine {
    weights: StateWeights,
    config: ScoringConfig,
}

impl ScoringEngine {
    pub fn new(weights: StateWeights, config: ScoringConfig) -> Self {
        Self { weights, config }
    }

    /// Scores a candidate against the context using the current time.
    pub fn score(&self, candidate: &Candidate, ctx: &RecommendationContext) -> ScoreBreakdown {
        self.score_at(candidate, ctx, Utc::now())
    }

    /// Scores a candidate against the context at an explicit instant. Every
    /// component is computed independently and then summed; no component is
    /// ever negative, so adding a matching signal can only raise the total.
    pub fn score_at(
        &self,
        candidate: &Candidate,
        ctx: &RecommendationContext,
        now: DateTime<Utc>,
    ) -> ScoreBreakdown {
        let mode_match = if candidate.modes.contains(&ctx.mode) {
            self.config.mode_match
        } else {
            0.0
        };

        let focus_match = if candidate.focuses.contains(&ctx.focus) {
            self.config.focus_match
        } else {
            0.0
        };

        let state_weight = candidate
            .modes
            .iter()
            .map(|mode| self.weights.weight(ctx.state, *mode))
            .sum();

        let freshness = self.freshness(candidate.timestamp, now);
        let popularity = self.popularity(candidate.popularity);

        ScoreBreakdown {
            mode_match,
            focus_match,
            state_weight,
            freshness,
            popularity,
            total: mode_match + focus_match + state_weight + freshness + popularity,
        }
    }

    pub fn score_all(
        &self,
        candidates: Vec<Candidate>,
        ctx: &RecommendationContext,
    ) -> Vec<ScoredCandidate> {
        let now = Utc::now();
        candidates
            .into_iter()
            .map(|candidate| {
                let breakdown = self.score_at(&candidate, ctx, now);
                ScoredCandidate {
                    candidate,
                    breakdown,
                }
            })
            .collect()
    }

    /// Step function of age since the candidate's validated timestamp. A
    /// missing timestamp scores zero; it is never substituted with "now".
    fn freshness(&self, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
        let Some(ts) = timestamp else {
            return 0.0;
        };
        let age = now.signed_duration_since(ts);
        if age <= Duration::days(7) {
            self.config.fresh_week
        } else if age <= Duration::days(30) {
            self.config.fresh_month
        } else if age <= Duration::days(90) {
            self.config.fresh_quarter
        } else {
            0.0
        }
    }

    /// Normalizes a provider rating to a 0–10 basis, adds the count bonus,
    /// and clamps to [0, popularity_cap].
    fn popularity(&self, signal: Option<PopularitySignal>) -> f64 {
        let Some(signal) = signal else {
            return 0.0;
        };
        let rating = match signal.scale {
            RatingScale::ZeroToTen => signal.rating,
            RatingScale::ZeroToFive => signal.rating * 2.0,
        };
        let bonus = self
            .config
            .count_bonus
            .iter()
            .find(|(threshold, _)| signal.count > *threshold)
            .map(|(_, bonus)| *bonus)
            .unwrap_or(0.0);

        (rating + bonus).clamp(0.0, self.config.popularity_cap)
    }
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(StateWeights::default(), ScoringConfig::default())
    }
}
