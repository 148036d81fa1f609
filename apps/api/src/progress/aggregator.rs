//! Progress aggregator: summary statistics over a user's attempt history.
//!
//! Stateless: recomputed from the full history on every request. Callers pass
//! attempts newest first; "last" and "most recent" below mean "earliest in
//! the slice" and the order is not re-checked here.
//!
//! An attempt's overall is the stored (engine-reported) value when present,
//! falling back to the rounded mean of its criteria.

use std::collections::HashMap;

use serde::Serialize;

use crate::models::attempt::Attempt;
use crate::models::category::{Category, Skill};
use crate::models::score::Criterion;
use crate::scoring::band::{clamp_band, round_half};

/// Weighted band is only reported once there is enough history to weigh.
pub const WEIGHTED_BAND_MIN_ATTEMPTS: usize = 3;
pub const PREDICTION_WINDOW: usize = 5;
/// Exam-day conditions are harder than practice.
pub const PREDICTION_PENALTY: f64 = 0.25;
pub const TOP_WEAKNESSES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryStat {
    pub category: String,
    pub count: usize,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CriterionStat {
    pub criterion: Criterion,
    pub count: usize,
    pub average: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeaknessCount {
    pub weakness: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressSummary {
    pub skill: Skill,
    pub total_attempts: usize,
    pub scored_attempts: usize,
    pub best_overall: Option<f64>,
    pub average_overall: Option<f64>,
    pub last_overall: Option<f64>,
    pub categories: Vec<CategoryStat>,
    pub criteria: Vec<CriterionStat>,
    pub weighted_band: Option<f64>,
    pub predicted_band: Option<f64>,
    pub weakest_criterion: Option<Criterion>,
    pub top_weaknesses: Vec<WeaknessCount>,
}

/// Summarizes a skill's attempts. Attempts of other skills are ignored.
/// Returns `None` when there is nothing to summarize.
pub fn summarize(skill: Skill, attempts: &[Attempt]) -> Option<ProgressSummary> {
    let attempts: Vec<&Attempt> = attempts.iter().filter(|a| a.skill() == skill).collect();
    if attempts.is_empty() {
        return None;
    }

    let scored: Vec<(&Attempt, f64)> = attempts
        .iter()
        .filter_map(|a| a.overall().map(|o| (*a, o)))
        .collect();
    let overalls: Vec<f64> = scored.iter().map(|(_, o)| *o).collect();
    let criteria = criterion_breakdown(skill, &attempts);

    Some(ProgressSummary {
        skill,
        total_attempts: attempts.len(),
        scored_attempts: scored.len(),
        best_overall: overalls.iter().copied().reduce(f64::max),
        average_overall: mean(&overalls),
        last_overall: attempts[0].overall(),
        categories: category_breakdown(skill, &scored),
        weighted_band: weighted_band(&scored),
        predicted_band: predicted_band(&overalls),
        weakest_criterion: weakest_criterion(&criteria),
        criteria,
        top_weaknesses: top_weaknesses(&attempts, TOP_WEAKNESSES),
    })
}

fn category_breakdown(skill: Skill, scored: &[(&Attempt, f64)]) -> Vec<CategoryStat> {
    Category::all(skill)
        .into_iter()
        .map(|category| {
            let values: Vec<f64> = scored
                .iter()
                .filter(|(a, _)| a.category == category)
                .map(|(_, o)| *o)
                .collect();
            CategoryStat {
                category: category.label(),
                count: values.len(),
                average: mean(&values),
            }
        })
        .collect()
}

fn criterion_breakdown(skill: Skill, attempts: &[&Attempt]) -> Vec<CriterionStat> {
    skill
        .criteria()
        .iter()
        .map(|&criterion| {
            let values: Vec<f64> = attempts
                .iter()
                .filter_map(|a| a.score.as_ref().and_then(|s| s.band(criterion)))
                .collect();
            CriterionStat {
                criterion,
                count: values.len(),
                average: mean(&values),
            }
        })
        .collect()
}

/// Weighted band for the summary. `None` below `WEIGHTED_BAND_MIN_ATTEMPTS`
/// scored attempts.
pub fn weighted_band(scored: &[(&Attempt, f64)]) -> Option<f64> {
    if scored.len() < WEIGHTED_BAND_MIN_ATTEMPTS {
        return None;
    }
    weighted_mean(scored)
}

/// Σ(overall × weight) / Σweight, where harder categories weigh more.
pub fn weighted_mean(scored: &[(&Attempt, f64)]) -> Option<f64> {
    let (sum, total_weight) = scored
        .iter()
        .fold((0.0, 0.0), |(sum, total), (attempt, overall)| {
            let w = attempt.category.weight();
            (sum + overall * w, total + w)
        });
    (total_weight > 0.0).then(|| sum / total_weight)
}

/// Mean of the most recent scored overalls, less the exam-day penalty,
/// rounded to the nearest half band.
pub fn predicted_band(overalls_newest_first: &[f64]) -> Option<f64> {
    let window = &overalls_newest_first[..overalls_newest_first.len().min(PREDICTION_WINDOW)];
    let recent = mean(window)?;
    Some(clamp_band(round_half(recent - PREDICTION_PENALTY)))
}

/// Lowest-average criterion with at least one sample. Ties go to the
/// criterion listed first.
pub fn weakest_criterion(stats: &[CriterionStat]) -> Option<Criterion> {
    let mut weakest: Option<(Criterion, f64)> = None;
    for stat in stats {
        let Some(avg) = stat.average else { continue };
        match weakest {
            Some((_, lowest)) if avg >= lowest => {}
            _ => weakest = Some((stat.criterion, avg)),
        }
    }
    weakest.map(|(criterion, _)| criterion)
}

/// Most frequent weakness labels across all attempts. Equal counts keep
/// first-seen order.
pub fn top_weaknesses(attempts: &[&Attempt], limit: usize) -> Vec<WeaknessCount> {
    let mut counts: Vec<WeaknessCount> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for weakness in attempts
        .iter()
        .filter_map(|a| a.score.as_ref())
        .flat_map(|s| s.weaknesses.iter())
    {
        match index.get(weakness.as_str()) {
            Some(&i) => counts[i].count += 1,
            None => {
                index.insert(weakness.as_str(), counts.len());
                counts.push(WeaknessCount {
                    weakness: weakness.clone(),
                    count: 1,
                });
            }
        }
    }

    // Stable sort keeps first-seen order among ties.
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts.truncate(limit);
    counts
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(values.iter().sum::<f64>() / values.len() as f64)
}
