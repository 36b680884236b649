use serde::Serialize;

use crate::config::CompositeSettings;
use crate::indicators::registry::{Category, Region};
use crate::models::AnalysisResult;

/// Percentile scores per composite category for one region.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompositeInput {
    pub growth: Vec<f64>,
    pub labor: Vec<f64>,
    pub sentiment: Vec<f64>,
}

impl CompositeInput {
    /// Collects measured `percentile_all` values of scored results in a region.
    pub fn from_results(results: &[AnalysisResult], region: Region) -> Self {
        let mut input = CompositeInput::default();
        for result in results.iter().filter(|r| r.region == region && r.is_scored()) {
            let Some(pct) = result.percentile_all.filter(|v| v.is_finite()) else {
                continue;
            };
            match result.category {
                Some(Category::Growth) => input.growth.push(pct),
                Some(Category::Labor) => input.labor.push(pct),
                Some(Category::Sentiment) => input.sentiment.push(pct),
                _ => {}
            }
        }
        input
    }

    pub fn total(&self) -> usize {
        self.growth.len() + self.labor.len() + self.sentiment.len()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompositeScore {
    pub growth: Option<f64>,
    pub labor: Option<f64>,
    pub sentiment: Option<f64>,
    pub composite: Option<f64>,
    pub n_growth: usize,
    pub n_labor: usize,
    pub n_sentiment: usize,
    pub n_total: usize,
    pub has_min_data: bool,
}

impl CompositeScore {
    pub fn band(&self) -> ScoreBand {
        ScoreBand::from_score(self.composite)
    }
}

/// Weighted macro score for one region.
///
/// A category sub-score needs `min_per_category` values; the composite needs
/// `min_total` values across all categories. Weights of missing sub-scores
/// are dropped and the rest rescaled to sum to one.
pub fn composite_score(input: &CompositeInput, settings: &CompositeSettings) -> CompositeScore {
    let sub_score = |values: &[f64]| {
        (values.len() >= settings.min_per_category && !values.is_empty())
            .then(|| values.iter().sum::<f64>() / values.len() as f64)
    };

    let growth = sub_score(&input.growth);
    let labor = sub_score(&input.labor);
    let sentiment = sub_score(&input.sentiment);

    let n_total = input.total();
    let has_min_data = n_total >= settings.min_total;

    let composite = if has_min_data {
        let weights = &settings.weights;
        let weighted: Vec<(f64, f64)> = [
            (weights.growth, growth),
            (weights.labor, labor),
            (weights.sentiment, sentiment),
        ]
        .into_iter()
        .filter_map(|(w, v)| v.map(|v| (w, v)))
        .collect();

        let total_weight: f64 = weighted.iter().map(|(w, _)| w).sum();
        (total_weight > 0.0)
            .then(|| weighted.iter().map(|(w, v)| w * v).sum::<f64>() / total_weight)
    } else {
        None
    };

    CompositeScore {
        growth,
        labor,
        sentiment,
        composite,
        n_growth: input.growth.len(),
        n_labor: input.labor.len(),
        n_sentiment: input.sentiment.len(),
        n_total,
        has_min_data,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScoreBand {
    Strong,
    Neutral,
    Weak,
    NoData,
}

impl ScoreBand {
    pub fn from_score(score: Option<f64>) -> Self {
        match score {
            None => ScoreBand::NoData,
            Some(s) if s >= 60.0 => ScoreBand::Strong,
            Some(s) if s >= 40.0 => ScoreBand::Neutral,
            Some(_) => ScoreBand::Weak,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScoreBand::Strong => "Strong",
            ScoreBand::Neutral => "Neutral",
            ScoreBand::Weak => "Weak",
            ScoreBand::NoData => "No Data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(growth: &[f64], labor: &[f64], sentiment: &[f64]) -> CompositeInput {
        CompositeInput {
            growth: growth.to_vec(),
            labor: labor.to_vec(),
            sentiment: sentiment.to_vec(),
        }
    }

    #[test]
    fn test_single_indicator_category_is_unavailable() {
        let settings = CompositeSettings::default();
        let score = composite_score(&input(&[70.0], &[40.0, 60.0], &[]), &settings);
        assert_eq!(score.growth, None);
        assert_eq!(score.labor, Some(50.0));
        assert_eq!(score.sentiment, None);
    }

    #[test]
    fn test_composite_needs_six_in_total() {
        let settings = CompositeSettings::default();

        // 2 + 2 + 1 = 5: every eligible category scored, no composite
        let five = composite_score(&input(&[60.0, 80.0], &[40.0, 60.0], &[90.0]), &settings);
        assert_eq!(five.growth, Some(70.0));
        assert!(!five.has_min_data);
        assert_eq!(five.composite, None);
        assert_eq!(five.band(), ScoreBand::NoData);

        // 2 + 2 + 2 = 6
        let six = composite_score(&input(&[60.0, 80.0], &[40.0, 60.0], &[90.0, 70.0]), &settings);
        assert!(six.has_min_data);
        let expected = 0.5 * 70.0 + 0.3 * 50.0 + 0.2 * 80.0;
        assert!((six.composite.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_missing_sub_score_weights_are_rescaled() {
        let settings = CompositeSettings::default();
        // Sentiment has one value: counts toward the total, has no sub-score
        let score = composite_score(
            &input(&[60.0, 80.0, 70.0], &[40.0, 60.0], &[10.0]),
            &settings,
        );
        assert_eq!(score.n_total, 6);
        assert_eq!(score.sentiment, None);
        let expected = (0.5 * 70.0 + 0.3 * 50.0) / 0.8;
        assert!((score.composite.unwrap() - expected).abs() < 1e-9);
    }

    #[test]
    fn test_no_eligible_category_means_no_composite() {
        let mut settings = CompositeSettings::default();
        settings.min_per_category = 4;
        let score = composite_score(&input(&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0], &[]), &settings);
        assert!(score.has_min_data);
        assert_eq!(score.composite, None);
    }

    #[test]
    fn test_score_bands() {
        assert_eq!(ScoreBand::from_score(Some(60.0)), ScoreBand::Strong);
        assert_eq!(ScoreBand::from_score(Some(59.9)), ScoreBand::Neutral);
        assert_eq!(ScoreBand::from_score(Some(40.0)), ScoreBand::Neutral);
        assert_eq!(ScoreBand::from_score(Some(39.9)), ScoreBand::Weak);
        assert_eq!(ScoreBand::NoData.as_str(), "No Data");
    }
}
