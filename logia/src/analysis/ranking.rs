//! Cross-model ranking

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedModel {
    pub model: String,
    pub score: f64,
}

/// Models ordered by score
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ranking {
    pub ranked: Vec<RankedModel>,
    pub winner: Option<String>,
    /// Score difference between the first and second model
    pub margin: Option<f64>,
}

/// Rank models by score descending, ties broken by name
pub fn rank<I, S>(scores: I) -> Ranking
where
    I: IntoIterator<Item = (S, f64)>,
    S: Into<String>,
{
    let mut ranked: Vec<RankedModel> = scores
        .into_iter()
        .map(|(model, score)| RankedModel {
            model: model.into(),
            score,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.model.cmp(&b.model))
    });

    let winner = ranked.first().map(|r| r.model.clone());
    let margin = if ranked.len() >= 2 {
        Some(((ranked[0].score - ranked[1].score) * 100.0).round() / 100.0)
    } else {
        None
    };

    Ranking {
        ranked,
        winner,
        margin,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rank_orders_and_breaks_ties() {
        let ranking = rank(vec![("phi4", 5.0), ("llama3.2", 7.5), ("deepseek-r1_32b", 5.0)]);
        let order: Vec<&str> = ranking.ranked.iter().map(|r| r.model.as_str()).collect();
        assert_eq!(order, vec!["llama3.2", "deepseek-r1_32b", "phi4"]);
        assert_eq!(ranking.winner.as_deref(), Some("llama3.2"));
        assert_eq!(ranking.margin, Some(2.5));
    }

    #[test]
    fn test_rank_single_and_empty() {
        let single = rank(vec![("phi4".to_string(), 3.33)]);
        assert_eq!(single.winner.as_deref(), Some("phi4"));
        assert_eq!(single.margin, None);

        let empty = rank(Vec::<(String, f64)>::new());
        assert!(empty.winner.is_none());
        assert!(empty.ranked.is_empty());
    }
}
