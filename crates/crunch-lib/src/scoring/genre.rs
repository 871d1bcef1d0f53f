//! Genre-risk score
//!
//! Each game's genre codes collapse into one of seven buckets; the studio
//! score is the average crunch likelihood of its games' buckets.

use crate::error::{Result, ScorerError};
use crate::sources::GameCatalog;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Genre buckets, in tie-breaking order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GenreBucket {
    Action,
    Sports,
    Rpg,
    Strategy,
    Adventure,
    Puzzle,
    Simulation,
}

impl GenreBucket {
    pub const ALL: [GenreBucket; 7] = [
        GenreBucket::Action,
        GenreBucket::Sports,
        GenreBucket::Rpg,
        GenreBucket::Strategy,
        GenreBucket::Adventure,
        GenreBucket::Puzzle,
        GenreBucket::Simulation,
    ];

    /// Empirical likelihood that a studio focused on this genre crunches
    pub fn crunch_likelihood(self) -> f64 {
        match self {
            GenreBucket::Action => 0.48,
            GenreBucket::Sports => 0.32,
            GenreBucket::Rpg => 0.40,
            GenreBucket::Strategy => 0.40,
            GenreBucket::Adventure => 0.12,
            GenreBucket::Puzzle => 0.20,
            GenreBucket::Simulation => 0.08,
        }
    }

    fn index(self) -> usize {
        self as usize
    }

    /// Codes naming one genre unambiguously
    fn from_specific_code(code: u32) -> Option<Self> {
        match code {
            9 => Some(GenreBucket::Puzzle),
            12 => Some(GenreBucket::Rpg),
            13 => Some(GenreBucket::Simulation),
            14 => Some(GenreBucket::Sports),
            15 => Some(GenreBucket::Strategy),
            31 => Some(GenreBucket::Adventure),
            _ => None,
        }
    }

    /// Codes that only hint at a bucket
    fn from_ambiguous_code(code: u32) -> Option<Self> {
        match code {
            4 | 5 | 25 | 33 => Some(GenreBucket::Action),
            2 | 7 | 8 | 26 | 30 => Some(GenreBucket::Puzzle),
            10 => Some(GenreBucket::Sports),
            11 | 16 | 24 => Some(GenreBucket::Strategy),
            32 => Some(GenreBucket::Adventure),
            _ => None,
        }
    }

    /// Bucket for one game's genre codes; `None` when the game has no codes
    pub fn classify(codes: &[u32]) -> Option<Self> {
        if codes.is_empty() {
            return None;
        }

        if let Some(bucket) = codes.iter().find_map(|c| Self::from_specific_code(*c)) {
            return Some(bucket);
        }

        let mut votes = [0usize; 7];
        for bucket in codes.iter().filter_map(|c| Self::from_ambiguous_code(*c)) {
            votes[bucket.index()] += 1;
        }

        // First maximum wins ties
        let mut best = 0;
        for (i, count) in votes.iter().enumerate() {
            if *count > votes[best] {
                best = i;
            }
        }
        Some(Self::ALL[best])
    }
}

/// Scores the genre mix of a studio's games
pub trait GenreScorer: Send + Sync {
    /// Score in `[0, 1]` from the genre codes of each game
    fn score(&self, games: &[Vec<u32>]) -> Result<f64>;
}

/// Average of per-game bucket likelihoods
#[derive(Debug, Clone, Copy, Default)]
pub struct WeightedGenreScorer;

impl GenreScorer for WeightedGenreScorer {
    fn score(&self, games: &[Vec<u32>]) -> Result<f64> {
        let likelihoods: Vec<f64> = games
            .iter()
            .filter_map(|codes| GenreBucket::classify(codes))
            .map(GenreBucket::crunch_likelihood)
            .collect();

        if likelihoods.is_empty() {
            return Err(ScorerError::InsufficientData(
                "no game carries genre codes".to_string(),
            ));
        }

        Ok(likelihoods.iter().sum::<f64>() / likelihoods.len() as f64)
    }
}

/// Fetch genre codes for the first name or alias the catalog knows
///
/// Returns the matching name together with the codes of each game.
pub fn genre_codes_with_fallback(
    catalog: &dyn GameCatalog,
    name: &str,
    aliases: &[String],
) -> anyhow::Result<(String, Vec<Vec<u32>>)> {
    let candidates = std::iter::once(name).chain(aliases.iter().map(String::as_str));
    let mut tried = 0;

    for candidate in candidates {
        tried += 1;
        let games = catalog.genre_codes(candidate)?;
        if games.iter().any(|codes| !codes.is_empty()) {
            debug!(studio = %name, matched = %candidate, games = games.len(), "Found genre codes");
            return Ok((candidate.to_string(), games));
        }
    }

    Err(ScorerError::StudioNotFound {
        name: name.to_string(),
        tried,
    }
    .into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeCatalog(HashMap<String, Vec<Vec<u32>>>);

    impl GameCatalog for FakeCatalog {
        fn genre_codes(&self, name: &str) -> anyhow::Result<Vec<Vec<u32>>> {
            Ok(self.0.get(name).cloned().unwrap_or_default())
        }
    }

    #[test]
    fn test_specific_code_takes_precedence() {
        // Shooter + Arcade votes Action, but RPG is explicit
        assert_eq!(GenreBucket::classify(&[5, 33, 12]), Some(GenreBucket::Rpg));
        // First specific code in the list wins
        assert_eq!(GenreBucket::classify(&[13, 14]), Some(GenreBucket::Simulation));
        assert_eq!(GenreBucket::classify(&[31]), Some(GenreBucket::Adventure));
    }

    #[test]
    fn test_ambiguous_codes_vote() {
        assert_eq!(GenreBucket::classify(&[2, 7, 5]), Some(GenreBucket::Puzzle));
        assert_eq!(GenreBucket::classify(&[11, 16, 10]), Some(GenreBucket::Strategy));
        assert_eq!(GenreBucket::classify(&[32]), Some(GenreBucket::Adventure));
    }

    #[test]
    fn test_vote_ties_use_bucket_order() {
        // Sports (index 1) and Puzzle (index 5) tie
        assert_eq!(GenreBucket::classify(&[8, 10]), Some(GenreBucket::Sports));
        // Unknown codes only: every bucket has zero votes
        assert_eq!(GenreBucket::classify(&[99, 100]), Some(GenreBucket::Action));
        assert_eq!(GenreBucket::classify(&[]), None);
    }

    #[test]
    fn test_weighted_average() {
        let games = vec![vec![12], vec![13], vec![], vec![4, 5]];
        let score = WeightedGenreScorer.score(&games).unwrap();
        let expected = (0.40 + 0.08 + 0.48) / 3.0;
        assert!((score - expected).abs() < 1e-12);
    }

    #[test]
    fn test_score_in_unit_interval() {
        let mut games = Vec::new();
        for code in 0..40u32 {
            games.push(vec![code]);
            games.push(vec![code, (code * 7) % 40]);
            let score = WeightedGenreScorer.score(&games).unwrap();
            assert!((0.0..=1.0).contains(&score));
        }
    }

    #[test]
    fn test_no_genres_is_insufficient() {
        assert!(matches!(
            WeightedGenreScorer.score(&[vec![], vec![]]),
            Err(ScorerError::InsufficientData(_))
        ));
    }

    #[test]
    fn test_alias_fallback() {
        let mut map = HashMap::new();
        map.insert("Bioware".to_string(), vec![vec![12], vec![12, 31]]);
        let catalog = FakeCatalog(map);

        let aliases = vec!["Bioware Games".to_string(), "Bioware".to_string()];
        let (matched, games) =
            genre_codes_with_fallback(&catalog, "Bioware Studios", &aliases).unwrap();
        assert_eq!(matched, "Bioware");
        assert_eq!(games.len(), 2);
    }

    #[test]
    fn test_all_aliases_exhausted() {
        let catalog = FakeCatalog(HashMap::new());
        let aliases = vec!["A".to_string(), "B".to_string()];
        let err = genre_codes_with_fallback(&catalog, "Nobody", &aliases).unwrap_err();
        let scorer_err = err.downcast_ref::<ScorerError>().unwrap();
        assert_eq!(
            scorer_err,
            &ScorerError::StudioNotFound {
                name: "Nobody".to_string(),
                tried: 3
            }
        );
    }
}
