//! Structural score booster: applies substring-based multipliers to raw
//! FTS scores so well-trafficked source lands above generated/test/vendor
//! noise without a second ranking model.

use crate::fts::FtsHit;

#[derive(Debug, Clone)]
struct BoostRule {
    /// Substring matched against the hit's path (case-insensitive).
    pattern: &'static str,
    multiplier: f32,
}

/// A search hit with its final (boosted) score attached.
#[derive(Debug, Clone)]
pub struct BoostedHit {
    pub hit: FtsHit,
    pub raw_rank: f32,
    pub boosted_score: f32,
}

pub struct Booster {
    rules: Vec<BoostRule>,
}

impl Default for Booster {
    fn default() -> Self {
        Self {
            rules: vec![
                BoostRule { pattern: "/vendor/", multiplier: 0.4 },
                BoostRule { pattern: "/generated/", multiplier: 0.4 },
                BoostRule { pattern: ".generated.", multiplier: 0.4 },
                BoostRule { pattern: "/node_modules/", multiplier: 0.3 },
                BoostRule { pattern: "/test/", multiplier: 0.7 },
                BoostRule { pattern: "/tests/", multiplier: 0.7 },
                BoostRule { pattern: "_test.", multiplier: 0.7 },
                BoostRule { pattern: ".spec.", multiplier: 0.7 },
                BoostRule { pattern: "/examples/", multiplier: 0.8 },
                BoostRule { pattern: "/src/", multiplier: 1.15 },
            ],
        }
    }
}

impl Booster {
    /// Multiplier for `path`: the product of every rule whose pattern the
    /// path contains, so a file can stack penalties (e.g. a generated test
    /// fixture gets both the `/test/` and `/generated/` factors).
    pub fn multiplier_for(&self, path: &str) -> f32 {
        let lower = path.to_lowercase();
        self.rules
            .iter()
            .filter(|rule| lower.contains(rule.pattern))
            .map(|rule| rule.multiplier)
            .product::<f32>()
            .max(0.01)
            .min(4.0)
    }

    /// Apply boosting to a batch of FTS hits and re-sort by boosted score.
    pub fn apply(&self, hits: Vec<FtsHit>) -> Vec<BoostedHit> {
        let mut boosted: Vec<BoostedHit> = hits
            .into_iter()
            .map(|hit| {
                let multiplier = self.multiplier_for(&hit.path);
                let boosted_score = hit.rank * multiplier;
                BoostedHit {
                    raw_rank: hit.rank,
                    boosted_score,
                    hit,
                }
            })
            .collect();

        boosted.sort_by(|a, b| {
            b.boosted_score
                .partial_cmp(&a.boosted_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        boosted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(path: &str, rank: f32) -> FtsHit {
        FtsHit {
            path: path.to_string(),
            start_line: 1,
            end_line: 10,
            kind: "window".to_string(),
            content: "content".to_string(),
            rank,
        }
    }

    #[test]
    fn test_src_bonus_outranks_equal_raw_score() {
        let booster = Booster::default();
        let hits = vec![hit("src/lib.rs", 1.0), hit("tests/lib_test.rs", 1.0)];
        let boosted = booster.apply(hits);
        assert_eq!(boosted[0].hit.path, "src/lib.rs");
    }

    #[test]
    fn test_generated_and_test_penalties_stack() {
        let booster = Booster::default();
        let m = booster.multiplier_for("generated/widget_test.rs");
        assert!(m < 0.7);
    }

    #[test]
    fn test_default_multiplier_is_neutral() {
        let booster = Booster::default();
        assert_eq!(booster.multiplier_for("README.md"), 1.0);
    }
}
