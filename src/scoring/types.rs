use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// One ranked match, best-first in result lists.
pub struct MatchResult {
    /// Key of the stored record.
    pub key: String,
    /// Score under the transform used by the query.
    pub score: f32,
}

impl MatchResult {
    pub fn new(key: impl Into<String>, score: f32) -> Self {
        Self {
            key: key.into(),
            score,
        }
    }
}

impl std::fmt::Display for MatchResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.4})", self.key, self.score)
    }
}
