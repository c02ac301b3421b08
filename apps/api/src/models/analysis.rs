use indexmap::IndexMap;

use serde::{Deserialize, Serialize};

/// Result of one analysis call. Field names match the JSON the model is
/// asked to produce and the JSON handed to the presentation layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResult {
    /// 0 – 100
    pub ats_score: u8,
    /// 0 – 100
    pub match_score: u8,
    pub missing_keywords: Vec<String>,
    pub suggestions: Vec<String>,
    /// keyword → percentage, in the order the model listed them
    pub keyword_density: IndexMap<String, f64>,
    #[serde(rename = "optimizedCV")]
    pub optimized_cv: String,
}

impl AnalysisResult {
    /// Returns the name of the first score outside 0 – 100, if any.
    pub fn out_of_range_score(&self) -> Option<(&'static str, u8)> {
        [("atsScore", self.ats_score), ("matchScore", self.match_score)]
            .into_iter()
            .find(|(_, score)| *score > 100)
    }
}
