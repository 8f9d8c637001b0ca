use serde::{Deserialize, Serialize};

/// Point-in-time summary of what is currently popular
///
/// Fetched once per recommendation call and never cached by the engine itself.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrendSnapshot {
    #[serde(default)]
    pub trending_colors: Vec<String>,
    #[serde(default)]
    pub trending_categories: Vec<String>,
    #[serde(default)]
    pub trending_styles: Vec<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl TrendSnapshot {
    pub fn is_empty(&self) -> bool {
        self.trending_colors.is_empty()
            && self.trending_categories.is_empty()
            && self.trending_styles.is_empty()
            && self.keywords.is_empty()
    }
}
