use serde::Deserialize;

/// Complexity estimator tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EstimatorConfig {
    /// Prompt length (in characters) at which the length factor saturates
    #[serde(default = "default_length_ceiling")]
    pub length_ceiling: usize,
    /// Distinct keyword matches at which the keyword factor saturates
    #[serde(default = "default_max_keyword_matches")]
    pub max_keyword_matches: usize,
    /// Replacement trigger keywords; the built-in list is used when absent
    #[serde(default)]
    pub keywords: Option<Vec<String>>,
    #[serde(default)]
    pub weights: WeightsConfig,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            length_ceiling: default_length_ceiling(),
            max_keyword_matches: default_max_keyword_matches(),
            keywords: None,
            weights: WeightsConfig::default(),
        }
    }
}

/// Factor weights, which must sum to 1.0
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightsConfig {
    #[serde(default = "default_length_weight")]
    pub length: f64,
    #[serde(default = "default_keyword_weight")]
    pub keyword: f64,
    #[serde(default = "default_code_weight")]
    pub code: f64,
    #[serde(default = "default_task_type_weight")]
    pub task_type: f64,
}

impl WeightsConfig {
    /// Sum of all four weights
    pub fn total(&self) -> f64 {
        self.length + self.keyword + self.code + self.task_type
    }
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            length: default_length_weight(),
            keyword: default_keyword_weight(),
            code: default_code_weight(),
            task_type: default_task_type_weight(),
        }
    }
}

const fn default_length_ceiling() -> usize {
    2000
}

const fn default_max_keyword_matches() -> usize {
    3
}

const fn default_length_weight() -> f64 {
    0.30
}

const fn default_keyword_weight() -> f64 {
    0.30
}

const fn default_code_weight() -> f64 {
    0.25
}

const fn default_task_type_weight() -> f64 {
    0.15
}
