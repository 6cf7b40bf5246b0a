use serde::Deserialize;

/// Cost ledger configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Number of recent request outcomes kept for audit
    #[serde(default = "default_audit_capacity")]
    pub audit_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            audit_capacity: default_audit_capacity(),
        }
    }
}

const fn default_audit_capacity() -> usize {
    1000
}
