use serde::{Deserialize, Serialize};

/// Simulation parameters, usually read from the `[simulation]` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimConfig {
    /// Number of random accounts to create.
    #[serde(default = "default_accounts")]
    pub accounts: usize,

    /// Gas budget for each exec.
    #[serde(default = "default_gas_limit")]
    pub gas_limit: u64,

    /// Relative frequency of each operation.
    #[serde(default)]
    pub weights: Weights,
}

/// Operation weights. An operation with weight 0 never runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weights {
    #[serde(default = "default_weight")]
    pub grant: u32,
    #[serde(default = "default_weight")]
    pub revoke: u32,
    #[serde(default = "default_weight")]
    pub exec: u32,
}

fn default_accounts() -> usize {
    10
}

fn default_gas_limit() -> u64 {
    200_000
}

fn default_weight() -> u32 {
    100
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            accounts: default_accounts(),
            gas_limit: default_gas_limit(),
            weights: Weights::default(),
        }
    }
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            grant: default_weight(),
            revoke: default_weight(),
            exec: default_weight(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_table_uses_defaults() {
        let config: SimConfig = toml::from_str(
            r#"
accounts = 4

[weights]
revoke = 0
"#,
        )
        .unwrap();
        assert_eq!(config.accounts, 4);
        assert_eq!(config.gas_limit, 200_000);
        assert_eq!(config.weights.revoke, 0);
        assert_eq!(config.weights.grant, 100);
    }
}
