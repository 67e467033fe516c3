//! Multi-denomination coin amounts.
//!
//! A [`Coins`] value is a set of [`Coin`]s kept sorted by denomination, with
//! each denomination appearing at most once. Its text form is the familiar
//! `100atom,40stake`, which is also what serde reads and writes.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// A single denomination and amount.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Coin {
    pub denom: String,
    pub amount: u128,
}

impl Coin {
    /// Create a coin, checking the denomination.
    pub fn new(denom: impl Into<String>, amount: u128) -> Result<Self> {
        let denom = denom.into();
        validate_denom(&denom)?;
        Ok(Self { denom, amount })
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }
}

impl fmt::Display for Coin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.amount, self.denom)
    }
}

impl FromStr for Coin {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| Error::InvalidCoins(format!("missing denomination in '{s}'")))?;
        if split == 0 {
            return Err(Error::InvalidCoins(format!("missing amount in '{s}'")));
        }

        let amount = s[..split]
            .parse::<u128>()
            .map_err(|e| Error::InvalidCoins(format!("bad amount in '{s}': {e}")))?;
        Coin::new(s[split..].trim(), amount)
    }
}

/// Denominations: a letter followed by 2 to 127 of `[a-zA-Z0-9/:._-]`.
fn validate_denom(denom: &str) -> Result<()> {
    let mut chars = denom.chars();
    let first_ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic());
    let rest_ok =
        chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | ':' | '.' | '_' | '-'));

    if first_ok && rest_ok && (3..=128).contains(&denom.len()) {
        Ok(())
    } else {
        Err(Error::InvalidCoins(format!("invalid denom: '{denom}'")))
    }
}

/// A sorted set of coins with unique denominations.
///
/// Zero amounts can be held so that validation has something to reject, but
/// results of [`Coins::safe_sub`] and [`Coins::checked_add`] never contain
/// them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Coins(Vec<Coin>);

impl Coins {
    /// Build a coin set, sorting by denomination.
    ///
    /// Fails if a denomination appears twice.
    pub fn new(mut coins: Vec<Coin>) -> Result<Self> {
        coins.sort_by(|a, b| a.denom.cmp(&b.denom));
        if let Some(pair) = coins.windows(2).find(|w| w[0].denom == w[1].denom) {
            return Err(Error::InvalidCoins(format!(
                "duplicate denomination: {}",
                pair[0].denom
            )));
        }
        Ok(Self(coins))
    }

    /// The empty set.
    pub fn empty() -> Self {
        Self(Vec::new())
    }

    /// A set holding one coin.
    pub fn single(denom: impl Into<String>, amount: u128) -> Result<Self> {
        Ok(Self(vec![Coin::new(denom, amount)?]))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Coin> {
        self.0.iter()
    }

    /// True when the set is empty or every amount is zero.
    pub fn is_zero(&self) -> bool {
        self.0.iter().all(Coin::is_zero)
    }

    /// True when the set is non-empty and every amount is strictly positive.
    pub fn is_all_positive(&self) -> bool {
        !self.0.is_empty() && self.0.iter().all(Coin::is_positive)
    }

    /// Amount held of `denom`, zero if absent.
    pub fn amount_of(&self, denom: &str) -> u128 {
        self.0
            .binary_search_by(|c| c.denom.as_str().cmp(denom))
            .map(|i| self.0[i].amount)
            .unwrap_or(0)
    }

    /// Subtract `other`, denomination by denomination.
    ///
    /// Returns `None` if any denomination would go negative, including one
    /// requested by `other` that `self` does not hold. Nothing is applied in
    /// that case.
    pub fn safe_sub(&self, other: &Coins) -> Option<Coins> {
        if other.iter().any(|c| self.amount_of(&c.denom) < c.amount) {
            return None;
        }

        let residual = self
            .0
            .iter()
            .filter_map(|c| {
                let left = c.amount - other.amount_of(&c.denom);
                (left > 0).then(|| Coin {
                    denom: c.denom.clone(),
                    amount: left,
                })
            })
            .collect();
        Some(Coins(residual))
    }

    /// Add `other`, returning `None` on overflow.
    pub fn checked_add(&self, other: &Coins) -> Option<Coins> {
        let mut merged: BTreeMap<&str, u128> = BTreeMap::new();
        for coin in self.iter().chain(other.iter()) {
            let entry = merged.entry(coin.denom.as_str()).or_default();
            *entry = entry.checked_add(coin.amount)?;
        }

        let coins = merged
            .into_iter()
            .filter(|(_, amount)| *amount > 0)
            .map(|(denom, amount)| Coin {
                denom: denom.to_string(),
                amount,
            })
            .collect();
        Some(Coins(coins))
    }
}

impl<'a> IntoIterator for &'a Coins {
    type Item = &'a Coin;
    type IntoIter = std::slice::Iter<'a, Coin>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl fmt::Display for Coins {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, coin) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(",")?;
            }
            write!(f, "{coin}")?;
        }
        Ok(())
    }
}

impl FromStr for Coins {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let coins = s
            .split(',')
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(Coin::from_str)
            .collect::<Result<Vec<_>>>()?;
        Coins::new(coins)
    }
}

impl TryFrom<String> for Coins {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Coins> for String {
    fn from(coins: Coins) -> Self {
        coins.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coins(s: &str) -> Coins {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_sorts_by_denom() {
        let c = coins("40stake, 100atom");
        assert_eq!(c.to_string(), "100atom,40stake");
        assert_eq!(c.amount_of("stake"), 40);
        assert_eq!(c.amount_of("uosmo"), 0);
    }

    #[test]
    fn test_parse_rejects_duplicate_denom() {
        let err = "1atom,2atom".parse::<Coins>().unwrap_err();
        assert!(matches!(err, Error::InvalidCoins(_)));
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        assert!("atom".parse::<Coins>().is_err());
        assert!("100".parse::<Coins>().is_err());
        assert!("100a".parse::<Coins>().is_err());
        assert!("100 9atom".parse::<Coins>().is_err());
        assert!("".parse::<Coins>().unwrap().is_empty());
    }

    #[test]
    fn test_ibc_style_denom() {
        let c = coins("5ibc/27394FB092D2ECCD56123C74F36E4C1F");
        assert_eq!(c.amount_of("ibc/27394FB092D2ECCD56123C74F36E4C1F"), 5);
    }

    #[test]
    fn test_safe_sub_partial() {
        let left = coins("100atom,10stake").safe_sub(&coins("40atom")).unwrap();
        assert_eq!(left, coins("60atom,10stake"));
    }

    #[test]
    fn test_safe_sub_drops_exhausted_denoms() {
        let left = coins("100atom,10stake").safe_sub(&coins("10stake")).unwrap();
        assert_eq!(left, coins("100atom"));

        let left = coins("100atom").safe_sub(&coins("100atom")).unwrap();
        assert!(left.is_empty());
        assert!(left.is_zero());
    }

    #[test]
    fn test_safe_sub_negative() {
        assert!(coins("100atom").safe_sub(&coins("150atom")).is_none());
        assert!(coins("100atom").safe_sub(&coins("1stake")).is_none());
        assert!(coins("100atom").safe_sub(&coins("50atom,1stake")).is_none());
    }

    #[test]
    fn test_checked_add() {
        let sum = coins("100atom").checked_add(&coins("5atom,7stake")).unwrap();
        assert_eq!(sum, coins("105atom,7stake"));

        let max = Coins::single("atom", u128::MAX).unwrap();
        assert!(max.checked_add(&coins("1atom")).is_none());
    }

    #[test]
    fn test_positivity() {
        assert!(coins("1atom,2stake").is_all_positive());
        assert!(!coins("0atom,2stake").is_all_positive());
        assert!(!Coins::empty().is_all_positive());
        assert!(coins("0atom").is_zero());
    }

    #[test]
    fn test_serde_as_string() {
        let c = coins("100atom,40stake");
        let json = serde_json::to_string(&c).unwrap();
        assert_eq!(json, "\"100atom,40stake\"");
        let back: Coins = serde_json::from_str(&json).unwrap();
        assert_eq!(back, c);
    }
}
