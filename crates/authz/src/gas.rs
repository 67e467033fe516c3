//! Metering of evaluation cost.
//!
//! The evaluator charges a [`GasMeter`] for work whose cost grows with the
//! size of a stored record. The meter is owned by the caller and shared
//! across everything run for one instruction.

use thiserror::Error;

/// Units charged for each allow-list entry scanned.
pub const GAS_COST_PER_ITERATION: u64 = 10;

/// Descriptor used when charging for the allow-list scan.
pub const SEND_AUTHORIZATION_DESCRIPTOR: &str = "send authorization";

/// The meter's budget ran out.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("out of gas in {descriptor}: limit {limit}, consumed {consumed}")]
pub struct OutOfGas {
    pub descriptor: String,
    pub limit: u64,
    pub consumed: u64,
}

/// A resource budget that work is charged against.
pub trait GasMeter {
    /// Charge `amount` units. Fails once the budget is exceeded.
    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), OutOfGas>;

    /// Units charged so far.
    fn gas_consumed(&self) -> u64;

    /// Total budget, `None` for unbounded meters.
    fn limit(&self) -> Option<u64>;
}

/// A meter with a fixed budget.
#[derive(Debug, Clone)]
pub struct BasicGasMeter {
    limit: u64,
    consumed: u64,
}

impl BasicGasMeter {
    pub fn new(limit: u64) -> Self {
        Self { limit, consumed: 0 }
    }

    pub fn remaining(&self) -> u64 {
        self.limit - self.consumed
    }
}

impl GasMeter for BasicGasMeter {
    fn consume_gas(&mut self, amount: u64, descriptor: &str) -> Result<(), OutOfGas> {
        match self.consumed.checked_add(amount) {
            Some(total) if total <= self.limit => {
                self.consumed = total;
                Ok(())
            }
            _ => {
                self.consumed = self.limit;
                Err(OutOfGas {
                    descriptor: descriptor.to_string(),
                    limit: self.limit,
                    consumed: self.consumed,
                })
            }
        }
    }

    fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    fn limit(&self) -> Option<u64> {
        Some(self.limit)
    }
}

/// A meter that only counts.
#[derive(Debug, Clone, Default)]
pub struct InfiniteGasMeter {
    consumed: u64,
}

impl InfiniteGasMeter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl GasMeter for InfiniteGasMeter {
    fn consume_gas(&mut self, amount: u64, _descriptor: &str) -> Result<(), OutOfGas> {
        self.consumed = self.consumed.saturating_add(amount);
        Ok(())
    }

    fn gas_consumed(&self) -> u64 {
        self.consumed
    }

    fn limit(&self) -> Option<u64> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_meter_exact_budget() {
        let mut meter = BasicGasMeter::new(20);
        meter.consume_gas(10, "a").unwrap();
        meter.consume_gas(10, "b").unwrap();
        assert_eq!(meter.remaining(), 0);
    }

    #[test]
    fn test_basic_meter_out_of_gas() {
        let mut meter = BasicGasMeter::new(15);
        meter.consume_gas(10, "a").unwrap();
        let err = meter.consume_gas(10, "scan").unwrap_err();
        assert_eq!(err.descriptor, "scan");
        assert_eq!(err.limit, 15);
        assert_eq!(meter.gas_consumed(), 15);
    }

    #[test]
    fn test_basic_meter_overflow() {
        let mut meter = BasicGasMeter::new(u64::MAX);
        meter.consume_gas(u64::MAX, "a").unwrap();
        assert!(meter.consume_gas(1, "b").is_err());
    }

    #[test]
    fn test_infinite_meter_counts() {
        let mut meter = InfiniteGasMeter::new();
        meter.consume_gas(u64::MAX, "a").unwrap();
        meter.consume_gas(5, "b").unwrap();
        assert_eq!(meter.gas_consumed(), u64::MAX);
        assert_eq!(meter.limit(), None);
    }
}
