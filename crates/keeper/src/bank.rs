//! Balance movements for executed instructions.

use crate::{Error, Result};
use authz::{Coins, Msg};
use storage::Store;

/// Move the funds `msg` describes.
pub(crate) fn apply(store: &Store, msg: &Msg) -> Result<()> {
    match msg {
        Msg::Send(send) => {
            debit(store, &send.from_address, &send.amount)?;
            credit(store, &send.to_address, &send.amount)?;
        }
        Msg::MultiSend(multi) => {
            let inputs = total(multi.inputs.iter().map(|io| &io.coins))?;
            let outputs = total(multi.outputs.iter().map(|io| &io.coins))?;
            if inputs != outputs {
                return Err(Error::UnbalancedMultiSend { inputs, outputs });
            }
            for input in &multi.inputs {
                debit(store, &input.address, &input.coins)?;
            }
            for output in &multi.outputs {
                credit(store, &output.address, &output.coins)?;
            }
        }
    }
    Ok(())
}

pub(crate) fn debit(store: &Store, address: &str, amount: &Coins) -> Result<Coins> {
    let balance = store.balance(address)?;
    let left = balance
        .safe_sub(amount)
        .ok_or_else(|| Error::InsufficientFunds {
            address: address.to_string(),
            balance: balance.clone(),
            required: amount.clone(),
        })?;
    store.set_balance(address, &left)?;
    Ok(left)
}

pub(crate) fn credit(store: &Store, address: &str, amount: &Coins) -> Result<Coins> {
    let balance = store.balance(address)?;
    let sum = balance
        .checked_add(amount)
        .ok_or_else(|| Error::Overflow(address.to_string()))?;
    store.set_balance(address, &sum)?;
    Ok(sum)
}

fn total<'a>(mut coins: impl Iterator<Item = &'a Coins>) -> Result<Coins> {
    coins.try_fold(Coins::empty(), |acc, c| {
        acc.checked_add(c)
            .ok_or_else(|| Error::Overflow("multi-send total".to_string()))
    })
}
