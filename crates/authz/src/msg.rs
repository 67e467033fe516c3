use crate::Coins;
use serde::{Deserialize, Serialize};

pub const MSG_SEND_TYPE_URL: &str = "/bank.MsgSend";
pub const MSG_MULTI_SEND_TYPE_URL: &str = "/bank.MsgMultiSend";

/// A plain transfer from one address to another.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSend {
    pub from_address: String,
    pub to_address: String,
    pub amount: Coins,
}

impl MsgSend {
    pub fn new(from: impl Into<String>, to: impl Into<String>, amount: Coins) -> Self {
        Self {
            from_address: from.into(),
            to_address: to.into(),
            amount,
        }
    }
}

/// One side of a multi-send.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Io {
    pub address: String,
    pub coins: Coins,
}

/// A transfer with many inputs and outputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgMultiSend {
    pub inputs: Vec<Io>,
    pub outputs: Vec<Io>,
}

/// Instructions that can be executed under a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Msg {
    Send(MsgSend),
    MultiSend(MsgMultiSend),
}

impl Msg {
    pub fn send(from: impl Into<String>, to: impl Into<String>, amount: Coins) -> Self {
        Self::Send(MsgSend::new(from, to, amount))
    }

    pub fn type_url(&self) -> &'static str {
        match self {
            Msg::Send(_) => MSG_SEND_TYPE_URL,
            Msg::MultiSend(_) => MSG_MULTI_SEND_TYPE_URL,
        }
    }

    /// The address whose funds the instruction moves.
    pub fn signer(&self) -> Option<&str> {
        match self {
            Msg::Send(m) => Some(&m.from_address),
            Msg::MultiSend(m) => m.inputs.first().map(|io| io.address.as_str()),
        }
    }
}
