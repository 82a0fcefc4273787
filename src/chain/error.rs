use thiserror::Error;

use super::{GameId, TxHash};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("transaction rejected by user: {0}")]
    UserRejected(String),

    #[error("step already completed: {0}")]
    AlreadyDone(String),

    #[error("nonce conflict: {0}")]
    NonceConflict(String),

    #[error("gas estimation failed: {0}")]
    GasEstimation(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("rpc timeout: {0}")]
    Timeout(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("game {0} not found")]
    GameNotFound(GameId),

    #[error("receipt for {0} not available before timeout")]
    ReceiptTimeout(TxHash),
}

const USER_REJECTED: &[&str] = &["user rejected", "user denied", "rejected the request"];
const ALREADY_DONE: &[&str] = &[
    "already joined",
    "already submitted",
    "already computed",
    "already finalized",
    "already finished",
];
const NONCE_CONFLICT: &[&str] = &[
    "nonce too low",
    "nonce too high",
    "invalid nonce",
    "nonce has already been used",
    "replacement transaction underpriced",
];
const GAS_ESTIMATION: &[&str] = &[
    "cannot estimate gas",
    "gas required exceeds",
    "intrinsic gas too low",
    "estimategas",
];
const TIMEOUT: &[&str] = &["timeout", "timed out"];
const NETWORK: &[&str] = &[
    "network",
    "connection",
    "econnreset",
    "econnrefused",
    "fetch failed",
    "rate limit",
    "503",
];

impl ChainError {
    /// Map a raw RPC or revert message onto an error kind by pattern.
    pub fn classify(message: impl Into<String>) -> Self {
        let message = message.into();
        let lower = message.to_ascii_lowercase();
        let matches = |patterns: &[&str]| patterns.iter().any(|p| lower.contains(p));

        if matches(USER_REJECTED) {
            ChainError::UserRejected(message)
        } else if matches(ALREADY_DONE) {
            ChainError::AlreadyDone(message)
        } else if matches(NONCE_CONFLICT) {
            ChainError::NonceConflict(message)
        } else if matches(GAS_ESTIMATION) {
            ChainError::GasEstimation(message)
        } else if matches(TIMEOUT) {
            ChainError::Timeout(message)
        } else if matches(NETWORK) {
            ChainError::Network(message)
        } else {
            ChainError::Reverted(message)
        }
    }

    /// Errors worth another attempt under a retry budget.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ChainError::NonceConflict(_)
                | ChainError::GasEstimation(_)
                | ChainError::Network(_)
                | ChainError::Timeout(_)
        )
    }

    pub fn is_already_done(&self) -> bool {
        matches!(self, ChainError::AlreadyDone(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChainError::UserRejected(_) => "user_rejected",
            ChainError::AlreadyDone(_) => "already_done",
            ChainError::NonceConflict(_) => "nonce_conflict",
            ChainError::GasEstimation(_) => "gas_estimation",
            ChainError::Network(_) => "network",
            ChainError::Timeout(_) => "timeout",
            ChainError::Reverted(_) => "reverted",
            ChainError::GameNotFound(_) => "game_not_found",
            ChainError::ReceiptTimeout(_) => "receipt_timeout",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_recognizes_rpc_messages() {
        let cases = [
            ("MetaMask Tx Signature: User denied transaction signature.", "user_rejected"),
            ("execution reverted: Moves already submitted", "already_done"),
            ("execution reverted: Game already finalized", "already_done"),
            ("nonce too low: next nonce 7, tx nonce 5", "nonce_conflict"),
            ("gas required exceeds allowance (30000000)", "gas_estimation"),
            ("request timed out after 30s", "timeout"),
            ("ECONNRESET: connection reset by peer", "network"),
            ("execution reverted: Not your turn", "reverted"),
        ];
        for (message, kind) in cases {
            assert_eq!(ChainError::classify(message).kind(), kind, "{message}");
        }
    }

    #[test]
    fn only_infrastructure_errors_are_transient() {
        assert!(ChainError::classify("network unreachable").is_transient());
        assert!(ChainError::classify("nonce too high").is_transient());
        assert!(!ChainError::classify("user rejected the request").is_transient());
        assert!(!ChainError::classify("Difference already computed").is_transient());
        assert!(!ChainError::classify("execution reverted").is_transient());
        assert!(!ChainError::ReceiptTimeout(TxHash("0x01".into())).is_transient());
    }
}
