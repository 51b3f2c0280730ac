//! Transaction admission.
//!
//! Two levels:
//!
//! - **Structural** ([`validate_tx_structure`]): context-free checks every
//!   transaction must pass, admins included: signature and signer binding,
//!   no block-only actions.
//! - **Contextual** ([`validate_tx`]): activation and action-count rules at
//!   the height the transaction would be included.

use tollgate_core::activation::ActivationState;
use tollgate_core::constants::MAX_ACTIONS_PER_TX;
use tollgate_core::error::TxViolation;
use tollgate_core::types::Transaction;

/// Chain-state facts the contextual check reads.
#[derive(Debug, Clone, Copy)]
pub struct TxFacts<'a> {
    /// Index of the block the transaction would be included in.
    pub height: u64,
    pub activation: &'a ActivationState,
}

impl<'a> TxFacts<'a> {
    pub fn new(height: u64, activation: &'a ActivationState) -> Self {
        Self { height, activation }
    }
}

/// Context-free checks.
pub fn validate_tx_structure(tx: &Transaction) -> Result<(), TxViolation> {
    if let Some(index) = tx.actions.iter().position(|a| a.is_block_action()) {
        return Err(TxViolation::BlockActionInTransaction { index });
    }
    tx.verify_signature()
}

/// Whether `tx` may be included at `facts.height`.
///
/// 1. The admin is accepted unconditionally up to its validity bound.
/// 2. Once any account is activated, non-activated signers are rejected.
/// 3. At most [`MAX_ACTIONS_PER_TX`] actions.
pub fn validate_tx(facts: &TxFacts<'_>, tx: &Transaction) -> Result<(), TxViolation> {
    if facts.activation.is_admin_at(&tx.signer, facts.height) {
        return Ok(());
    }

    if facts.activation.is_enforced() && !facts.activation.is_activated(&tx.signer) {
        return Err(TxViolation::NotActivated { signer: tx.signer });
    }

    if tx.actions.len() > MAX_ACTIONS_PER_TX {
        return Err(TxViolation::TooManyActions {
            count: tx.actions.len(),
            max: MAX_ACTIONS_PER_TX,
        });
    }

    Ok(())
}
