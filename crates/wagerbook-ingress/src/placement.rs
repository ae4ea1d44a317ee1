//! Wager placement.
//!
//! Flow for every request:
//! 1. Capability check (`PlaceWager`)
//! 2. Amount validation (a positive integer, within the configured cap)
//! 3. Shared gate on the match
//! 4. Registry lookup: match must exist and be open, selection must name
//!    one of its teams or the draw
//! 5. Ledger `append_wager`: balance check, debit and history append in one
//!    atomic step on the user's record
//!
//! Any failure before step 5 touches nothing; step 5 itself is
//! all-or-nothing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use wagerbook_store::{LedgerStore, MatchGates, MatchRegistry};
use wagerbook_types::{
    Amount, Authorizer, Capability, MatchId, PlacementConfig, Principal, RawAmount, Result,
    RoleAuthorizer, Wager, WagerbookError,
};

/// A placement request. The wager is always placed for the calling
/// principal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WagerRequest {
    pub match_id: MatchId,
    pub selection: String,
    /// Number or decimal string; validated on placement.
    pub amount: RawAmount,
}

/// An accepted wager and the balance it left behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WagerRecord {
    pub wager: Wager,
    pub balance: u64,
}

pub struct WagerPlacement {
    registry: Arc<dyn MatchRegistry>,
    ledger: Arc<dyn LedgerStore>,
    gates: Arc<MatchGates>,
    authorizer: Arc<dyn Authorizer>,
    config: PlacementConfig,
}

impl WagerPlacement {
    /// Placement service using the default [`RoleAuthorizer`].
    #[must_use]
    pub fn new(
        registry: Arc<dyn MatchRegistry>,
        ledger: Arc<dyn LedgerStore>,
        gates: Arc<MatchGates>,
        config: PlacementConfig,
    ) -> Self {
        Self {
            registry,
            ledger,
            gates,
            authorizer: Arc::new(RoleAuthorizer),
            config,
        }
    }

    #[must_use]
    pub fn with_authorizer(mut self, authorizer: Arc<dyn Authorizer>) -> Self {
        self.authorizer = authorizer;
        self
    }

    /// Place a wager for `principal`.
    ///
    /// # Errors
    /// - `Forbidden` if the principal may not place wagers
    /// - `InvalidAmount` for non-integer, non-positive or over-cap amounts
    /// - `MatchNotFound`, `MatchClosed`, `InvalidSelection`
    /// - `UserNotFound`, `InsufficientFunds`
    /// - a retryable store error; nothing was debited in that case
    pub async fn place_wager(
        &self,
        principal: &Principal,
        request: WagerRequest,
    ) -> Result<WagerRecord> {
        let match_id = request.match_id;
        match self.place(principal, request).await {
            Ok(record) => {
                tracing::info!(
                    user = %principal.user_id,
                    %match_id,
                    wager = %record.wager.id,
                    selection = %record.wager.selection,
                    amount = record.wager.amount.get(),
                    balance = record.balance,
                    "Wager placed"
                );
                Ok(record)
            }
            Err(err) => {
                tracing::debug!(
                    user = %principal.user_id,
                    %match_id,
                    kind = %err.kind(),
                    error = %err,
                    "Wager rejected"
                );
                Err(err)
            }
        }
    }

    async fn place(&self, principal: &Principal, request: WagerRequest) -> Result<WagerRecord> {
        self.authorizer.authorize(principal, Capability::PlaceWager)?;
        let amount = self.validate_amount(&request.amount)?;

        let _gate = self.gates.shared(request.match_id).await;
        let fixture = self.registry.get_match(request.match_id).await?;
        if !fixture.is_open() {
            return Err(WagerbookError::MatchClosed {
                match_id: fixture.id,
                status: fixture.status,
            });
        }
        let selection = fixture.selection(&request.selection)?;

        let wager = Wager::new(principal.user_id, &fixture, selection, amount);
        let balance = self.ledger.append_wager(wager.clone()).await?;
        Ok(WagerRecord { wager, balance })
    }

    fn validate_amount(&self, raw: &RawAmount) -> Result<Amount> {
        let amount = raw.to_amount()?;
        if amount.get() > self.config.max_amount {
            return Err(WagerbookError::InvalidAmount {
                reason: format!(
                    "{amount} exceeds the placement limit {}",
                    self.config.max_amount
                ),
            });
        }
        Ok(amount)
    }
}
