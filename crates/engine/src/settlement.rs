//! Settlement planning: turn net balances into point-to-point payments.
//!
//! Greedy matching of the largest debtor with the largest creditor. It is not
//! a true minimum-transaction solver, but it never needs more than
//! `members - 1` transfers.

use serde::{Deserialize, Serialize};

use crate::{
    Balance, EngineError, MemberId, MoneyCents, ResultEngine,
    ledger::{position, roster_index},
    money::EPSILON,
};

/// A directed payment instruction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settlement {
    pub from: MemberId,
    pub to: MemberId,
    pub amount: MoneyCents,
}

struct Position<'a> {
    member_id: &'a MemberId,
    remaining: MoneyCents,
}

/// Split balances into debtors and creditors, largest magnitude first.
///
/// Balances within [`EPSILON`] of zero are left out. Sorting is stable, so
/// equal magnitudes keep roster order.
fn partition(balances: &[Balance]) -> (Vec<Position<'_>>, Vec<Position<'_>>) {
    let mut debtors = Vec::new();
    let mut creditors = Vec::new();
    for balance in balances.iter().filter(|b| !b.amount.is_negligible()) {
        let entry = Position {
            member_id: &balance.member_id,
            remaining: balance.amount.abs(),
        };
        if balance.amount.is_negative() {
            debtors.push(entry);
        } else {
            creditors.push(entry);
        }
    }
    debtors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    creditors.sort_by(|a, b| b.remaining.cmp(&a.remaining));
    (debtors, creditors)
}

/// Largest residual the planner tolerates after matching.
fn residual_bound(members: usize) -> MoneyCents {
    let members = i64::try_from(members).unwrap_or(i64::MAX);
    MoneyCents::new(EPSILON.cents().saturating_mul(2).saturating_mul(members))
}

/// Payments that bring every balance to zero.
///
/// Fails with [`EngineError::ImbalancedLedger`] when the balances do not sum
/// to zero closely enough for the plan to settle everyone.
pub fn compute_settlements(balances: &[Balance]) -> ResultEngine<Vec<Settlement>> {
    let (mut debtors, mut creditors) = partition(balances);
    let mut settlements = Vec::new();
    let (mut d, mut c) = (0, 0);

    while d < debtors.len() && c < creditors.len() {
        let debtor = &mut debtors[d];
        let creditor = &mut creditors[c];
        let amount = debtor.remaining.min(creditor.remaining);

        if amount > EPSILON {
            settlements.push(Settlement {
                from: debtor.member_id.clone(),
                to: creditor.member_id.clone(),
                amount,
            });
        }

        debtor.remaining -= amount;
        creditor.remaining -= amount;

        if debtor.remaining.is_negligible() {
            d += 1;
        }
        if creditor.remaining.is_negligible() {
            c += 1;
        }
    }

    let residual: MoneyCents = debtors[d..]
        .iter()
        .chain(&creditors[c..])
        .fold(MoneyCents::ZERO, |acc, p| acc.saturating_add(p.remaining));
    if residual > residual_bound(balances.len()) {
        tracing::error!(
            "settlement left {residual} unmatched across {} balances",
            balances.len()
        );
        return Err(EngineError::ImbalancedLedger { residual });
    }

    Ok(settlements)
}

fn overflow() -> EngineError {
    EngineError::InvalidAmount("settlement overflows a balance".to_string())
}

/// Balances after every settlement has been paid.
pub fn apply_settlements(
    balances: &[Balance],
    settlements: &[Settlement],
) -> ResultEngine<Vec<Balance>> {
    let index = roster_index(balances.iter().map(|b| &b.member_id))?;
    let mut result = balances.to_vec();

    for settlement in settlements {
        let from = position(&index, &settlement.from)?;
        let to = position(&index, &settlement.to)?;
        // The debtor pays, so their negative balance moves up toward zero.
        result[from].amount = result[from]
            .amount
            .checked_add(settlement.amount)
            .ok_or_else(overflow)?;
        result[to].amount = result[to]
            .amount
            .checked_sub(settlement.amount)
            .ok_or_else(overflow)?;
    }

    Ok(result)
}

/// Whether every balance is within [`EPSILON`] of zero.
///
/// A group is safe to delete only when this holds.
pub fn is_settled(balances: &[Balance]) -> bool {
    balances.iter().all(|b| b.amount.is_negligible())
}
