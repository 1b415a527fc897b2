//! Expense creation rules: share validation and equal splits.
//!
//! The ledger assumes every record already passed [`validate_expense`];
//! whoever creates expenses runs it first.

use std::collections::HashSet;

use crate::{EngineError, ExpenseRecord, MemberId, MoneyCents, Participant, ResultEngine, money::EPSILON};

/// Check that an expense is internally consistent.
///
/// - the amount is positive and there is at least one participant;
/// - no share is negative and no member is listed twice;
/// - shares sum to the amount within [`EPSILON`].
pub fn validate_expense(expense: &ExpenseRecord) -> ResultEngine<()> {
    if !expense.amount.is_positive() {
        return Err(EngineError::InvalidExpense(format!(
            "amount must be > 0, got {}",
            expense.amount
        )));
    }
    if expense.participants.is_empty() {
        return Err(EngineError::InvalidExpense(
            "expense has no participants".to_string(),
        ));
    }

    let mut seen = HashSet::with_capacity(expense.participants.len());
    for participant in &expense.participants {
        if participant.share.is_negative() {
            return Err(EngineError::InvalidExpense(format!(
                "negative share for {}",
                participant.member_id
            )));
        }
        if !seen.insert(&participant.member_id) {
            return Err(EngineError::InvalidExpense(format!(
                "{} is listed twice",
                participant.member_id
            )));
        }
    }

    let total = MoneyCents::checked_sum(expense.participants.iter().map(|p| p.share))
        .ok_or_else(|| EngineError::InvalidExpense("shares are too large to add up".to_string()))?;
    let difference = total
        .checked_sub(expense.amount)
        .ok_or_else(|| EngineError::InvalidExpense("amount is out of range".to_string()))?;
    if difference.abs() > EPSILON {
        return Err(EngineError::InvalidExpense(format!(
            "shares sum to {total}, expected {}",
            expense.amount
        )));
    }
    Ok(())
}

/// Split `amount` evenly among `members`.
///
/// Leftover cents go one each to the first members, so the shares always add
/// up to exactly `amount`.
pub fn split_equally(amount: MoneyCents, members: &[MemberId]) -> ResultEngine<Vec<Participant>> {
    if !amount.is_positive() {
        return Err(EngineError::InvalidExpense(format!(
            "amount must be > 0, got {amount}"
        )));
    }
    if members.is_empty() {
        return Err(EngineError::InvalidExpense(
            "cannot split among nobody".to_string(),
        ));
    }

    let count = i64::try_from(members.len())
        .map_err(|_| EngineError::InvalidExpense("too many participants".to_string()))?;
    let base = amount.cents() / count;
    let leftover = amount.cents() % count;

    Ok(members
        .iter()
        .zip(0..)
        .map(|(member_id, i)| Participant {
            member_id: member_id.clone(),
            share: MoneyCents::new(base + i64::from(i < leftover)),
        })
        .collect())
}
