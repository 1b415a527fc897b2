//! Group roster, expense records and net balances.
//!
//! Balances are derived, never stored: [`compute_balances`] replays every
//! expense of a group against its roster and converts each amount from the
//! expense's own currency into the target currency.

use std::collections::HashMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CurrencyCode, EngineError, ExchangeRateTable, MoneyCents, ResultEngine};

/// Opaque, immutable member identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MemberId(pub String);

impl MemberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for MemberId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for MemberId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    pub id: MemberId,
    /// Display only; never used for matching.
    pub name: String,
}

impl Member {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: MemberId::new(id),
            name: name.into(),
        }
    }
}

/// One participant's portion of an expense, in the expense's currency.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub member_id: MemberId,
    pub share: MoneyCents,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub payer_id: MemberId,
    pub amount: MoneyCents,
    pub currency: CurrencyCode,
    pub participants: Vec<Participant>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// A member's net position in the target currency.
///
/// Positive: is owed money. Negative: owes money.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    pub member_id: MemberId,
    pub name: String,
    pub amount: MoneyCents,
}

/// Roster plus expenses: everything needed to compute balances.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    #[serde(default)]
    pub name: String,
    pub members: Vec<Member>,
    #[serde(default)]
    pub expenses: Vec<ExpenseRecord>,
}

/// Index of roster ids to positions; rejects duplicated ids.
pub(crate) fn roster_index<'a>(
    ids: impl IntoIterator<Item = &'a MemberId>,
) -> ResultEngine<HashMap<&'a MemberId, usize>> {
    let mut index = HashMap::new();
    for (pos, id) in ids.into_iter().enumerate() {
        if index.insert(id, pos).is_some() {
            return Err(EngineError::DuplicateMember(id.to_string()));
        }
    }
    Ok(index)
}

pub(crate) fn position(index: &HashMap<&MemberId, usize>, id: &MemberId) -> ResultEngine<usize> {
    index
        .get(id)
        .copied()
        .ok_or_else(|| EngineError::UnknownParticipant(id.to_string()))
}

fn overflow() -> EngineError {
    EngineError::InvalidAmount("balance overflow".to_string())
}

/// Net balance of every roster member, in roster order.
///
/// The payer is credited the full amount, each participant is debited their
/// share; both converted from the expense's currency to `target` using
/// `rates`. Totals are kept at full decimal precision and rounded to cents
/// once per member, so the rounding drift of the whole group stays below half
/// a cent per member however many expenses it has.
///
/// A payer or participant outside the roster fails the whole computation with
/// [`EngineError::UnknownParticipant`].
pub fn compute_balances(
    expenses: &[ExpenseRecord],
    members: &[Member],
    target: CurrencyCode,
    rates: &ExchangeRateTable,
) -> ResultEngine<Vec<Balance>> {
    let index = roster_index(members.iter().map(|m| &m.id))?;
    let mut totals = vec![Decimal::ZERO; members.len()];

    for expense in expenses {
        let paid = rates.convert_exact(expense.amount, expense.currency, target)?;
        let payer = position(&index, &expense.payer_id)?;
        totals[payer] = totals[payer].checked_add(paid).ok_or_else(overflow)?;

        for participant in &expense.participants {
            let share = rates.convert_exact(participant.share, expense.currency, target)?;
            let pos = position(&index, &participant.member_id)?;
            totals[pos] = totals[pos].checked_sub(share).ok_or_else(overflow)?;
        }
    }

    members
        .iter()
        .zip(totals)
        .map(|(member, total)| {
            Ok(Balance {
                member_id: member.id.clone(),
                name: member.name.clone(),
                amount: MoneyCents::from_decimal_rounded(total)?,
            })
        })
        .collect()
}
