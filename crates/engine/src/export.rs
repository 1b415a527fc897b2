//! CSV exports for balances and expenses.

use std::collections::HashMap;

use csv::Writer;
use serde::Serialize;

use crate::{
    Balance, CurrencyCode, EngineError, ExpenseRecord, Member, MemberId, MoneyCents, ResultEngine,
    ledger::{position, roster_index},
};

#[derive(Serialize)]
struct BalanceRow<'a> {
    member_id: &'a str,
    name: &'a str,
    amount: MoneyCents,
    currency: CurrencyCode,
}

#[derive(Serialize)]
struct ExpenseRow<'a> {
    date: String,
    description: &'a str,
    amount: MoneyCents,
    currency: CurrencyCode,
    paid_by: &'a str,
    participants: String,
}

fn export_error(err: impl std::fmt::Display) -> EngineError {
    EngineError::Export(err.to_string())
}

fn member_name<'a>(
    members: &'a [Member],
    index: &HashMap<&MemberId, usize>,
    id: &MemberId,
) -> ResultEngine<&'a str> {
    position(index, id).map(|pos| members[pos].name.as_str())
}

fn finish(writer: Writer<Vec<u8>>) -> ResultEngine<Vec<u8>> {
    writer.into_inner().map_err(|err| export_error(err.error()))
}

/// One row per balance: `member_id,name,amount,currency`.
pub fn balances_csv(balances: &[Balance], currency: CurrencyCode) -> ResultEngine<Vec<u8>> {
    let mut writer = Writer::from_writer(vec![]);
    for balance in balances {
        writer
            .serialize(BalanceRow {
                member_id: balance.member_id.as_str(),
                name: &balance.name,
                amount: balance.amount,
                currency,
            })
            .map_err(export_error)?;
    }
    finish(writer)
}

/// One row per expense, in the given order.
///
/// Payer and participant names come from the roster; an id outside the roster
/// fails with [`EngineError::UnknownParticipant`].
pub fn expenses_csv(expenses: &[ExpenseRecord], members: &[Member]) -> ResultEngine<Vec<u8>> {
    let index = roster_index(members.iter().map(|m| &m.id))?;

    let mut writer = Writer::from_writer(vec![]);
    for expense in expenses {
        let participants = expense
            .participants
            .iter()
            .map(|p| Ok(format!("{} ({})", member_name(members, &index, &p.member_id)?, p.share)))
            .collect::<ResultEngine<Vec<_>>>()?
            .join("; ");

        writer
            .serialize(ExpenseRow {
                date: expense
                    .date
                    .map(|d| d.format("%Y-%m-%d").to_string())
                    .unwrap_or_default(),
                description: &expense.description,
                amount: expense.amount,
                currency: expense.currency,
                paid_by: member_name(members, &index, &expense.payer_id)?,
                participants,
            })
            .map_err(export_error)?;
    }
    finish(writer)
}
