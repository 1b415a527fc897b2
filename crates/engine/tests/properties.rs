//! Property-based checks of the ledger, planner and conversion invariants.

use proptest::prelude::*;

use engine::{
    Balance, CurrencyCode, EPSILON, ExchangeRateTable, ExpenseRecord, Member, MemberId,
    MoneyCents, apply_settlements, compute_balances, compute_settlements, split_equally,
};

const CURRENCIES: [CurrencyCode; 8] = [
    CurrencyCode::USD,
    CurrencyCode::EUR,
    CurrencyCode::GBP,
    CurrencyCode::JPY,
    CurrencyCode::INR,
    CurrencyCode::CAD,
    CurrencyCode::AUD,
    CurrencyCode::CNY,
];

fn currency() -> impl Strategy<Value = CurrencyCode> {
    prop::sample::select(CURRENCIES.to_vec())
}

fn roster(size: usize) -> Vec<Member> {
    (0..size)
        .map(|i| Member::new(format!("m{i}"), format!("Member {i}")))
        .collect()
}

/// (payer index, amount in cents, currency, participant mask)
type RawExpense = (usize, i64, CurrencyCode, Vec<bool>);

fn group() -> impl Strategy<Value = (Vec<Member>, Vec<RawExpense>)> {
    (2usize..8).prop_flat_map(|size| {
        let expense = (
            0..size,
            1i64..500_000,
            currency(),
            prop::collection::vec(any::<bool>(), size),
        );
        (Just(roster(size)), prop::collection::vec(expense, 0..25))
    })
}

fn build_expenses(members: &[Member], raw: Vec<RawExpense>) -> Vec<ExpenseRecord> {
    raw.into_iter()
        .map(|(payer, cents, currency, mask)| {
            let mut ids: Vec<MemberId> = members
                .iter()
                .zip(&mask)
                .filter_map(|(m, keep)| keep.then(|| m.id.clone()))
                .collect();
            if ids.is_empty() {
                ids.push(members[payer].id.clone());
            }
            ExpenseRecord {
                payer_id: members[payer].id.clone(),
                amount: MoneyCents::new(cents),
                currency,
                participants: split_equally(MoneyCents::new(cents), &ids).unwrap(),
                description: String::new(),
                date: None,
            }
        })
        .collect()
}

fn total(balances: &[Balance]) -> MoneyCents {
    balances.iter().map(|b| b.amount).sum()
}

fn tolerance(members: usize) -> i64 {
    2 * EPSILON.cents() * members as i64
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn balances_sum_to_zero((members, raw) in group(), target in currency()) {
        let expenses = build_expenses(&members, raw);
        let balances =
            compute_balances(&expenses, &members, target, &ExchangeRateTable::fallback()).unwrap();
        prop_assert_eq!(balances.len(), members.len());
        prop_assert!(total(&balances).abs().cents() <= tolerance(members.len()));
    }

    #[test]
    fn single_currency_balances_are_exact((members, raw) in group()) {
        let raw = raw
            .into_iter()
            .map(|(payer, cents, _, mask)| (payer, cents, CurrencyCode::EUR, mask))
            .collect();
        let expenses = build_expenses(&members, raw);
        let balances = compute_balances(
            &expenses,
            &members,
            CurrencyCode::EUR,
            &ExchangeRateTable::fallback(),
        )
        .unwrap();
        prop_assert!(total(&balances).is_zero());
    }

    #[test]
    fn settlements_clear_the_ledger((members, raw) in group(), target in currency()) {
        let expenses = build_expenses(&members, raw);
        let balances =
            compute_balances(&expenses, &members, target, &ExchangeRateTable::fallback()).unwrap();
        let settlements = compute_settlements(&balances).unwrap();

        prop_assert!(settlements.len() <= balances.len().saturating_sub(1));
        for settlement in &settlements {
            prop_assert!(settlement.amount > EPSILON);
            prop_assert_ne!(&settlement.from, &settlement.to);
        }

        // Whatever is left over is cent-level dust, bounded by the planner's
        // own residual check.
        let after = apply_settlements(&balances, &settlements).unwrap();
        let leftover: i64 = after.iter().map(|b| b.amount.abs().cents()).sum();
        prop_assert!(leftover <= 2 * tolerance(members.len()));
        prop_assert!(after.iter().all(|b| b.amount.abs().cents() <= tolerance(members.len())));
    }

    #[test]
    fn zero_balances_need_no_settlement(size in 0usize..10) {
        let balances: Vec<Balance> = roster(size)
            .into_iter()
            .map(|m| Balance { member_id: m.id, name: m.name, amount: MoneyCents::ZERO })
            .collect();
        prop_assert!(compute_settlements(&balances).unwrap().is_empty());
    }

    #[test]
    fn conversion_identity(cents in -10_000_000i64..10_000_000, code in currency()) {
        let amount = MoneyCents::new(cents);
        let table = ExchangeRateTable::fallback();
        prop_assert_eq!(table.convert(amount, code, code).unwrap(), amount);
    }

    #[test]
    fn conversion_round_trip(cents in 0i64..10_000_000, from in currency(), to in currency()) {
        let table = ExchangeRateTable::fallback();
        let amount = MoneyCents::new(cents);
        let there = table.convert(amount, from, to).unwrap();
        let back = table.convert(there, to, from).unwrap();

        // Two roundings to cents; the first is scaled by the rate ratio on the
        // way back.
        let ratio = table.rate(from).unwrap() / table.rate(to).unwrap();
        let allowed = rust_decimal::Decimal::new(1, 2) * (ratio + rust_decimal::Decimal::ONE);
        prop_assert!((back.to_decimal() - amount.to_decimal()).abs() <= allowed);
    }
}
