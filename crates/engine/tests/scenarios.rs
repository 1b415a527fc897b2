use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use engine::{
    Balance, CurrencyCode, Engine, EngineError, ExchangeRateTable, ExpenseRecord, Group, Member,
    MoneyCents, Participant, apply_settlements, balances_csv, compute_balances,
    compute_settlements, is_settled, split_equally, validate_expense,
};

fn roster() -> Vec<Member> {
    vec![
        Member::new("a", "Alice"),
        Member::new("b", "Bob"),
        Member::new("c", "Carol"),
    ]
}

fn expense(
    payer: &str,
    amount: &str,
    currency: CurrencyCode,
    shares: &[(&str, &str)],
) -> ExpenseRecord {
    ExpenseRecord {
        payer_id: payer.into(),
        amount: amount.parse().unwrap(),
        currency,
        participants: shares
            .iter()
            .map(|(id, share)| Participant {
                member_id: (*id).into(),
                share: share.parse().unwrap(),
            })
            .collect(),
        description: String::new(),
        date: None,
    }
}

fn by_member(balances: &[Balance]) -> Vec<(&str, String)> {
    balances
        .iter()
        .map(|b| (b.member_id.as_str(), b.amount.to_string()))
        .collect()
}

fn transfers(settlements: &[engine::Settlement]) -> Vec<(&str, &str, String)> {
    settlements
        .iter()
        .map(|s| (s.from.as_str(), s.to.as_str(), s.amount.to_string()))
        .collect()
}

#[test]
fn equal_split_single_payer() {
    let expenses = [expense(
        "a",
        "120",
        CurrencyCode::USD,
        &[("a", "40"), ("b", "40"), ("c", "40")],
    )];
    let balances = compute_balances(
        &expenses,
        &roster(),
        CurrencyCode::USD,
        &ExchangeRateTable::fallback(),
    )
    .unwrap();
    assert_eq!(
        by_member(&balances),
        [
            ("a", "80.00".to_string()),
            ("b", "-40.00".to_string()),
            ("c", "-40.00".to_string())
        ]
    );

    let settlements = compute_settlements(&balances).unwrap();
    assert_eq!(
        transfers(&settlements),
        [
            ("b", "a", "40.00".to_string()),
            ("c", "a", "40.00".to_string())
        ]
    );
}

#[test]
fn unequal_multi_expense_netting() {
    let expenses = [
        expense(
            "a",
            "100",
            CurrencyCode::USD,
            &[("a", "33.33"), ("b", "33.33"), ("c", "33.34")],
        ),
        expense(
            "b",
            "60",
            CurrencyCode::USD,
            &[("a", "20"), ("b", "20"), ("c", "20")],
        ),
    ];
    for expense in &expenses {
        validate_expense(expense).unwrap();
    }

    let balances = compute_balances(
        &expenses,
        &roster(),
        CurrencyCode::USD,
        &ExchangeRateTable::fallback(),
    )
    .unwrap();
    assert_eq!(
        by_member(&balances),
        [
            ("a", "46.67".to_string()),
            ("b", "6.67".to_string()),
            ("c", "-53.34".to_string())
        ]
    );

    let settlements = compute_settlements(&balances).unwrap();
    assert_eq!(
        transfers(&settlements),
        [
            ("c", "a", "46.67".to_string()),
            ("c", "b", "6.67".to_string())
        ]
    );
    assert!(is_settled(&apply_settlements(&balances, &settlements).unwrap()));
}

#[test]
fn multi_currency_matches_manual_conversion() {
    let members = vec![Member::new("a", "Alice"), Member::new("b", "Bob")];
    let expenses = [expense(
        "a",
        "100",
        CurrencyCode::EUR,
        &[("a", "50"), ("b", "50")],
    )];
    let balances = compute_balances(
        &expenses,
        &members,
        CurrencyCode::USD,
        &ExchangeRateTable::fallback(),
    )
    .unwrap();

    // EUR -> USD at 1 / 0.85.
    let manual_a = dec!(100) / dec!(0.85) - dec!(50) / dec!(0.85);
    let manual_b = -(dec!(50) / dec!(0.85));
    let within_a_cent = |got: MoneyCents, want: Decimal| (got.to_decimal() - want).abs() <= dec!(0.01);
    assert!(within_a_cent(balances[0].amount, manual_a));
    assert!(within_a_cent(balances[1].amount, manual_b));

    let settlements = compute_settlements(&balances).unwrap();
    assert_eq!(transfers(&settlements), [("b", "a", "58.82".to_string())]);
    assert!(is_settled(&apply_settlements(&balances, &settlements).unwrap()));
}

#[test]
fn mixed_currency_group_still_settles() {
    let expenses = [
        expense(
            "a",
            "90",
            CurrencyCode::EUR,
            &[("a", "30"), ("b", "30"), ("c", "30")],
        ),
        expense("b", "45.50", CurrencyCode::GBP, &[("a", "22.75"), ("c", "22.75")]),
        expense(
            "c",
            "12000",
            CurrencyCode::JPY,
            &[("a", "4000"), ("b", "4000"), ("c", "4000")],
        ),
    ];
    let balances = compute_balances(
        &expenses,
        &roster(),
        CurrencyCode::EUR,
        &ExchangeRateTable::fallback(),
    )
    .unwrap();

    let total: MoneyCents = balances.iter().map(|b| b.amount).sum();
    assert!(total.abs().cents() <= 2 * 3);

    let settlements = compute_settlements(&balances).unwrap();
    assert!(settlements.len() <= 2);
    assert!(is_settled(&apply_settlements(&balances, &settlements).unwrap()));
}

#[test]
fn equal_split_helper_feeds_the_ledger() {
    let members = roster();
    let ids: Vec<_> = members.iter().map(|m| m.id.clone()).collect();
    let participants = split_equally(MoneyCents::new(10_000), &ids).unwrap();
    let record = ExpenseRecord {
        payer_id: "c".into(),
        amount: MoneyCents::new(10_000),
        currency: CurrencyCode::USD,
        participants,
        description: "Groceries".to_string(),
        date: None,
    };
    validate_expense(&record).unwrap();

    let balances = compute_balances(
        &[record],
        &members,
        CurrencyCode::USD,
        &ExchangeRateTable::fallback(),
    )
    .unwrap();
    assert_eq!(
        by_member(&balances),
        [
            ("a", "-33.34".to_string()),
            ("b", "-33.33".to_string()),
            ("c", "66.67".to_string())
        ]
    );
}

#[tokio::test]
async fn engine_computes_balances_and_settlements_for_a_group() {
    let engine = Engine::builder().build();
    let group = Group {
        name: "Trip".to_string(),
        members: roster(),
        expenses: vec![expense(
            "a",
            "120",
            CurrencyCode::USD,
            &[("a", "40"), ("b", "40"), ("c", "40")],
        )],
    };

    let balances = engine.balances(&group, CurrencyCode::EUR).await.unwrap();
    assert_eq!(
        by_member(&balances),
        [
            ("a", "68.00".to_string()),
            ("b", "-34.00".to_string()),
            ("c", "-34.00".to_string())
        ]
    );
    let csv = String::from_utf8(balances_csv(&balances, CurrencyCode::EUR).unwrap()).unwrap();
    assert!(csv.starts_with("member_id,name,amount,currency\na,Alice,68.00,EUR\n"));

    let settlements = engine.settlements(&group, CurrencyCode::EUR).await.unwrap();
    assert_eq!(settlements.len(), 2);

    assert_eq!(
        engine
            .convert(MoneyCents::new(10_000), CurrencyCode::USD, CurrencyCode::GBP)
            .await,
        Ok(MoneyCents::new(7_500))
    );
    assert!(engine.rates().await.is_fallback());
}

#[tokio::test]
async fn engine_surfaces_integrity_errors() {
    let engine = Engine::builder().build();
    let group = Group {
        name: String::new(),
        members: roster(),
        expenses: vec![expense("a", "10", CurrencyCode::USD, &[("mallory", "10")])],
    };
    assert_eq!(
        engine.settlements(&group, CurrencyCode::USD).await,
        Err(EngineError::UnknownParticipant("mallory".to_string()))
    );
}
