//! Property-style checks over the aggregation engine: the identities the
//! dashboard relies on must hold for any mix of statements.

use spendsense_core::{
    AggregateSnapshot, ParseState, ParsedEntry, ParsedStatementGroup, TOP_EXPENSE_COUNT, aggregate,
};

fn group(name: &str, entries: Vec<ParsedEntry>) -> ParsedStatementGroup {
    ParsedStatementGroup {
        statement_id: format!("st-{name}"),
        statement_name: name.to_string(),
        bank_id: "bank-1".to_string(),
        parsed: ParseState::Parsed(entries),
    }
}

fn mixed_fixture() -> Vec<ParsedStatementGroup> {
    vec![
        group(
            "checking-jan.pdf",
            vec![
                ParsedEntry::new("2024-01-03", 1200.0, false, "PAYROLL ACME INC"),
                ParsedEntry::new("2024-01-04", 18.40, true, "UBER EATS"),
                ParsedEntry::new("2024-01-05", 950.0, true, "RENT JANUARY"),
                ParsedEntry::new("not-a-date", 3.99, true, "SPOTIFY"),
            ],
        ),
        group(
            "card-jan.pdf",
            vec![
                ParsedEntry::new("2024-01-02", 42.10, true, "H-E-B GROCERY"),
                ParsedEntry::new("2024-01-06", 18.40, true, "UBER EATS"),
                ParsedEntry::new("2024-01-07", 60.0, false, "REFUND WALMART"),
            ],
        ),
        ParsedStatementGroup {
            statement_id: "st-pending".to_string(),
            statement_name: "pending.pdf".to_string(),
            bank_id: "bank-2".to_string(),
            parsed: ParseState::NotRun,
        },
    ]
}

#[test]
fn test_totals_identity_holds() {
    let snap = aggregate(&mixed_fixture());
    let diff = (snap.total_signed - (snap.total_income - snap.total_expenses)).abs();
    assert!(diff < 1e-9, "identity violated by {diff}");
}

#[test]
fn test_running_balance_tracks_entry_count_and_total() {
    let groups = mixed_fixture();
    let entry_count: usize = groups
        .iter()
        .filter_map(|g| g.parsed.entries())
        .map(|e| e.len())
        .sum();

    let snap = aggregate(&groups);
    assert_eq!(snap.running_balance.len(), entry_count);
    let last = *snap.running_balance.last().unwrap();
    assert!((last - snap.total_signed).abs() < 1e-9);
}

#[test]
fn test_aggregation_is_idempotent() {
    let groups = mixed_fixture();
    let first = aggregate(&groups);
    let second = aggregate(&groups);
    assert_eq!(first, second);
}

#[test]
fn test_top_expenses_is_bounded_and_sorted() {
    let snap = aggregate(&mixed_fixture());
    // Distinct expense descriptions in the fixture: UBER EATS, RENT JANUARY,
    // SPOTIFY, H-E-B GROCERY.
    assert_eq!(snap.top_expenses.len(), 4.min(TOP_EXPENSE_COUNT));
    for w in snap.top_expenses.windows(2) {
        assert!(w[0].amount >= w[1].amount);
    }
    // Repeated merchant sums across statements.
    let uber = snap
        .top_expenses
        .iter()
        .find(|b| b.description == "UBER EATS")
        .unwrap();
    assert!((uber.amount - 36.80).abs() < 1e-9);
}

#[test]
fn test_values_stay_non_negative_through_the_pipeline() {
    let snap = aggregate(&mixed_fixture());
    assert!(snap.total_income >= 0.0);
    assert!(snap.total_expenses >= 0.0);
    assert!(snap.biggest_expense >= 0.0);
    assert!(snap.top_expenses.iter().all(|b| b.amount >= 0.0));
}

#[test]
fn test_empty_and_not_run_only_inputs_yield_default() {
    assert_eq!(aggregate(&[]), AggregateSnapshot::default());

    let only_pending = vec![ParsedStatementGroup {
        statement_id: "st-1".to_string(),
        statement_name: "pending.pdf".to_string(),
        bank_id: "bank-1".to_string(),
        parsed: ParseState::NotRun,
    }];
    assert_eq!(aggregate(&only_pending), AggregateSnapshot::default());
}
