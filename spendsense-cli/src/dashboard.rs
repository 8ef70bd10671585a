//! Terminal dashboard: totals, running-balance sparkline, income/expense
//! split, top expenses, and the per-statement listing.

use anyhow::Result;

use spendsense_core::{ParseState, present, aggregate, timeline};

use crate::state;
use crate::store::StatementStore;

const SPARK_LEVELS: &[char] = &['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];
const BAR_WIDTH: usize = 24;

pub fn run_dashboard(show_transactions: bool) -> Result<()> {
    let store = StatementStore::load(state::statements_path()?)?;
    let groups = store.groups();
    let snap = aggregate(&groups);

    if snap.running_balance.is_empty() {
        println!("No parsed transactions available. Ingest statements to see insights.");
        if groups.is_empty() {
            return Ok(());
        }
        println!();
    } else {
        println!("Balance: ${:.2}", snap.total_signed);
        println!("{}\n", sparkline(&snap.running_balance));

        let (inc_pct, exp_pct) =
            present::income_expense_split(snap.total_income, snap.total_expenses);
        println!(
            "Income ${:.2} ({inc_pct}%)  |  Expenses ${:.2} ({exp_pct}%)",
            snap.total_income, snap.total_expenses
        );
        println!("Biggest expense: ${:.2}\n", snap.biggest_expense);
    }

    if !snap.top_expenses.is_empty() {
        println!("Top expenses:");
        let fractions = present::bar_fractions(&snap.top_expenses);
        for (bucket, frac) in snap.top_expenses.iter().zip(fractions) {
            let width = ((frac * BAR_WIDTH as f64).round() as usize).max(1);
            println!(
                "  {:<28} {:<width$} ${:.2}",
                truncate(&bucket.description, 28),
                "█".repeat(width),
                bucket.amount,
                width = BAR_WIDTH,
            );
        }
        println!();
    }

    println!("Statements:");
    for group in &groups {
        match &group.parsed {
            ParseState::Parsed(entries) => {
                println!("  {} ({} entries)", group.statement_name, entries.len())
            }
            ParseState::NotRun => println!("  {} (no parsed data)", group.statement_name),
        }
    }

    if show_transactions {
        println!("\nTransactions:");
        for e in timeline(&groups) {
            let sign = if e.is_expense { "-" } else { "+" };
            println!(
                "  {:<12} {sign}${:<10.2} {:<32} [{}]",
                e.date,
                e.value,
                truncate(&e.description, 32),
                e.statement_name
            );
        }
    }

    Ok(())
}

/// Render the running balance as a one-line unicode sparkline.
fn sparkline(series: &[f64]) -> String {
    let height = (SPARK_LEVELS.len() - 1) as f64;
    let width = series.len().saturating_sub(1).max(1) as f64;
    present::sparkline_points(series, width, height)
        .iter()
        .map(|&(_, y)| {
            // Points put y=0 at the top; flip back into a level index.
            let level = (height - y).round().clamp(0.0, height) as usize;
            SPARK_LEVELS[level]
        })
        .collect()
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
