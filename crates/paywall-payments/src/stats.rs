//! Activity Statistics
//!
//! Totals and a seven-day daily series over recorded transactions.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::HashSet;

use crate::model::Transaction;

/// Days covered by the daily series
pub const STATS_WINDOW_DAYS: u64 = 7;

/// One day of activity
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct DailyActivity {
    pub date: NaiveDate,
    pub transactions: usize,
    pub volume: Decimal,
    pub buyers: usize,
}

/// Aggregate activity
#[derive(Clone, Debug, Serialize)]
pub struct ActivityStats {
    pub period: &'static str,
    pub transactions: usize,
    pub volume: Decimal,
    /// Distinct sender addresses
    pub buyers: usize,
    pub chart: Vec<DailyActivity>,
}

impl ActivityStats {
    /// Compute totals over `transactions` and a daily series ending `today`
    pub fn compute(transactions: &[Transaction], today: NaiveDate) -> Self {
        let chart = (0..STATS_WINDOW_DAYS)
            .rev()
            .filter_map(|offset| today.checked_sub_days(Days::new(offset)))
            .map(|date| {
                let day: Vec<_> = transactions
                    .iter()
                    .filter(|tx| tx.timestamp.date_naive() == date)
                    .collect();
                DailyActivity {
                    date,
                    transactions: day.len(),
                    volume: day.iter().map(|tx| tx.amount).sum(),
                    buyers: distinct_buyers(day.iter().copied()),
                }
            })
            .collect();

        Self {
            period: "7d",
            transactions: transactions.len(),
            volume: transactions.iter().map(|tx| tx.amount).sum(),
            buyers: distinct_buyers(transactions.iter()),
            chart,
        }
    }
}

fn distinct_buyers<'a>(transactions: impl Iterator<Item = &'a Transaction>) -> usize {
    transactions
        .map(|tx| tx.from_address.as_str())
        .collect::<HashSet<_>>()
        .len()
}
