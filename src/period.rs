use crate::classifier::AccountCode;
use crate::reconciliation::{MatchVerdict, ReconciliationMatcher};
use crate::schema::LedgerLayout;
use crate::segmenter::LedgerBook;
use crate::table::Row;
use crate::utils::{month_in_year, MONTHS_IN_YEAR};
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which side of a GL entry counts as positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    /// Revenue accounts: `credit - debit`.
    CreditNormal,
    /// Sales returns and other debit-normal accounts: `debit - credit`.
    DebitNormal,
}

impl Orientation {
    fn signed(self, debit: f64, credit: f64) -> f64 {
        match self {
            Orientation::CreditNormal => credit - debit,
            Orientation::DebitNormal => debit - credit,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonthlyAggregate {
    pub month: u32,
    pub amount: f64,
}

/// Twelve monthly totals, January first. Months without entries stay at zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySeries {
    months: Vec<MonthlyAggregate>,
}

impl MonthlySeries {
    pub fn zeroed() -> Self {
        Self {
            months: (1..=MONTHS_IN_YEAR as u32)
                .map(|month| MonthlyAggregate { month, amount: 0.0 })
                .collect(),
        }
    }

    pub fn add(&mut self, month: u32, amount: f64) {
        if let Some(slot) = self.months.get_mut(month.wrapping_sub(1) as usize) {
            slot.amount += amount;
        }
    }

    pub fn amount(&self, month: u32) -> f64 {
        self.months
            .get(month.wrapping_sub(1) as usize)
            .map(|m| m.amount)
            .unwrap_or(0.0)
    }

    pub fn months(&self) -> &[MonthlyAggregate] {
        &self.months
    }

    pub fn total(&self) -> f64 {
        self.months.iter().map(|m| m.amount).sum()
    }
}

impl Default for MonthlySeries {
    fn default() -> Self {
        Self::zeroed()
    }
}

pub struct PeriodAggregator<'a> {
    layout: &'a LedgerLayout,
    year: Option<i32>,
}

impl<'a> PeriodAggregator<'a> {
    pub fn new(layout: &'a LedgerLayout, year: Option<i32>) -> Self {
        Self { layout, year }
    }

    pub fn aggregate<'r>(
        &self,
        entries: impl IntoIterator<Item = &'r Row>,
        orientation: Orientation,
    ) -> MonthlySeries {
        let mut series = MonthlySeries::zeroed();
        let mut undated = 0usize;
        let mut out_of_year = 0usize;

        for entry in entries {
            let Some(date) = entry.cell(self.layout.date_column).as_date() else {
                undated += 1;
                continue;
            };
            let Some(month) = month_in_year(date, self.year) else {
                out_of_year += 1;
                continue;
            };

            let debit = entry.cell(self.layout.debit_column).as_number().unwrap_or(0.0);
            let credit = entry.cell(self.layout.credit_column).as_number().unwrap_or(0.0);
            series.add(month, orientation.signed(debit, credit));
        }

        if undated > 0 || out_of_year > 0 {
            debug!(
                "Skipped {} undated and {} out-of-year ledger entries",
                undated, out_of_year
            );
        }

        series
    }

    /// Sums the series of every listed code found in the book. Missing codes contribute nothing.
    pub fn aggregate_codes(
        &self,
        book: &LedgerBook,
        codes: &[AccountCode],
        orientation: Orientation,
    ) -> MonthlySeries {
        let mut series = MonthlySeries::zeroed();
        for code in codes {
            match book.get(code) {
                Some(destination) => {
                    let partial = self.aggregate(&destination.entries, orientation);
                    for month in partial.months() {
                        series.add(month.month, month.amount);
                    }
                }
                None => debug!("No ledger block for code {}; its series is zero", code),
            }
        }
        series
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pp30Row {
    pub month: u32,
    pub revenue: f64,
    pub credit_note: f64,
    /// `revenue - credit_note`, the VAT base the PP30 return should declare.
    pub diff: f64,
    pub reported: Option<f64>,
    pub verdict: MatchVerdict,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pp30Summary {
    pub rows: Vec<Pp30Row>,
    pub total_revenue: f64,
    pub total_credit_note: f64,
    pub total_diff: f64,
}

impl Pp30Summary {
    /// `reported` maps month (1-12) to the amount declared on that month's PP30.
    pub fn build(
        revenue: &MonthlySeries,
        credit_note: &MonthlySeries,
        reported: &BTreeMap<u32, f64>,
        matcher: &ReconciliationMatcher,
    ) -> Self {
        let rows: Vec<Pp30Row> = (1..=MONTHS_IN_YEAR as u32)
            .map(|month| {
                let revenue = revenue.amount(month);
                let credit_note = credit_note.amount(month);
                let diff = revenue - credit_note;
                let reported = reported.get(&month).copied();
                Pp30Row {
                    month,
                    revenue,
                    credit_note,
                    diff,
                    reported,
                    verdict: matcher.compare(Some(diff), reported),
                }
            })
            .collect();

        Self {
            total_revenue: rows.iter().map(|r| r.revenue).sum(),
            total_credit_note: rows.iter().map(|r| r.credit_note).sum(),
            total_diff: rows.iter().map(|r| r.diff).sum(),
            rows,
        }
    }

    pub fn mismatched_months(&self) -> Vec<u32> {
        self.rows
            .iter()
            .filter(|r| r.verdict == MatchVerdict::Incorrect)
            .map(|r| r.month)
            .collect()
    }
}
