use crate::classifier::{AccountCategory, AccountCode, Placement, StatementPlacement};
use crate::error::{ReconciliationError, Result};
use crate::ingestion::TrialBalanceRow;
use crate::schema::RAW_COLUMN_COUNT;
use log::{debug, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComputedRow {
    pub row: TrialBalanceRow,
    pub category: AccountCategory,
    pub net: f64,
    pub profit_loss: Placement,
    pub balance_sheet: Placement,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatementImbalance {
    pub balance_sheet_debit: f64,
    pub balance_sheet_credit: f64,
    pub profit_loss_difference: f64,
    /// `balance_sheet_debit + profit_loss_difference - balance_sheet_credit`
    pub discrepancy: f64,
}

impl From<StatementImbalance> for ReconciliationError {
    fn from(imbalance: StatementImbalance) -> Self {
        ReconciliationError::StatementImbalance {
            balance_sheet_debit: imbalance.balance_sheet_debit,
            balance_sheet_credit: imbalance.balance_sheet_credit,
            profit_loss_difference: imbalance.profit_loss_difference,
            discrepancy: imbalance.discrepancy,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StatementSummary {
    /// Subtotal of each raw column over every row, whatever its category.
    pub column_totals: [f64; RAW_COLUMN_COUNT],
    pub net_total: f64,
    pub profit_loss_debit: f64,
    pub profit_loss_credit: f64,
    /// `profit_loss_debit - profit_loss_credit`; negative means a profit.
    pub profit_loss_difference: f64,
    pub balance_sheet_debit: f64,
    pub balance_sheet_credit: f64,
    pub unclassified_rows: usize,
    pub imbalance: Option<StatementImbalance>,
}

impl StatementSummary {
    pub fn net_income(&self) -> f64 {
        -self.profit_loss_difference
    }

    pub fn is_balanced(&self) -> bool {
        self.imbalance.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementSheet {
    pub rows: Vec<ComputedRow>,
    pub summary: StatementSummary,
}

impl StatementSheet {
    /// Fails with [`ReconciliationError::StatementImbalance`] when the balancing identity does not hold.
    pub fn verify(&self) -> Result<()> {
        match self.summary.imbalance {
            Some(imbalance) => Err(imbalance.into()),
            None => Ok(()),
        }
    }

    /// Sum of `net` over the rows carrying `code`, or `None` when the TB has no such row.
    pub fn net_for(&self, code: &AccountCode) -> Option<f64> {
        let mut matched = self.rows.iter().filter(|r| &r.row.code == code).peekable();
        matched.peek()?;
        Some(matched.map(|r| r.net).sum())
    }

    /// Lowest and highest account code in the sheet, for the caption.
    pub fn code_range(&self) -> Option<(&AccountCode, &AccountCode)> {
        let min = self.rows.iter().map(|r| &r.row.code).min()?;
        let max = self.rows.iter().map(|r| &r.row.code).max()?;
        Some((min, max))
    }
}

pub struct StatementColumnComputer {
    balance_tolerance: f64,
}

impl StatementColumnComputer {
    pub fn new(balance_tolerance: f64) -> Self {
        Self { balance_tolerance }
    }

    pub fn compute(&self, rows: &[TrialBalanceRow]) -> StatementSheet {
        let mut summary = StatementSummary::default();
        let mut computed = Vec::with_capacity(rows.len());

        for row in rows {
            let category = row.code.category();
            let net = row.net();
            let placement = StatementPlacement::for_category(category, net);

            for (total, value) in summary.column_totals.iter_mut().zip(row.columns.iter()) {
                *total += value;
            }
            summary.net_total += net;
            summary.profit_loss_debit += placement.profit_loss.debit_or_zero();
            summary.profit_loss_credit += placement.profit_loss.credit_or_zero();
            summary.balance_sheet_debit += placement.balance_sheet.debit_or_zero();
            summary.balance_sheet_credit += placement.balance_sheet.credit_or_zero();

            if !category.is_classified() {
                summary.unclassified_rows += 1;
                debug!(
                    "Row {} code '{}' is unclassifiable and left out of the statements",
                    row.source_row, row.code
                );
            }

            computed.push(ComputedRow {
                row: row.clone(),
                category,
                net,
                profit_loss: placement.profit_loss,
                balance_sheet: placement.balance_sheet,
            });
        }

        summary.profit_loss_difference = summary.profit_loss_debit - summary.profit_loss_credit;

        let discrepancy = summary.balance_sheet_debit + summary.profit_loss_difference
            - summary.balance_sheet_credit;
        if discrepancy.abs() > self.balance_tolerance {
            warn!(
                "Balance sheet does not balance: debit {:.2} + P/L difference {:.2} vs credit {:.2} (off by {:.2})",
                summary.balance_sheet_debit,
                summary.profit_loss_difference,
                summary.balance_sheet_credit,
                discrepancy
            );
            summary.imbalance = Some(StatementImbalance {
                balance_sheet_debit: summary.balance_sheet_debit,
                balance_sheet_credit: summary.balance_sheet_credit,
                profit_loss_difference: summary.profit_loss_difference,
                discrepancy,
            });
        }

        if summary.unclassified_rows > 0 {
            warn!(
                "{} trial balance rows have unclassifiable codes",
                summary.unclassified_rows
            );
        }

        StatementSheet {
            rows: computed,
            summary,
        }
    }
}

impl Default for StatementColumnComputer {
    fn default() -> Self {
        Self::new(0.005)
    }
}

pub fn compute_statement(rows: &[TrialBalanceRow], balance_tolerance: f64) -> StatementSheet {
    StatementColumnComputer::new(balance_tolerance).compute(rows)
}
