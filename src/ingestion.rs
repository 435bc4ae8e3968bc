use crate::classifier::AccountCode;
use crate::schema::{TrialBalanceLayout, RAW_COLUMN_COUNT};
use crate::table::{Row, TabularSource};
use log::debug;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Zero-based row index in the source table.
    pub source_row: usize,
    pub code: AccountCode,
    pub name: String,
    /// Raw numeric columns C..J; blank or non-numeric cells read as zero.
    pub columns: [f64; RAW_COLUMN_COUNT],
    pub debit: f64,
    pub credit: f64,
    pub adjustment_debit: f64,
    pub adjustment_credit: f64,
}

impl TrialBalanceRow {
    /// The "K" column: debit plus adjustment debit, less credit and adjustment credit.
    pub fn net(&self) -> f64 {
        self.debit + self.adjustment_debit - self.credit - self.adjustment_credit
    }

    pub fn from_row(source_row: usize, row: &Row, layout: &TrialBalanceLayout) -> Option<Self> {
        let code = row.cell(layout.code_column).to_text()?;
        let code = AccountCode::new(code);
        if code.is_empty() || is_column_header(row, layout) {
            return None;
        }

        let amount = |column: usize| row.cell(column).as_number().unwrap_or(0.0);

        let mut columns = [0.0; RAW_COLUMN_COUNT];
        for (slot, column) in columns.iter_mut().zip(layout.raw_columns()) {
            *slot = amount(column);
        }

        Some(Self {
            source_row,
            code,
            name: row.cell(layout.name_column).to_text().unwrap_or_default(),
            columns,
            debit: amount(layout.debit_column),
            credit: amount(layout.credit_column),
            adjustment_debit: amount(layout.adjustment_debit_column),
            adjustment_credit: amount(layout.adjustment_credit_column),
        })
    }
}

/// A column caption line such as `Code,Name,...,Debit,Credit`: both the debit
/// and credit cells hold text that is not an amount.
fn is_column_header(row: &Row, layout: &TrialBalanceLayout) -> bool {
    [layout.debit_column, layout.credit_column].iter().all(|&column| {
        let cell = row.cell(column);
        !cell.is_blank() && cell.as_number().is_none()
    })
}

/// Reads TB rows in layout order. Caption rows above `first_data_row`, rows
/// without a code and column header lines are skipped.
pub fn parse_trial_balance(table: &TabularSource, layout: &TrialBalanceLayout) -> Vec<TrialBalanceRow> {
    let rows: Vec<TrialBalanceRow> = table
        .rows()
        .iter()
        .enumerate()
        .skip(layout.first_data_row)
        .filter_map(|(index, row)| TrialBalanceRow::from_row(index, row, layout))
        .collect();

    debug!(
        "Parsed {} trial balance rows from '{}' ({} source rows)",
        rows.len(),
        table.name,
        table.row_count()
    );

    rows
}
