use crate::classifier::AccountCode;
use crate::schema::{FormType, ReconciliationConfig};
use crate::statement::StatementSheet;
use crate::utils::amounts_match;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchVerdict {
    Correct,
    Incorrect,
    NotApplicable,
}

impl MatchVerdict {
    pub fn label(self) -> &'static str {
        match self {
            MatchVerdict::Correct => "Correct",
            MatchVerdict::Incorrect => "Incorrect",
            MatchVerdict::NotApplicable => "N/A",
        }
    }
}

impl fmt::Display for MatchVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Bank,
    TaxForm(FormType),
}

/// One bank or tax-form line. Every amount is optional: `None` means the
/// source could not provide it, which is never the same as a zero amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationItem {
    pub label: String,
    pub kind: ItemKind,
    pub tb_code: AccountCode,
    pub document_amount: Option<f64>,
    pub tb_amount: Option<f64>,
    pub secondary_amount: Option<f64>,
    pub note: Option<String>,
}

impl ReconciliationItem {
    pub fn new(label: impl Into<String>, kind: ItemKind, tb_code: AccountCode) -> Self {
        Self {
            label: label.into(),
            kind,
            tb_code,
            document_amount: None,
            tb_amount: None,
            secondary_amount: None,
            note: None,
        }
    }

    pub fn with_document_amount(mut self, amount: Option<f64>) -> Self {
        self.document_amount = amount;
        self
    }

    pub fn with_tb_amount(mut self, amount: Option<f64>) -> Self {
        self.tb_amount = amount;
        self
    }

    pub fn with_secondary_amount(mut self, amount: Option<f64>) -> Self {
        self.secondary_amount = amount;
        self
    }

    fn add_note(&mut self, note: &str) {
        match &mut self.note {
            Some(existing) => {
                existing.push_str("; ");
                existing.push_str(note);
            }
            None => self.note = Some(note.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciledItem {
    pub item: ReconciliationItem,
    pub result1: MatchVerdict,
    pub result2: MatchVerdict,
}

#[derive(Debug, Clone, Copy)]
pub struct ReconciliationMatcher {
    tolerance: f64,
}

impl ReconciliationMatcher {
    pub fn new(tolerance: f64) -> Self {
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    /// Compares two amounts; a missing operand is never a match.
    pub fn compare(&self, left: Option<f64>, right: Option<f64>) -> MatchVerdict {
        match (left, right) {
            (Some(l), Some(r)) if amounts_match(l, r, self.tolerance) => MatchVerdict::Correct,
            (Some(_), Some(_)) => MatchVerdict::Incorrect,
            _ => MatchVerdict::NotApplicable,
        }
    }

    /// Document amount against the TB. Asset codes compare directly; liability
    /// codes carry a credit (negative) balance in the TB, so the sign is flipped.
    pub fn result1(
        &self,
        tb_code: &AccountCode,
        document: Option<f64>,
        tb: Option<f64>,
    ) -> MatchVerdict {
        match tb_code.leading_char() {
            Some('1') => self.compare(document, tb),
            Some('2') => self.compare(document, tb.map(|v| -v)),
            _ => MatchVerdict::NotApplicable,
        }
    }

    /// TB liability against the secondary (tax report) amount.
    pub fn result2(
        &self,
        tb_code: &AccountCode,
        tb: Option<f64>,
        secondary: Option<f64>,
    ) -> MatchVerdict {
        match tb_code.leading_char() {
            Some('2') => self.compare(tb.map(|v| -v), secondary),
            _ => MatchVerdict::NotApplicable,
        }
    }

    pub fn reconcile(&self, item: ReconciliationItem) -> ReconciledItem {
        let result1 = self.result1(&item.tb_code, item.document_amount, item.tb_amount);
        let result2 = self.result2(&item.tb_code, item.tb_amount, item.secondary_amount);
        debug!(
            "Reconciled '{}' ({}): result1 {}, result2 {}",
            item.label, item.tb_code, result1, result2
        );
        ReconciledItem {
            item,
            result1,
            result2,
        }
    }

    pub fn reconcile_all(&self, items: Vec<ReconciliationItem>) -> Vec<ReconciledItem> {
        let reconciled: Vec<ReconciledItem> =
            items.into_iter().map(|item| self.reconcile(item)).collect();

        let incorrect = reconciled
            .iter()
            .filter(|r| r.result1 == MatchVerdict::Incorrect || r.result2 == MatchVerdict::Incorrect)
            .count();
        info!(
            "Reconciled {} items, {} with a mismatch",
            reconciled.len(),
            incorrect
        );

        reconciled
    }
}

impl Default for ReconciliationMatcher {
    fn default() -> Self {
        Self::new(0.0)
    }
}

/// Builds the reconciliation lines for a run: banks in name order, then each
/// fixed tax form that has a TB code configured.
///
/// `extracted` maps an item label to the amount read from its document
/// (`None` when extraction failed); `secondary` maps a label to the amount
/// from the tax/VAT report.
pub fn build_items(
    config: &ReconciliationConfig,
    sheet: &StatementSheet,
    extracted: &BTreeMap<String, Option<f64>>,
    secondary: &BTreeMap<String, f64>,
) -> Vec<ReconciliationItem> {
    let banks = config.sorted_banks().into_iter().map(|bank| {
        ReconciliationItem::new(bank.name.clone(), ItemKind::Bank, bank.tb_code.clone())
    });

    let forms = FormType::FIXED.iter().filter_map(|&form| {
        config.form_codes.form(form).map(|code| {
            ReconciliationItem::new(form.label(), ItemKind::TaxForm(form), code.clone())
        })
    });

    banks
        .chain(forms)
        .map(|item| {
            let document = extracted.get(&item.label).copied().flatten();
            let tb = sheet.net_for(&item.tb_code);
            let secondary_amount = secondary.get(&item.label).copied();

            let mut item = item
                .with_document_amount(document)
                .with_tb_amount(tb)
                .with_secondary_amount(secondary_amount);

            if document.is_none() {
                item.add_note("no document amount");
            }
            if tb.is_none() {
                item.add_note("TB code not found");
            }
            item
        })
        .collect()
}
