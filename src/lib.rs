//! # Tax Reconciliation Builder
//!
//! A library for assembling the monthly tax reconciliation workbook of a
//! company from its trial balance (TB), general ledger (GL) and the amounts
//! read off its bank statements and tax forms.
//!
//! ## Core Concepts
//!
//! - **Statement columns**: every TB row gets a net balance and a placement in
//!   either the Profit & Loss or the Balance Sheet debit/credit pair, decided
//!   by the first character of its account code
//! - **Ledger segmentation**: a GL export is split into per-account blocks by
//!   scanning for the marker row that opens each account
//! - **Reconciliation**: bank and tax-form lines compare the document amount,
//!   the TB balance and the tax report amount with sign-aware rules; a missing
//!   amount never counts as a match
//! - **PP30 summary**: revenue and credit-note ledgers are aggregated into a
//!   12-month VAT base and compared with the filed PP30 returns
//!
//! ## Example
//!
//! ```rust,ignore
//! use tax_reconciliation_builder::*;
//!
//! let config = ReconciliationConfig::from_json(&std::fs::read_to_string("config.json")?)?;
//! let inputs = RunInputs::new()
//!     .with_trial_balance(TabularSource::from_csv_str("TB", &tb_csv)?)
//!     .with_general_ledger(TabularSource::from_csv_str("GL", &gl_csv)?)
//!     .with_extracted_amount("SCB", Some(152_340.50));
//!
//! let document = process_reconciliation(&config, &inputs)?;
//! println!("{}", document.to_markdown());
//! ```

pub mod classifier;
pub mod error;
pub mod ingestion;
pub mod inventory;
pub mod period;
pub mod reconciliation;
pub mod report;
pub mod schema;
pub mod segmenter;
pub mod statement;
pub mod table;
pub mod utils;

#[cfg(feature = "gemini")]
pub mod llm;

pub use classifier::*;
pub use error::{ReconciliationError, Result};
pub use ingestion::{parse_trial_balance, TrialBalanceRow};
pub use inventory::{period_token, DocumentInventory, InventoryEntry};
pub use period::{MonthlyAggregate, MonthlySeries, Orientation, PeriodAggregator, Pp30Row, Pp30Summary};
pub use reconciliation::*;
pub use report::{Anomaly, CellValue, ReportAssembler, ReportDocument, ReportInputs, Section};
pub use schema::*;
pub use segmenter::*;
pub use statement::*;
pub use table::{Cell, Row, TabularSource};

use log::{debug, info, warn};
use std::collections::BTreeMap;

/// Source tables and externally resolved amounts for one company and period.
#[derive(Debug, Clone, Default)]
pub struct RunInputs {
    pub trial_balance: Option<TabularSource>,
    pub general_ledger: Option<TabularSource>,
    /// Item label -> amount read from its document; `None` when the read failed.
    pub extracted_amounts: BTreeMap<String, Option<f64>>,
    /// Item label -> amount from the tax/VAT report.
    pub secondary_amounts: BTreeMap<String, f64>,
    /// Month (1-12) -> amount declared on that month's PP30 return.
    pub pp30_reported: BTreeMap<u32, f64>,
    pub inventory: Option<DocumentInventory>,
}

impl RunInputs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_trial_balance(mut self, table: TabularSource) -> Self {
        self.trial_balance = Some(table);
        self
    }

    pub fn with_general_ledger(mut self, table: TabularSource) -> Self {
        self.general_ledger = Some(table);
        self
    }

    pub fn with_extracted_amount(mut self, label: impl Into<String>, amount: Option<f64>) -> Self {
        self.extracted_amounts.insert(label.into(), amount);
        self
    }

    pub fn with_secondary_amount(mut self, label: impl Into<String>, amount: f64) -> Self {
        self.secondary_amounts.insert(label.into(), amount);
        self
    }

    pub fn with_pp30_reported(mut self, month: u32, amount: f64) -> Self {
        self.pp30_reported.insert(month, amount);
        self
    }

    pub fn with_inventory(mut self, inventory: DocumentInventory) -> Self {
        self.inventory = Some(inventory);
        self
    }
}

/// Intermediate results of a run alongside the assembled document.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub sheet: StatementSheet,
    pub reconciled: Vec<ReconciledItem>,
    pub ledger: Option<LedgerBook>,
    pub pp30: Option<Pp30Summary>,
    pub document: ReportDocument,
}

pub struct ReconciliationProcessor;

impl ReconciliationProcessor {
    pub fn process(config: &ReconciliationConfig, inputs: &RunInputs) -> Result<ReportDocument> {
        Ok(Self::process_with_details(config, inputs)?.document)
    }

    pub fn process_with_details(
        config: &ReconciliationConfig,
        inputs: &RunInputs,
    ) -> Result<RunOutcome> {
        config.validate()?;

        info!(
            "Processing reconciliation for {} period {}",
            config.company_name,
            config.period_label()
        );

        let trial_balance =
            TabularSource::require_content(inputs.trial_balance.as_ref(), "trial balance")?;
        let general_ledger = if config.parts.gl_subsheet || config.parts.pp30_subsheet {
            Some(TabularSource::require_content(
                inputs.general_ledger.as_ref(),
                "general ledger",
            )?)
        } else {
            None
        };

        let rows = parse_trial_balance(trial_balance, &config.trial_balance_layout);
        let sheet = compute_statement(&rows, config.balance_tolerance);

        let matcher = ReconciliationMatcher::new(config.tolerance);
        let items = build_items(
            config,
            &sheet,
            &inputs.extracted_amounts,
            &inputs.secondary_amounts,
        );
        let reconciled = matcher.reconcile_all(items);

        let mut malformed_markers = Vec::new();
        let ledger = match general_ledger {
            Some(gl) if config.parts.gl_subsheet => {
                let segmentation = segmenter_for(config, CodeFilter::balance_sheet_accounts()).segment(gl);
                malformed_markers = segmentation.malformed_markers;
                Some(LedgerBook::from_blocks(segmentation.blocks))
            }
            _ => None,
        };

        let pp30 = match general_ledger {
            Some(gl) if config.parts.pp30_subsheet => {
                Some(pp30_summary(config, gl, &matcher, &inputs.pp30_reported))
            }
            _ => None,
        };

        let inventory = inputs
            .inventory
            .as_ref()
            .map(|inventory| inventory.for_period(config.year, config.month).entries(config));

        let document = ReportAssembler::new(config).assemble(&ReportInputs {
            sheet: &sheet,
            reconciled: &reconciled,
            ledger: ledger.as_ref(),
            malformed_markers: &malformed_markers,
            pp30: pp30.as_ref(),
            inventory: inventory.as_deref(),
        })?;

        Ok(RunOutcome {
            sheet,
            reconciled,
            ledger,
            pp30,
            document,
        })
    }
}

pub fn process_reconciliation(
    config: &ReconciliationConfig,
    inputs: &RunInputs,
) -> Result<ReportDocument> {
    ReconciliationProcessor::process(config, inputs)
}

fn segmenter_for(config: &ReconciliationConfig, filter: CodeFilter) -> LedgerSegmenter {
    LedgerSegmenter::new(config.marker_text.clone(), filter)
        .with_code_column(config.ledger_layout.code_column)
}

fn pp30_summary(
    config: &ReconciliationConfig,
    general_ledger: &TabularSource,
    matcher: &ReconciliationMatcher,
    reported: &BTreeMap<u32, f64>,
) -> Pp30Summary {
    let revenue_codes = config.form_codes.revenue_codes();
    let credit_note_codes: Vec<AccountCode> = config
        .form_codes
        .credit_note
        .iter()
        .filter(|code| !code.is_empty())
        .cloned()
        .collect();

    if revenue_codes.is_empty() {
        warn!("No revenue code configured; the PP30 revenue series will be zero");
    }

    let wanted: Vec<AccountCode> = revenue_codes
        .iter()
        .chain(credit_note_codes.iter())
        .cloned()
        .collect();
    let segmentation = segmenter_for(config, CodeFilter::Exact(wanted)).segment(general_ledger);
    debug!(
        "PP30 scan found {} revenue/credit-note blocks",
        segmentation.blocks.len()
    );
    let book = LedgerBook::from_blocks(segmentation.blocks);

    let aggregator = PeriodAggregator::new(&config.ledger_layout, Some(config.year));
    let revenue = aggregator.aggregate_codes(&book, &revenue_codes, Orientation::CreditNormal);
    let credit_note =
        aggregator.aggregate_codes(&book, &credit_note_codes, Orientation::DebitNormal);

    Pp30Summary::build(&revenue, &credit_note, reported, matcher)
}
