//! Lays the computed structures out as a spreadsheet-shaped document.
//!
//! Nothing here touches storage. A [`ReportDocument`] is a list of named
//! [`Section`]s, each a grid of [`CellValue`]s; formula cells carry both the
//! spreadsheet expression and the value it evaluates to, so a writer can
//! emit either.

use crate::error::{ReconciliationError, Result};
use crate::inventory::InventoryEntry;
use crate::period::Pp30Summary;
use crate::reconciliation::{ItemKind, ReconciledItem};
use crate::schema::{ReconciliationConfig, TrialBalanceLayout, RAW_COLUMN_COUNT};
use crate::segmenter::{LedgerBook, LedgerDestination};
use crate::statement::{StatementImbalance, StatementSheet};
use crate::table::{Cell, Row};
use crate::utils::{column_letter, month_name, period_end};
use log::info;
use serde::{Deserialize, Serialize};

pub const WORKFLOW_SECTION: &str = "Workflow Result";
pub const TB_SECTION: &str = "TB";
pub const RECONCILE_SECTION: &str = "Reconcile";
pub const PP30_SECTION: &str = "PP30";
pub const ANOMALIES_SECTION: &str = "Anomalies";

const NET_COLUMN: usize = 10;
const PL_DEBIT_COLUMN: usize = 11;
const PL_CREDIT_COLUMN: usize = 12;
const BS_DEBIT_COLUMN: usize = 13;
const BS_CREDIT_COLUMN: usize = 14;

const RAW_COLUMN_HEADERS: [&str; RAW_COLUMN_COUNT] = [
    "Brought Forward Dr",
    "Brought Forward Cr",
    "Movement Dr",
    "Movement Cr",
    "Debit",
    "Credit",
    "Adjustment Dr",
    "Adjustment Cr",
];

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CellValue {
    #[default]
    Empty,
    Text {
        text: String,
    },
    Number {
        value: f64,
    },
    /// A spreadsheet expression and its evaluated value; `None` when it evaluates to blank.
    Formula {
        expression: String,
        value: Option<f64>,
    },
}

impl CellValue {
    pub fn text(text: impl Into<String>) -> Self {
        CellValue::Text { text: text.into() }
    }

    pub fn number(value: f64) -> Self {
        CellValue::Number { value }
    }

    pub fn formula(expression: impl Into<String>, value: Option<f64>) -> Self {
        CellValue::Formula {
            expression: expression.into(),
            value,
        }
    }

    pub fn optional_number(value: Option<f64>) -> Self {
        value.map(CellValue::number).unwrap_or_default()
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            CellValue::Number { value } => Some(*value),
            CellValue::Formula { value, .. } => *value,
            _ => None,
        }
    }

    /// Field as written to CSV: formulas keep their expression.
    pub fn to_csv_field(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text { text } => text.clone(),
            CellValue::Number { value } => value.to_string(),
            CellValue::Formula { expression, .. } => expression.clone(),
        }
    }

    /// Field as shown to a reader: formulas show their value.
    pub fn display(&self) -> String {
        match self {
            CellValue::Empty => String::new(),
            CellValue::Text { text } => text.clone(),
            CellValue::Number { value } => format!("{:.2}", value),
            CellValue::Formula { value, .. } => {
                value.map(|v| format!("{:.2}", v)).unwrap_or_default()
            }
        }
    }
}

impl From<&Cell> for CellValue {
    fn from(cell: &Cell) -> Self {
        match cell {
            Cell::Empty => CellValue::Empty,
            Cell::Text(text) => CellValue::text(text.clone()),
            Cell::Number(value) => CellValue::number(*value),
            Cell::Date(date) => CellValue::text(date.format("%d/%m/%Y").to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub name: String,
    pub rows: Vec<Vec<CellValue>>,
}

impl Section {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<CellValue>) {
        self.rows.push(row);
    }

    pub fn push_text_row(&mut self, values: &[&str]) {
        self.rows
            .push(values.iter().map(|v| CellValue::text(*v)).collect());
    }

    /// 1-based spreadsheet row number the next pushed row will occupy.
    pub fn next_row_number(&self) -> usize {
        self.rows.len() + 1
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Cell at a 1-based row number and zero-based column, as a spreadsheet would address it.
    pub fn cell(&self, row_number: usize, column: usize) -> Option<&CellValue> {
        self.rows.get(row_number.checked_sub(1)?)?.get(column)
    }

    pub fn to_csv(&self) -> Result<String> {
        let mut writer = csv::WriterBuilder::new()
            .flexible(true)
            .from_writer(Vec::new());
        for row in &self.rows {
            writer.write_record(row.iter().map(CellValue::to_csv_field))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| ReconciliationError::IoError(e.into_error()))?;
        String::from_utf8(bytes).map_err(|e| {
            ReconciliationError::IoError(std::io::Error::new(std::io::ErrorKind::InvalidData, e))
        })
    }

    fn to_markdown(&self) -> String {
        let width = self.rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return String::new();
        }

        let mut output = String::new();
        output.push('|');
        for column in 0..width {
            output.push_str(&format!(" {} |", column_letter(column)));
        }
        output.push_str("\n|");
        for _ in 0..width {
            output.push_str("---|");
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for column in 0..width {
                let text = row.get(column).map(CellValue::display).unwrap_or_default();
                output.push_str(&format!(" {} |", text.replace('|', "\\|")));
            }
            output.push('\n');
        }
        output
    }
}

/// Non-fatal conditions found during a run. They never stop the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Anomaly {
    UnclassifiableCode { count: usize },
    /// Spreadsheet row numbers (1-based) of GL marker rows that opened no block.
    MalformedMarkerBlock { rows: Vec<usize> },
    StatementImbalance(StatementImbalance),
    AbsentAmount { label: String, detail: String },
}

impl Anomaly {
    pub fn kind(&self) -> &'static str {
        match self {
            Anomaly::UnclassifiableCode { .. } => "UnclassifiableCode",
            Anomaly::MalformedMarkerBlock { .. } => "MalformedMarkerBlock",
            Anomaly::StatementImbalance(_) => "StatementImbalance",
            Anomaly::AbsentAmount { .. } => "AbsentAmount",
        }
    }

    pub fn description(&self) -> String {
        match self {
            Anomaly::UnclassifiableCode { count } => {
                format!("{} TB rows have an unclassifiable account code", count)
            }
            Anomaly::MalformedMarkerBlock { rows } => {
                let rows: Vec<String> = rows.iter().map(|r| r.to_string()).collect();
                format!("GL marker rows without an account code: {}", rows.join(", "))
            }
            Anomaly::StatementImbalance(imbalance) => format!(
                "Balance sheet debit {:.2} + P/L difference {:.2} != credit {:.2} (off by {:.2})",
                imbalance.balance_sheet_debit,
                imbalance.profit_loss_difference,
                imbalance.balance_sheet_credit,
                imbalance.discrepancy
            ),
            Anomaly::AbsentAmount { label, detail } => format!("{}: {}", label, detail),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDocument {
    pub title: String,
    pub sections: Vec<Section>,
    pub anomalies: Vec<Anomaly>,
}

impl ReportDocument {
    pub fn section(&self, name: &str) -> Option<&Section> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|s| s.name.as_str()).collect()
    }

    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn to_markdown(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!("# {}\n\n", self.title));

        for section in &self.sections {
            output.push_str(&format!("## {}\n\n", section.name));
            output.push_str(&section.to_markdown());
            output.push('\n');
        }

        output
    }
}

/// Everything the assembler lays out. Optional parts are left out of the document when `None`.
pub struct ReportInputs<'a> {
    pub sheet: &'a StatementSheet,
    pub reconciled: &'a [ReconciledItem],
    pub ledger: Option<&'a LedgerBook>,
    /// Zero-based source rows of GL marker rows with no account code above them.
    pub malformed_markers: &'a [usize],
    pub pp30: Option<&'a Pp30Summary>,
    pub inventory: Option<&'a [InventoryEntry]>,
}

pub struct ReportAssembler<'a> {
    config: &'a ReconciliationConfig,
}

impl<'a> ReportAssembler<'a> {
    pub fn new(config: &'a ReconciliationConfig) -> Self {
        Self { config }
    }

    pub fn assemble(&self, inputs: &ReportInputs<'_>) -> Result<ReportDocument> {
        let mut sections = Vec::new();

        if let Some(entries) = inputs.inventory {
            sections.push(self.workflow_section(entries));
        }
        if self.config.parts.tb_subsheet {
            sections.push(self.tb_section(inputs.sheet)?);
        }
        sections.push(self.reconcile_section(inputs.reconciled));
        if let Some(book) = inputs.ledger {
            sections.extend(book.destinations().iter().map(|d| self.ledger_section(d)));
        }
        if let Some(summary) = inputs.pp30 {
            sections.push(self.pp30_section(summary));
        }

        let anomalies = collect_anomalies(inputs);
        if !anomalies.is_empty() {
            sections.push(anomalies_section(&anomalies));
        }

        let document = ReportDocument {
            title: format!(
                "{} Tax Reconciliation {}",
                self.config.company_name,
                self.config.period_label()
            ),
            sections,
            anomalies,
        };

        info!(
            "Assembled report '{}' with {} sections and {} anomalies",
            document.title,
            document.sections.len(),
            document.anomalies.len()
        );

        Ok(document)
    }

    fn workflow_section(&self, entries: &[InventoryEntry]) -> Section {
        let mut section = Section::new(WORKFLOW_SECTION);
        section.push_text_row(&["Name", "TB Code", "File Found"]);
        for entry in entries {
            section.push_row(vec![
                CellValue::text(entry.name.clone()),
                entry
                    .tb_code
                    .as_ref()
                    .map(|code| CellValue::text(code.as_str()))
                    .unwrap_or_default(),
                CellValue::text(entry.files_found()),
            ]);
        }
        section
    }

    fn tb_section(&self, sheet: &StatementSheet) -> Result<Section> {
        let config = self.config;
        let layout = &config.trial_balance_layout;
        let mut section = Section::new(TB_SECTION);

        let end = period_end(config.year, config.month)?;
        let code_range = match sheet.code_range() {
            Some((min, max)) => format!("Account codes {} - {}", min, max),
            None => "Account codes: none".to_string(),
        };
        let captions = [
            config.company_name.clone(),
            "Trial Balance Worksheet".to_string(),
            format!("For the period ended {}", end.format("%d/%m/%Y")),
            format!(
                "Department: {}",
                config.department.as_deref().unwrap_or("-")
            ),
            code_range,
        ];
        for caption in captions {
            section.push_row(vec![CellValue::text(caption)]);
        }

        let mut header = vec!["Code", "Account Name"];
        header.extend(RAW_COLUMN_HEADERS);
        header.extend(["Net", "P/L Debit", "P/L Credit", "B/S Debit", "B/S Credit"]);
        section.push_text_row(&header);

        let net_letters = NetLetters::for_layout(layout);
        let k = column_letter(NET_COLUMN);
        let first_data_row = section.next_row_number();

        for computed in &sheet.rows {
            let r = section.next_row_number();
            let mut cells = Vec::with_capacity(BS_CREDIT_COLUMN + 1);
            cells.push(CellValue::text(computed.row.code.as_str()));
            cells.push(CellValue::text(computed.row.name.clone()));
            cells.extend(computed.row.columns.iter().map(|v| CellValue::number(*v)));

            cells.push(match &net_letters {
                Some(letters) => CellValue::formula(letters.expression(r), Some(computed.net)),
                None => CellValue::number(computed.net),
            });

            // An empty placement leaves its pair of cells blank, not zero.
            for placement in [&computed.profit_loss, &computed.balance_sheet] {
                if placement.is_empty() {
                    cells.extend([CellValue::Empty, CellValue::Empty]);
                } else {
                    cells.push(CellValue::formula(
                        format!("=IF({k}{r}>0,{k}{r},\"\")"),
                        placement.debit,
                    ));
                    cells.push(CellValue::formula(
                        format!("=IF({k}{r}<=0,-{k}{r},\"\")"),
                        placement.credit,
                    ));
                }
            }

            section.push_row(cells);
        }

        let last_data_row = section.next_row_number() - 1;
        let summary = &sheet.summary;
        let total_row = section.next_row_number();

        let mut totals = vec![CellValue::text("Total"), CellValue::Empty];
        let total_values = summary
            .column_totals
            .iter()
            .copied()
            .chain([
                summary.net_total,
                summary.profit_loss_debit,
                summary.profit_loss_credit,
                summary.balance_sheet_debit,
                summary.balance_sheet_credit,
            ]);
        for (offset, value) in total_values.enumerate() {
            let letter = column_letter(2 + offset);
            totals.push(if sheet.rows.is_empty() {
                CellValue::number(value)
            } else {
                CellValue::formula(
                    format!("=SUM({letter}{first_data_row}:{letter}{last_data_row})"),
                    Some(value),
                )
            });
        }
        section.push_row(totals);

        let l = column_letter(PL_DEBIT_COLUMN);
        let m = column_letter(PL_CREDIT_COLUMN);
        let n = column_letter(BS_DEBIT_COLUMN);
        let o = column_letter(BS_CREDIT_COLUMN);

        let difference_row = section.next_row_number();
        section.push_row(summary_row(
            "P/L difference (debit - credit)",
            PL_DEBIT_COLUMN,
            CellValue::formula(
                format!("={l}{total_row}-{m}{total_row}"),
                Some(summary.profit_loss_difference),
            ),
        ));

        let mut income = summary_row(
            "Net profit (loss)",
            PL_DEBIT_COLUMN,
            CellValue::formula(format!("=-{l}{difference_row}"), Some(summary.net_income())),
        );
        income[2] = CellValue::text(if summary.net_income() >= 0.0 {
            "Profit"
        } else {
            "Loss"
        });
        section.push_row(income);

        let mut check = summary_row(
            "Balance check",
            BS_DEBIT_COLUMN,
            CellValue::formula(
                format!("={n}{total_row}+{l}{difference_row}"),
                Some(summary.balance_sheet_debit + summary.profit_loss_difference),
            ),
        );
        check.push(CellValue::formula(
            format!("={o}{total_row}"),
            Some(summary.balance_sheet_credit),
        ));
        check[2] = CellValue::text(if summary.is_balanced() {
            "Balanced"
        } else {
            "Not balanced"
        });
        section.push_row(check);

        Ok(section)
    }

    fn reconcile_section(&self, reconciled: &[ReconciledItem]) -> Section {
        let mut section = Section::new(RECONCILE_SECTION);
        section.push_text_row(&[
            "Item",
            "Kind",
            "TB Code",
            "Document Amount",
            "TB Amount",
            "Secondary Amount",
            "Result 1",
            "Result 2",
            "Note",
        ]);

        for entry in reconciled {
            let item = &entry.item;
            let kind = match item.kind {
                ItemKind::Bank => "Bank".to_string(),
                ItemKind::TaxForm(form) => form.label().to_string(),
            };
            section.push_row(vec![
                CellValue::text(item.label.clone()),
                CellValue::text(kind),
                CellValue::text(item.tb_code.as_str()),
                CellValue::optional_number(item.document_amount),
                CellValue::optional_number(item.tb_amount),
                CellValue::optional_number(item.secondary_amount),
                CellValue::text(entry.result1.label()),
                CellValue::text(entry.result2.label()),
                item.note
                    .as_ref()
                    .map(|note| CellValue::text(note.clone()))
                    .unwrap_or_default(),
            ]);
        }
        section
    }

    fn ledger_section(&self, destination: &LedgerDestination) -> Section {
        let layout = &self.config.ledger_layout;
        let mut section = Section::new(destination.code.as_str());
        section.push_row(row_values(&destination.header));

        let first_entry = section.next_row_number();
        for entry in &destination.entries {
            section.push_row(row_values(entry));
        }
        let last_entry = section.next_row_number() - 1;

        let width = layout.debit_column.max(layout.credit_column) + 1;
        let mut totals = vec![CellValue::Empty; width];
        totals[layout.code_column.min(width - 1)] = CellValue::text("Total");
        for column in [layout.debit_column, layout.credit_column] {
            let value: f64 = destination
                .entries
                .iter()
                .filter_map(|e| e.cell(column).as_number())
                .sum();
            let letter = column_letter(column);
            totals[column] = if destination.entries.is_empty() {
                CellValue::number(value)
            } else {
                CellValue::formula(
                    format!("=SUM({letter}{first_entry}:{letter}{last_entry})"),
                    Some(value),
                )
            };
        }
        section.push_row(totals);
        section
    }

    fn pp30_section(&self, summary: &Pp30Summary) -> Section {
        let mut section = Section::new(PP30_SECTION);
        section.push_text_row(&[
            "Month",
            "Revenue",
            "Credit Note",
            "Diff",
            "PP30 Reported",
            "Result",
        ]);

        let first_row = section.next_row_number();
        for row in &summary.rows {
            let r = section.next_row_number();
            section.push_row(vec![
                CellValue::text(month_name(row.month)),
                CellValue::number(row.revenue),
                CellValue::number(row.credit_note),
                CellValue::formula(format!("=B{r}-C{r}"), Some(row.diff)),
                CellValue::optional_number(row.reported),
                CellValue::text(row.verdict.label()),
            ]);
        }
        let last_row = section.next_row_number() - 1;

        let reported_total: f64 = summary.rows.iter().filter_map(|r| r.reported).sum();
        let sum = |letter: &str, value: f64| {
            CellValue::formula(
                format!("=SUM({letter}{first_row}:{letter}{last_row})"),
                Some(value),
            )
        };
        section.push_row(vec![
            CellValue::text("Total"),
            sum("B", summary.total_revenue),
            sum("C", summary.total_credit_note),
            sum("D", summary.total_diff),
            sum("E", reported_total),
            CellValue::Empty,
        ]);
        section
    }
}

/// Spreadsheet letters of the four TB columns that make up the net.
struct NetLetters {
    debit: String,
    credit: String,
    adjustment_debit: String,
    adjustment_credit: String,
}

impl NetLetters {
    /// `None` when a designated column lies outside the raw columns copied into the report.
    fn for_layout(layout: &TrialBalanceLayout) -> Option<Self> {
        let letter = |column: usize| {
            layout
                .raw_columns()
                .contains(&column)
                .then(|| column_letter(2 + column - layout.first_raw_column))
        };
        Some(Self {
            debit: letter(layout.debit_column)?,
            credit: letter(layout.credit_column)?,
            adjustment_debit: letter(layout.adjustment_debit_column)?,
            adjustment_credit: letter(layout.adjustment_credit_column)?,
        })
    }

    fn expression(&self, r: usize) -> String {
        format!(
            "={}{r}+{}{r}-{}{r}-{}{r}",
            self.debit, self.adjustment_debit, self.credit, self.adjustment_credit
        )
    }
}

fn summary_row(label: &str, column: usize, value: CellValue) -> Vec<CellValue> {
    let mut row = vec![CellValue::Empty; column + 1];
    row[1] = CellValue::text(label);
    row[column] = value;
    row
}

fn row_values(row: &Row) -> Vec<CellValue> {
    row.cells.iter().map(CellValue::from).collect()
}

fn collect_anomalies(inputs: &ReportInputs<'_>) -> Vec<Anomaly> {
    let mut anomalies = Vec::new();
    let summary = &inputs.sheet.summary;

    if summary.unclassified_rows > 0 {
        anomalies.push(Anomaly::UnclassifiableCode {
            count: summary.unclassified_rows,
        });
    }
    if !inputs.malformed_markers.is_empty() {
        anomalies.push(Anomaly::MalformedMarkerBlock {
            rows: inputs.malformed_markers.iter().map(|r| r + 1).collect(),
        });
    }
    if let Some(imbalance) = summary.imbalance {
        anomalies.push(Anomaly::StatementImbalance(imbalance));
    }
    for entry in inputs.reconciled {
        if let Some(note) = &entry.item.note {
            anomalies.push(Anomaly::AbsentAmount {
                label: entry.item.label.clone(),
                detail: note.clone(),
            });
        }
    }

    anomalies
}

fn anomalies_section(anomalies: &[Anomaly]) -> Section {
    let mut section = Section::new(ANOMALIES_SECTION);
    section.push_text_row(&["Kind", "Detail"]);
    for anomaly in anomalies {
        section.push_row(vec![
            CellValue::text(anomaly.kind()),
            CellValue::text(anomaly.description()),
        ]);
    }
    section
}
