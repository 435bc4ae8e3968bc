use crate::classifier::AccountCode;
use crate::error::{ReconciliationError, Result};
use crate::utils::validate_month;
use schemars::gen::SchemaGenerator;
use schemars::schema::{InstanceType, Metadata, ObjectValidation, Schema, SchemaObject};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Literal text in column A of a GL export that opens each account block ("sequence number").
pub const DEFAULT_MARKER_TEXT: &str = "ลำดับที่";

/// Number of raw numeric TB columns (C..J) carried through to the statement sheet.
pub const RAW_COLUMN_COUNT: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum FormType {
    #[schemars(description = "Withholding tax on salaries")]
    Pnd1,
    #[schemars(description = "Withholding tax on payments to individuals")]
    Pnd3,
    #[schemars(description = "Withholding tax on payments to juristic persons")]
    Pnd53,
    #[schemars(description = "Monthly VAT return")]
    Pp30,
    #[schemars(description = "Social security contributions")]
    Sso,
}

impl FormType {
    pub const FIXED: [FormType; 5] = [
        FormType::Pnd1,
        FormType::Pnd3,
        FormType::Pnd53,
        FormType::Pp30,
        FormType::Sso,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormType::Pnd1 => "PND1",
            FormType::Pnd3 => "PND3",
            FormType::Pnd53 => "PND53",
            FormType::Pp30 => "PP30",
            FormType::Sso => "SSO",
        }
    }
}

impl fmt::Display for FormType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BankAccount {
    #[schemars(description = "Bank name as it appears in statement file names, e.g. 'SCB' or 'KBank'")]
    pub name: String,

    #[schemars(description = "TB code of the bank's cash account")]
    pub tb_code: AccountCode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema, Default)]
pub struct FormCodes {
    #[schemars(schema_with = "form_keys_schema")]
    #[serde(default)]
    pub forms: BTreeMap<FormType, AccountCode>,

    #[schemars(description = "Primary revenue TB code summed into the PP30 revenue series")]
    #[serde(default)]
    pub revenue: Option<AccountCode>,

    #[schemars(description = "Optional second revenue TB code, added to the primary one")]
    #[serde(default)]
    pub revenue2: Option<AccountCode>,

    #[schemars(description = "Credit-note (sales returns) TB code, subtracted from revenue")]
    #[serde(default)]
    pub credit_note: Option<AccountCode>,
}

/// Object schema keyed by the form labels, since map keys are not reflected.
fn form_keys_schema(generator: &mut SchemaGenerator) -> Schema {
    let properties = FormType::FIXED
        .iter()
        .map(|form| (form.label().to_string(), generator.subschema_for::<AccountCode>()))
        .collect();

    Schema::Object(SchemaObject {
        metadata: Some(Box::new(Metadata {
            description: Some("TB code reconciled against each fixed tax form".to_string()),
            ..Default::default()
        })),
        instance_type: Some(InstanceType::Object.into()),
        object: Some(Box::new(ObjectValidation {
            properties,
            additional_properties: Some(Box::new(Schema::Bool(false))),
            ..Default::default()
        })),
        ..Default::default()
    })
}

impl FormCodes {
    pub fn form(&self, form: FormType) -> Option<&AccountCode> {
        self.forms.get(&form).filter(|code| !code.is_empty())
    }

    pub fn revenue_codes(&self) -> Vec<AccountCode> {
        self.revenue
            .iter()
            .chain(self.revenue2.iter())
            .filter(|code| !code.is_empty())
            .cloned()
            .collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReconcileParts {
    #[serde(default = "default_true")]
    pub tb_subsheet: bool,
    #[serde(default = "default_true")]
    pub gl_subsheet: bool,
    #[serde(default = "default_true")]
    pub pp30_subsheet: bool,
}

impl Default for ReconcileParts {
    fn default() -> Self {
        Self {
            tb_subsheet: true,
            gl_subsheet: true,
            pp30_subsheet: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Zero-based column positions of a trial-balance export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TrialBalanceLayout {
    #[schemars(description = "Rows above this index are captions and are skipped; a Debit/Credit column header line is skipped wherever it appears")]
    pub first_data_row: usize,
    pub code_column: usize,
    pub name_column: usize,
    #[schemars(description = "First of the eight raw numeric columns (C by default)")]
    pub first_raw_column: usize,
    pub debit_column: usize,
    pub credit_column: usize,
    pub adjustment_debit_column: usize,
    pub adjustment_credit_column: usize,
}

impl Default for TrialBalanceLayout {
    fn default() -> Self {
        Self {
            first_data_row: 0,
            code_column: 0,
            name_column: 1,
            first_raw_column: 2,
            debit_column: 6,
            credit_column: 7,
            adjustment_debit_column: 8,
            adjustment_credit_column: 9,
        }
    }
}

impl TrialBalanceLayout {
    pub fn raw_columns(&self) -> std::ops::Range<usize> {
        self.first_raw_column..self.first_raw_column + RAW_COLUMN_COUNT
    }
}

/// Zero-based column positions of a general-ledger export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LedgerLayout {
    pub code_column: usize,
    pub date_column: usize,
    pub debit_column: usize,
    pub credit_column: usize,
}

impl Default for LedgerLayout {
    fn default() -> Self {
        Self {
            code_column: 0,
            date_column: 2,
            debit_column: 6,
            credit_column: 7,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconciliationConfig {
    #[schemars(description = "Company name as used for captions and folder lookup")]
    pub company_name: String,

    pub year: i32,

    #[schemars(description = "Reporting month, 1 = January ... 12 = December")]
    pub month: u32,

    #[serde(default)]
    pub department: Option<String>,

    #[serde(default)]
    pub banks: Vec<BankAccount>,

    #[serde(default)]
    pub form_codes: FormCodes,

    #[serde(default)]
    pub parts: ReconcileParts,

    #[schemars(description = "Absolute tolerance for reconciliation equality; 0.0 means exact")]
    #[serde(default)]
    pub tolerance: f64,

    #[schemars(description = "Absolute tolerance for the balance sheet identity")]
    #[serde(default = "default_balance_tolerance")]
    pub balance_tolerance: f64,

    #[serde(default = "default_marker_text")]
    pub marker_text: String,

    #[serde(default)]
    pub trial_balance_layout: TrialBalanceLayout,

    #[serde(default)]
    pub ledger_layout: LedgerLayout,
}

fn default_balance_tolerance() -> f64 {
    0.005
}

fn default_marker_text() -> String {
    DEFAULT_MARKER_TEXT.to_string()
}

impl ReconciliationConfig {
    pub fn new(company_name: impl Into<String>, year: i32, month: u32) -> Self {
        Self {
            company_name: company_name.into(),
            year,
            month,
            department: None,
            banks: Vec::new(),
            form_codes: FormCodes::default(),
            parts: ReconcileParts::default(),
            tolerance: 0.0,
            balance_tolerance: default_balance_tolerance(),
            marker_text: default_marker_text(),
            trial_balance_layout: TrialBalanceLayout::default(),
            ledger_layout: LedgerLayout::default(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.company_name.trim().is_empty() {
            return Err(ReconciliationError::InvalidConfig(
                "company_name must not be empty".to_string(),
            ));
        }
        validate_month(self.month)?;

        for tolerance in [self.tolerance, self.balance_tolerance] {
            if !tolerance.is_finite() || tolerance < 0.0 {
                return Err(ReconciliationError::InvalidTolerance(tolerance));
            }
        }

        if self.marker_text.trim().is_empty() {
            return Err(ReconciliationError::InvalidConfig(
                "marker_text must not be empty".to_string(),
            ));
        }

        for bank in &self.banks {
            if bank.name.trim().is_empty() || bank.tb_code.is_empty() {
                return Err(ReconciliationError::InvalidConfig(format!(
                    "bank entry '{}' needs both a name and a TB code",
                    bank.name
                )));
            }
        }

        Ok(())
    }

    /// Banks in name order, the order the report lists them in.
    pub fn sorted_banks(&self) -> Vec<&BankAccount> {
        let mut banks: Vec<&BankAccount> = self.banks.iter().collect();
        banks.sort_by(|a, b| a.name.cmp(&b.name));
        banks
    }

    pub fn period_label(&self) -> String {
        format!("{:02}/{:04}", self.month, self.year)
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ReconciliationConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}
