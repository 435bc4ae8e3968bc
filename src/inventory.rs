use crate::classifier::AccountCode;
use crate::schema::{FormType, ReconciliationConfig};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// File-name token that selects a period's documents, e.g. `202403`.
pub fn period_token(year: i32, month: u32) -> String {
    format!("{:04}{:02}", year, month)
}

/// Source documents already located by the host for one company and period.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DocumentInventory {
    /// Bank statement file names; each bank claims those containing its name.
    pub bank_files: Vec<String>,
    pub form_files: BTreeMap<FormType, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub name: String,
    pub tb_code: Option<AccountCode>,
    pub files: Vec<String>,
}

impl InventoryEntry {
    pub fn files_found(&self) -> String {
        if self.files.is_empty() {
            "Not found".to_string()
        } else {
            self.files.join(", ")
        }
    }
}

impl DocumentInventory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bank_file(mut self, name: impl Into<String>) -> Self {
        self.bank_files.push(name.into());
        self
    }

    pub fn with_form_file(mut self, form: FormType, name: impl Into<String>) -> Self {
        self.form_files.entry(form).or_default().push(name.into());
        self
    }

    /// Keeps only file names carrying the period token.
    pub fn for_period(&self, year: i32, month: u32) -> Self {
        let token = period_token(year, month);
        let keep = |files: &[String]| -> Vec<String> {
            files.iter().filter(|f| f.contains(&token)).cloned().collect()
        };

        Self {
            bank_files: keep(&self.bank_files),
            form_files: self
                .form_files
                .iter()
                .map(|(form, files)| (*form, keep(files)))
                .collect(),
        }
    }

    pub fn bank_files_for(&self, bank_name: &str) -> Vec<String> {
        let needle = bank_name.to_lowercase();
        self.bank_files
            .iter()
            .filter(|file| file.to_lowercase().contains(&needle))
            .cloned()
            .collect()
    }

    /// Rows of the workflow overview: banks in name order, then every fixed form.
    pub fn entries(&self, config: &ReconciliationConfig) -> Vec<InventoryEntry> {
        let banks = config.sorted_banks().into_iter().map(|bank| InventoryEntry {
            name: bank.name.clone(),
            tb_code: Some(bank.tb_code.clone()),
            files: self.bank_files_for(&bank.name),
        });

        let forms = FormType::FIXED.iter().map(|&form| InventoryEntry {
            name: form.label().to_string(),
            tb_code: config.form_codes.form(form).cloned(),
            files: self.form_files.get(&form).cloned().unwrap_or_default(),
        });

        banks.chain(forms).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::BankAccount;

    #[test]
    fn test_period_token() {
        assert_eq!(period_token(2024, 3), "202403");
        assert_eq!(period_token(2024, 12), "202412");
    }

    #[test]
    fn test_entries_match_banks_case_insensitively() {
        let mut config = ReconciliationConfig::new("ACME", 2024, 3);
        config.banks = vec![
            BankAccount {
                name: "SCB".into(),
                tb_code: "101002".into(),
            },
            BankAccount {
                name: "KBank".into(),
                tb_code: "101001".into(),
            },
        ];
        config.form_codes.forms.insert(FormType::Pp30, "214000".into());

        let inventory = DocumentInventory::new()
            .with_bank_file("kbank_202403.pdf")
            .with_bank_file("scb_202403.pdf")
            .with_bank_file("SCB_202402.pdf")
            .with_form_file(FormType::Pp30, "PP30_202403.pdf")
            .for_period(2024, 3);

        let entries = inventory.entries(&config);
        assert_eq!(entries.len(), 2 + FormType::FIXED.len());
        assert_eq!(entries[0].name, "KBank");
        assert_eq!(entries[0].files, vec!["kbank_202403.pdf".to_string()]);
        assert_eq!(entries[1].files, vec!["scb_202403.pdf".to_string()]);

        let pp30 = entries.iter().find(|e| e.name == "PP30").unwrap();
        assert_eq!(pp30.tb_code, Some(AccountCode::new("214000")));
        assert_eq!(pp30.files_found(), "PP30_202403.pdf");

        let sso = entries.iter().find(|e| e.name == "SSO").unwrap();
        assert_eq!(sso.tb_code, None);
        assert_eq!(sso.files_found(), "Not found");
    }
}
