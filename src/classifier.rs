use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Account code as written in column A of the TB and GL exports.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AccountCode(String);

impl AccountCode {
    pub fn new(code: impl AsRef<str>) -> Self {
        Self(code.as_ref().trim().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn leading_char(&self) -> Option<char> {
        self.0.chars().next()
    }

    pub fn category(&self) -> AccountCategory {
        AccountCategory::from_code(&self.0)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for AccountCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountCode {
    fn from(code: &str) -> Self {
        Self::new(code)
    }
}

impl From<String> for AccountCode {
    fn from(code: String) -> Self {
        Self::new(code)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "PascalCase")]
pub enum AccountCategory {
    #[schemars(description = "Codes starting with 1 (Balance Sheet, debit balance)")]
    Asset,

    #[schemars(description = "Codes starting with 2 (Balance Sheet, credit balance)")]
    Liability,

    #[schemars(description = "Codes starting with 3 (Balance Sheet, credit balance)")]
    Equity,

    #[schemars(description = "Codes starting with 4 (Profit and Loss, credit balance)")]
    Revenue,

    #[schemars(description = "Codes starting with 5 (Profit and Loss, debit balance)")]
    Expense,

    #[schemars(description = "Any other leading character; excluded from statement totals")]
    Other,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statement {
    ProfitLoss,
    BalanceSheet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NormalBalance {
    Debit,
    Credit,
}

impl AccountCategory {
    /// Category is decided by the first character of the code and nothing else.
    pub fn from_code(code: &str) -> Self {
        match code.trim_start().chars().next() {
            Some('1') => AccountCategory::Asset,
            Some('2') => AccountCategory::Liability,
            Some('3') => AccountCategory::Equity,
            Some('4') => AccountCategory::Revenue,
            Some('5') => AccountCategory::Expense,
            _ => AccountCategory::Other,
        }
    }

    pub fn statement(self) -> Option<Statement> {
        match self {
            AccountCategory::Revenue | AccountCategory::Expense => Some(Statement::ProfitLoss),
            AccountCategory::Asset | AccountCategory::Liability | AccountCategory::Equity => {
                Some(Statement::BalanceSheet)
            }
            AccountCategory::Other => None,
        }
    }

    pub fn normal_balance(self) -> Option<NormalBalance> {
        match self {
            AccountCategory::Asset | AccountCategory::Expense => Some(NormalBalance::Debit),
            AccountCategory::Liability | AccountCategory::Equity | AccountCategory::Revenue => {
                Some(NormalBalance::Credit)
            }
            AccountCategory::Other => None,
        }
    }

    pub fn is_classified(self) -> bool {
        self != AccountCategory::Other
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub category: AccountCategory,
    pub normal_balance: Option<NormalBalance>,
}

pub fn classify(code: &str) -> Classification {
    let category = AccountCategory::from_code(code);
    Classification {
        category,
        normal_balance: category.normal_balance(),
    }
}

/// A signed balance presented as a debit/credit column pair.
/// `None` means the column is left empty, which is distinct from a zero balance.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Placement {
    pub debit: Option<f64>,
    pub credit: Option<f64>,
}

impl Placement {
    pub const EMPTY: Placement = Placement {
        debit: None,
        credit: None,
    };

    /// Positive nets go to the debit column, zero and negative nets to the credit column as `|net|`.
    pub fn from_net(net: f64) -> Self {
        if net > 0.0 {
            Placement {
                debit: Some(net),
                credit: None,
            }
        } else {
            Placement {
                debit: None,
                credit: Some(net.abs()),
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.debit.is_none() && self.credit.is_none()
    }

    pub fn debit_or_zero(&self) -> f64 {
        self.debit.unwrap_or(0.0)
    }

    pub fn credit_or_zero(&self) -> f64 {
        self.credit.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StatementPlacement {
    pub profit_loss: Placement,
    pub balance_sheet: Placement,
}

impl StatementPlacement {
    pub fn for_category(category: AccountCategory, net: f64) -> Self {
        match category.statement() {
            Some(Statement::ProfitLoss) => StatementPlacement {
                profit_loss: Placement::from_net(net),
                balance_sheet: Placement::EMPTY,
            },
            Some(Statement::BalanceSheet) => StatementPlacement {
                profit_loss: Placement::EMPTY,
                balance_sheet: Placement::from_net(net),
            },
            None => StatementPlacement::default(),
        }
    }
}
