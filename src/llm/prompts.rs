// Prompts for reading one reconciliation amount off a scanned document

use crate::llm::types::DocumentKind;
use crate::schema::FormType;
use crate::utils::month_name;

pub const SYSTEM_PROMPT_AMOUNT: &str = r#"
You are an accounting assistant reading Thai bank statements and Revenue Department / Social Security Office filings.

## YOUR MISSION
Find ONE amount in the attached document, as described in the user instruction, and report it.

## RULES
- Read only what is printed. Never add, subtract or estimate.
- Amounts are in Thai Baht. Drop thousands separators and currency symbols: "1,234,567.89" -> 1234567.89
- Amounts printed in parentheses or with a trailing minus are negative.
- Thai digits (๐-๙) must be converted to Arabic digits.
- If the document covers several periods, use the period named in the instruction.
- If the amount is not in the document, set `found` to false and `amount` to 0.

## OUTPUT FORMAT
Return ONLY valid JSON matching the response schema:
{ "found": true, "amount": 12345.67, "evidence": "<the printed line you read>" }
"#;

const BANK_STATEMENT_TASK: &str = "\
Read the CLOSING (ending) balance of the account at the end of the statement period. \
On Thai statements it is usually labelled 'ยอดคงเหลือ' on the last transaction line or 'Ending Balance' in the summary box. \
Do not use the opening balance or the total of deposits/withdrawals.";

const WITHHOLDING_TASK: &str = "\
Read the TOTAL WITHHOLDING TAX remitted on this return \
('รวมเงินภาษีที่นำส่ง' / 'ยอดภาษีที่นำส่งทั้งสิ้น'). \
Do not use the total income paid, and do not add surcharges or penalties.";

const PP30_TASK: &str = "\
Read the NET VAT of this PP30 return: the tax payable (line 'ภาษีที่ต้องชำระเดือนนี้') as a positive number, \
or the excess input tax ('ภาษีที่ชำระเกินเดือนนี้') as a negative number.";

const SSO_TASK: &str = "\
Read the TOTAL CONTRIBUTION remitted on this social security filing (employer plus employee share, \
'รวมเงินสมทบทั้งสิ้น').";

pub fn task_for(kind: DocumentKind) -> &'static str {
    match kind {
        DocumentKind::BankStatement => BANK_STATEMENT_TASK,
        DocumentKind::TaxForm(FormType::Pnd1 | FormType::Pnd3 | FormType::Pnd53) => {
            WITHHOLDING_TASK
        }
        DocumentKind::TaxForm(FormType::Pp30) => PP30_TASK,
        DocumentKind::TaxForm(FormType::Sso) => SSO_TASK,
    }
}

/// User instruction for one document, optionally pinned to a reporting period.
pub fn instruction_for(kind: DocumentKind, file_name: &str, period: Option<(i32, u32)>) -> String {
    let period_line = match period {
        Some((year, month)) => format!(
            "The reporting period is {} {} (month {:02}/{}).\n",
            month_name(month),
            year,
            month,
            year
        ),
        None => String::new(),
    };

    format!(
        "The attached file \"{}\" is a {}.\n{}\nTASK: {}\n\nReturn ONLY the JSON object.",
        file_name,
        kind,
        period_line,
        task_for(kind)
    )
}
