use tax_reconciliation_builder::{
    process_reconciliation, BankAccount, DocumentInventory, FormType, ReconciliationConfig,
    RunInputs, TabularSource,
};

const TRIAL_BALANCE: &str = "\
101001,Cash at bank - KBank,0,0,0,0,\"152,340.50\",0,0,0
213003,Withholding tax payable PND3,0,0,0,0,0,\"3,150.00\",0,0
214000,VAT payable,0,0,0,0,0,\"6,993.00\",0,0
301000,Share capital,0,0,0,0,0,\"100,000.00\",0,0
411000,Sales,0,0,0,0,0,\"99,900.00\",0,0
412000,Sales returns,0,0,0,0,\"2,000.00\",0,0,0
521000,Salaries,0,0,0,0,\"55,702.50\",0,0,0
";

const GENERAL_LEDGER: &str = "\
101001 Cash at bank - KBank,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,03/03/2024,RV-0301,Cash sale,,\"99,900.00\",
2,,25/03/2024,PV-0302,Salaries,,,\"55,702.50\"
,,,,,,,
411000 Sales,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,03/03/2024,IV-0301,Cash sale,,,\"99,900.00\"
,,,,,,,
412000 Sales returns,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,18/03/2024,CN-0301,Return,,\"2,000.00\",
";

fn main() -> anyhow::Result<()> {
    let mut config = ReconciliationConfig::new("Chiang Mai Crafts Co., Ltd.", 2024, 3);
    config.department = Some("Head Office".to_string());
    config.banks.push(BankAccount {
        name: "KBank".to_string(),
        tb_code: "101001".into(),
    });
    config.form_codes.forms.insert(FormType::Pnd3, "213003".into());
    config.form_codes.forms.insert(FormType::Pp30, "214000".into());
    config.form_codes.revenue = Some("411000".into());
    config.form_codes.credit_note = Some("412000".into());

    let inputs = RunInputs::new()
        .with_trial_balance(TabularSource::from_csv_str("TB", TRIAL_BALANCE)?)
        .with_general_ledger(TabularSource::from_csv_str("GL", GENERAL_LEDGER)?)
        .with_extracted_amount("KBank", Some(152_340.50))
        .with_extracted_amount("PND3", Some(3_150.00))
        .with_extracted_amount("PP30", None)
        .with_secondary_amount("PND3", 3_150.00)
        .with_pp30_reported(3, 97_900.00)
        .with_inventory(
            DocumentInventory::new()
                .with_bank_file("KBank_202403.pdf")
                .with_form_file(FormType::Pnd3, "PND3_202403.pdf"),
        );

    let document = process_reconciliation(&config, &inputs)?;

    println!("{}", document.to_markdown());

    if !document.anomalies.is_empty() {
        println!("Anomalies:");
        for anomaly in &document.anomalies {
            println!("  - {}", anomaly.description());
        }
    }

    if let Some(section) = document.section("Reconcile") {
        std::fs::write("reconcile_202403.csv", section.to_csv()?)?;
        println!("\nWrote reconcile_202403.csv");
    }

    Ok(())
}
