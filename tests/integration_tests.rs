use std::fs::File;
use std::io::Write;
use tax_reconciliation_builder::*;

const CONFIG_JSON: &str = r#"{
    "company_name": "Siam Trading Co., Ltd.",
    "year": 2024,
    "month": 12,
    "department": "Head Office",
    "banks": [
        { "name": "SCB", "tb_code": "101002" },
        { "name": "KBank", "tb_code": "101001" }
    ],
    "form_codes": {
        "forms": {
            "PND1": "213001",
            "PND3": "213003",
            "PND53": "213053",
            "PP30": "214000",
            "SSO": "215000"
        },
        "revenue": "411000",
        "credit_note": "412000"
    },
    "trial_balance_layout": {
        "first_data_row": 3,
        "code_column": 0,
        "name_column": 1,
        "first_raw_column": 2,
        "debit_column": 6,
        "credit_column": 7,
        "adjustment_debit_column": 8,
        "adjustment_credit_column": 9
    }
}"#;

const TB_CSV: &str = "\
\"Siam Trading Co., Ltd.\",,,,,,,,,
Trial Balance as of 31/12/2024,,,,,,,,,
Code,Name,BF Dr,BF Cr,Mv Dr,Mv Cr,Debit,Credit,Adj Dr,Adj Cr
101001,Cash at bank - KBank,0,0,0,0,\"250,000.00\",0,0,0
101002,Cash at bank - SCB,0,0,0,0,\"80,000.00\",0,0,0
113000,Accounts receivable,0,0,0,0,\"45,000.00\",0,5000,0
211000,Accounts payable,0,0,0,0,0,\"30,000.00\",0,0
213001,Withholding tax payable PND1,0,0,0,0,0,4500,0,0
213003,Withholding tax payable PND3,0,0,0,0,0,1200,0,0
213053,Withholding tax payable PND53,0,0,0,0,0,2300,0,0
214000,VAT payable,0,0,0,0,0,7000,0,0
215000,Social security payable,0,0,0,0,0,1500,0,0
301000,Share capital,0,0,0,0,0,\"200,000.00\",0,0
411000,Sales,0,0,0,0,0,\"600,000.00\",0,5000
412000,Sales returns,0,0,0,0,\"20,000.00\",0,0,0
511000,Cost of sales,0,0,0,0,\"300,000.00\",0,0,0
521000,Salaries,0,0,0,0,\"120,000.00\",0,0,0
522000,Rent,0,0,0,0,\"31,500.00\",0,0,0
";

const GL_CSV: &str = "\
Siam Trading Co.,,,,,,,
General Ledger 01/01/2024 - 31/12/2024,,,,,,,
101001 Cash at bank - KBank,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,05/01/2024,RV-001,Receipt,,100000,
2,,09/02/2024,PV-001,Supplier payment,,,20000
,,,,,,,
411000 Sales,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,,,Brought forward,,,
2,,31/12/2023,IV-999,Prior year sale,,,99999
3,,05/01/2024,IV-001,Sales,,,100000
4,,10/02/2024,IV-002,Sales,,,150000
5,,15/03/2024,IV-003,Sales,,,200000
,,,,,,,
412000 Sales returns,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,20/02/2024,CN-001,Return,,20000,
213003 - WHT PND3,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,07/03/2024,PV-010,Remit PND3,,1200,
,,,,,,,
999000 Suspense,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,01/04/2024,JV-001,Unknown,,10,
,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,02/04/2024,JV-002,Orphan entry,,5,
,,,,,,,
101001 Cash at bank - KBank,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,28/12/2024,RV-099,Receipt,,170000,
";

fn config() -> ReconciliationConfig {
    ReconciliationConfig::from_json(CONFIG_JSON).unwrap()
}

fn inputs() -> RunInputs {
    RunInputs::new()
        .with_trial_balance(TabularSource::from_csv_str("TB", TB_CSV).unwrap())
        .with_general_ledger(TabularSource::from_csv_str("GL", GL_CSV).unwrap())
        .with_extracted_amount("KBank", Some(250_000.0))
        .with_extracted_amount("SCB", None)
        .with_extracted_amount("PND1", Some(4_500.0))
        .with_extracted_amount("PND3", Some(1_250.0))
        .with_extracted_amount("PND53", Some(2_300.0))
        .with_extracted_amount("PP30", Some(7_000.0))
        .with_extracted_amount("SSO", Some(1_500.0))
        .with_secondary_amount("PND1", 4_500.0)
        .with_secondary_amount("PND3", 1_200.0)
        .with_secondary_amount("PP30", 7_000.0)
        .with_pp30_reported(1, 100_000.0)
        .with_pp30_reported(2, 130_000.0)
        .with_pp30_reported(3, 190_000.0)
        .with_inventory(
            DocumentInventory::new()
                .with_bank_file("KBank_202412.pdf")
                .with_bank_file("KBank_202411.pdf")
                .with_bank_file("scb_202412.pdf")
                .with_form_file(FormType::Pp30, "PP30_202412.pdf")
                .with_form_file(FormType::Pnd3, "PND3_202412.pdf"),
        )
}

fn export_sections(
    document: &ReportDocument,
    prefix: &str,
) -> std::result::Result<(), Box<dyn std::error::Error>> {
    let dir = std::env::temp_dir();
    for section in &document.sections {
        let path = dir.join(format!("{}_{}.csv", prefix, section.name.replace(' ', "_")));
        let mut file = File::create(path)?;
        file.write_all(section.to_csv()?.as_bytes())?;
    }
    let mut file = File::create(dir.join(format!("{}.md", prefix)))?;
    file.write_all(document.to_markdown().as_bytes())?;
    Ok(())
}

fn verdict_of<'a>(outcome: &'a RunOutcome, label: &str) -> &'a ReconciledItem {
    outcome
        .reconciled
        .iter()
        .find(|r| r.item.label == label)
        .unwrap()
}

#[test]
fn test_year_end_reconciliation() {
    let config = config();
    let outcome = ReconciliationProcessor::process_with_details(&config, &inputs()).unwrap();

    let summary = &outcome.sheet.summary;
    assert_eq!(outcome.sheet.rows.len(), 15);
    assert!(summary.is_balanced());
    assert_eq!(summary.unclassified_rows, 0);
    assert!((summary.net_income() - 133_500.0).abs() < 0.01);
    assert!((summary.balance_sheet_debit - 380_000.0).abs() < 0.01);
    assert!((summary.balance_sheet_credit - 246_500.0).abs() < 0.01);
    assert!(summary.net_total.abs() < 0.01);

    let labels: Vec<&str> = outcome
        .reconciled
        .iter()
        .map(|r| r.item.label.as_str())
        .collect();
    assert_eq!(
        labels,
        vec!["KBank", "SCB", "PND1", "PND3", "PND53", "PP30", "SSO"]
    );

    assert_eq!(verdict_of(&outcome, "KBank").result1, MatchVerdict::Correct);
    assert_eq!(verdict_of(&outcome, "KBank").result2, MatchVerdict::NotApplicable);
    assert_eq!(verdict_of(&outcome, "SCB").result1, MatchVerdict::NotApplicable);
    assert_eq!(verdict_of(&outcome, "PND1").result1, MatchVerdict::Correct);
    assert_eq!(verdict_of(&outcome, "PND1").result2, MatchVerdict::Correct);
    assert_eq!(verdict_of(&outcome, "PND3").result1, MatchVerdict::Incorrect);
    assert_eq!(verdict_of(&outcome, "PND3").result2, MatchVerdict::Correct);
    assert_eq!(verdict_of(&outcome, "PND53").result2, MatchVerdict::NotApplicable);
    assert_eq!(verdict_of(&outcome, "SSO").result1, MatchVerdict::Correct);

    let ledger = outcome.ledger.as_ref().unwrap();
    let codes: Vec<&str> = ledger
        .destinations()
        .iter()
        .map(|d| d.code.as_str())
        .collect();
    assert_eq!(codes, vec!["101001", "213003"]);
    let kbank = ledger.get(&AccountCode::new("101001")).unwrap();
    assert_eq!(kbank.entries.len(), 3);
    assert_eq!(kbank.block_count, 2);
    assert_eq!(
        ledger.get(&AccountCode::new("213003")).unwrap().entries.len(),
        1
    );

    let pp30 = outcome.pp30.as_ref().unwrap();
    assert_eq!(pp30.rows.len(), 12);
    assert!((pp30.rows[0].revenue - 100_000.0).abs() < 0.01);
    assert!((pp30.rows[1].diff - 130_000.0).abs() < 0.01);
    assert!((pp30.rows[2].revenue - 200_000.0).abs() < 0.01);
    assert!((pp30.total_revenue - 450_000.0).abs() < 0.01);
    assert!((pp30.total_credit_note - 20_000.0).abs() < 0.01);
    assert_eq!(pp30.rows[0].verdict, MatchVerdict::Correct);
    assert_eq!(pp30.rows[1].verdict, MatchVerdict::Correct);
    assert_eq!(pp30.rows[2].verdict, MatchVerdict::Incorrect);
    assert_eq!(pp30.rows[3].verdict, MatchVerdict::NotApplicable);
    assert_eq!(pp30.mismatched_months(), vec![3]);

    let document = &outcome.document;
    assert_eq!(
        document.section_names(),
        vec![
            "Workflow Result",
            "TB",
            "Reconcile",
            "101001",
            "213003",
            "PP30",
            "Anomalies"
        ]
    );

    let malformed = document
        .anomalies
        .iter()
        .find_map(|a| match a {
            Anomaly::MalformedMarkerBlock { rows } => Some(rows.clone()),
            _ => None,
        })
        .unwrap();
    // 411000, 412000 and 999000 are out of scope for the GL pass, not malformed.
    assert_eq!(malformed, vec![27]);
    assert!(document.anomalies.iter().any(|a| matches!(
        a,
        Anomaly::AbsentAmount { label, .. } if label == "SCB"
    )));

    let workflow = document.section("Workflow Result").unwrap();
    assert_eq!(
        workflow.cell(2, 2),
        Some(&CellValue::text("KBank_202412.pdf"))
    );
    assert_eq!(workflow.cell(3, 2), Some(&CellValue::text("scb_202412.pdf")));

    export_sections(document, "year_end_reconciliation").unwrap();
}

#[test]
fn test_tb_section_formulas_follow_rows() {
    let config = config();
    let document = process_reconciliation(&config, &inputs()).unwrap();
    let tb = document.section("TB").unwrap();

    assert_eq!(
        tb.cell(1, 0),
        Some(&CellValue::text("Siam Trading Co., Ltd."))
    );
    assert_eq!(
        tb.cell(3, 0),
        Some(&CellValue::text("For the period ended 31/12/2024"))
    );
    assert_eq!(tb.cell(4, 0), Some(&CellValue::text("Department: Head Office")));
    assert_eq!(
        tb.cell(5, 0),
        Some(&CellValue::text("Account codes 101001 - 522000"))
    );

    let sales_row = (1..=tb.row_count())
        .find(|&r| tb.cell(r, 0) == Some(&CellValue::text("411000")))
        .unwrap();
    assert_eq!(sales_row, 17);
    assert_eq!(
        tb.cell(sales_row, 10),
        Some(&CellValue::formula("=G17+I17-H17-J17", Some(-605_000.0)))
    );
    assert_eq!(
        tb.cell(sales_row, 12),
        Some(&CellValue::formula("=IF(K17<=0,-K17,\"\")", Some(605_000.0)))
    );
    assert_eq!(tb.cell(sales_row, 13), Some(&CellValue::Empty));

    // 15 data rows from row 7, subtotal on row 22.
    assert_eq!(tb.cell(22, 0), Some(&CellValue::text("Total")));
    assert_eq!(
        tb.cell(22, 6),
        Some(&CellValue::formula("=SUM(G7:G21)", Some(846_500.0)))
    );
    assert_eq!(tb.cell(25, 2), Some(&CellValue::text("Balanced")));
}

#[test]
fn test_unclassified_code_is_reported() {
    let config = config();
    let tb = format!("{}999000,Suspense,0,0,0,0,750,0,0,0\n", TB_CSV);
    let inputs = RunInputs {
        trial_balance: Some(TabularSource::from_csv_str("TB", &tb).unwrap()),
        ..inputs()
    };

    let outcome = ReconciliationProcessor::process_with_details(&config, &inputs).unwrap();
    assert_eq!(outcome.sheet.summary.unclassified_rows, 1);
    // The suspense row is outside both statements, so the identity still holds.
    assert!(outcome.sheet.verify().is_ok());
    assert!(outcome
        .document
        .anomalies
        .contains(&Anomaly::UnclassifiableCode { count: 1 }));
}

#[test]
fn test_imbalance_is_an_anomaly_not_a_failure() {
    let config = config();
    let tb = TB_CSV.replace("522000,Rent,0,0,0,0,\"31,500.00\"", "522000,Rent,0,0,0,0,\"31,000.00\"");
    let inputs = RunInputs {
        trial_balance: Some(TabularSource::from_csv_str("TB", &tb).unwrap()),
        ..inputs()
    };

    let outcome = ReconciliationProcessor::process_with_details(&config, &inputs).unwrap();
    assert!(matches!(
        outcome.sheet.verify(),
        Err(ReconciliationError::StatementImbalance { .. })
    ));
    let imbalance = outcome
        .document
        .anomalies
        .iter()
        .find_map(|a| match a {
            Anomaly::StatementImbalance(i) => Some(*i),
            _ => None,
        })
        .unwrap();
    assert!((imbalance.discrepancy + 500.0).abs() < 0.01);

    let tb_section = outcome.document.section("TB").unwrap();
    assert_eq!(tb_section.cell(25, 2), Some(&CellValue::text("Not balanced")));
}

#[test]
fn test_missing_sources_fail_the_run() {
    let config = config();

    let no_tb = RunInputs {
        trial_balance: None,
        ..inputs()
    };
    assert!(matches!(
        process_reconciliation(&config, &no_tb),
        Err(ReconciliationError::MissingSourceTable(_))
    ));

    let blank_gl = RunInputs {
        general_ledger: Some(TabularSource::from_csv_str("GL", ",,,\n,,,\n").unwrap()),
        ..inputs()
    };
    assert!(matches!(
        process_reconciliation(&config, &blank_gl),
        Err(ReconciliationError::MissingSourceTable(_))
    ));
}

const CLEAN_GL_CSV: &str = "\
101001 Cash at bank - KBank,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,05/01/2024,RV-001,Receipt,,100000,
,,,,,,,
411000 Sales,,,,,,,
ลำดับที่,,Date,Voucher,Description,,Debit,Credit
1,,05/01/2024,IV-001,Sales,,,100000
";

#[test]
fn test_out_of_scope_gl_blocks_are_not_anomalies() {
    let inputs = inputs()
        .with_general_ledger(TabularSource::from_csv_str("GL", CLEAN_GL_CSV).unwrap())
        .with_extracted_amount("SCB", Some(80_000.0));

    let outcome = ReconciliationProcessor::process_with_details(&config(), &inputs).unwrap();
    assert!(outcome.document.anomalies.is_empty());
    assert!(outcome.document.section("Anomalies").is_none());

    let codes: Vec<&str> = outcome
        .ledger
        .as_ref()
        .unwrap()
        .destinations()
        .iter()
        .map(|d| d.code.as_str())
        .collect();
    assert_eq!(codes, vec!["101001"]);

    let pp30 = outcome.pp30.as_ref().unwrap();
    assert!((pp30.rows[0].revenue - 100_000.0).abs() < 0.01);
}

#[test]
fn test_tb_column_header_is_skipped() {
    let mut config = config();
    config.trial_balance_layout.first_data_row = 2;

    let outcome = ReconciliationProcessor::process_with_details(&config, &inputs()).unwrap();
    assert_eq!(outcome.sheet.rows.len(), 15);
    assert_eq!(outcome.sheet.summary.unclassified_rows, 0);
    assert!(!outcome
        .document
        .anomalies
        .iter()
        .any(|a| matches!(a, Anomaly::UnclassifiableCode { .. })));
}

#[test]
fn test_parts_select_sections() {
    let mut config = config();
    config.parts.gl_subsheet = false;

    let document = process_reconciliation(&config, &inputs()).unwrap();
    let names = document.section_names();
    assert!(names.contains(&"PP30"));
    assert!(!names.contains(&"101001"));
    assert!(!document
        .anomalies
        .iter()
        .any(|a| matches!(a, Anomaly::MalformedMarkerBlock { .. })));
}

#[test]
fn test_tolerance_absorbs_rounding() {
    let mut config = config();
    config.tolerance = 0.01;
    let inputs = inputs().with_extracted_amount("PND3", Some(1_200.004));

    let outcome = ReconciliationProcessor::process_with_details(&config, &inputs).unwrap();
    assert_eq!(verdict_of(&outcome, "PND3").result1, MatchVerdict::Correct);
}

#[test]
fn test_document_serializes() {
    let document = process_reconciliation(&config(), &inputs()).unwrap();
    let json = document.to_json().unwrap();
    assert!(json.contains("\"title\": \"Siam Trading Co., Ltd. Tax Reconciliation 12/2024\""));
    assert!(json.contains("\"type\": \"formula\""));

    let markdown = document.to_markdown();
    assert!(markdown.contains("## PP30"));
    assert!(markdown.contains("## Anomalies"));

    let csv = document.section("PP30").unwrap().to_csv().unwrap();
    assert!(csv.starts_with("Month,Revenue,Credit Note,Diff,PP30 Reported,Result\n"));
    assert!(csv.contains("=SUM(B2:B13)"));
}

#[test]
fn test_schema_generation() {
    let schema_json = ReconciliationConfig::schema_as_json().unwrap();
    assert!(schema_json.contains("trial_balance_layout"));
    assert!(schema_json.contains("PND53"));
    assert!(schema_json.contains("balance_tolerance"));
}
