use std::path::PathBuf;
use tax_reconciliation_builder::llm::{AmountExtractor, DocumentKind, GeminiClient, SourceDocument};
use tax_reconciliation_builder::FormType;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let folder = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("documents"));

    let wanted = [
        ("KBank", DocumentKind::BankStatement, "KBank_202403.pdf"),
        ("PND1", DocumentKind::TaxForm(FormType::Pnd1), "PND1_202403.pdf"),
        ("PND3", DocumentKind::TaxForm(FormType::Pnd3), "PND3_202403.pdf"),
        ("PP30", DocumentKind::TaxForm(FormType::Pp30), "PP30_202403.pdf"),
        ("SSO", DocumentKind::TaxForm(FormType::Sso), "SSO_202403.pdf"),
    ];

    let mut documents = Vec::new();
    for (label, kind, file_name) in wanted {
        let path = folder.join(file_name);
        if !path.exists() {
            println!("Skipping {}: {} not found", label, path.display());
            continue;
        }
        documents.push(SourceDocument::from_path(label, kind, &path).await?);
    }

    let client = GeminiClient::from_env()?;
    let extractor = AmountExtractor::new(client, "gemini-2.5-flash").with_period(2024, 3);

    let amounts = extractor.extract_all(&documents).await;
    for (label, amount) in &amounts {
        match amount {
            Some(value) => println!("{:<8} {:>15.2}", label, value),
            None => println!("{:<8} {:>15}", label, "absent"),
        }
    }

    println!("\n{}", serde_json::to_string_pretty(&amounts)?);

    Ok(())
}
