use crate::api::Mode;
use crate::args::ShowArgs;
use crate::commands::{load_repository, select_period, Out};
use crate::error::{ErrorType, IntoResult};
use crate::view::{self, Rows, NO_DATA};
use crate::{Config, Result};

/// Renders the records of a period and their summaries. An unknown or empty period is not an
/// error, the view is simply empty.
pub async fn show(config: &Config, mode: Mode, args: &ShowArgs) -> Result<Out<Rows>> {
    let repository = load_repository(config, mode).await?;
    let period = select_period(&repository, args.period()).unwrap_or_default();
    let records = repository.filter_by_period(&period);
    let rows = view::render(&period, &records, args.tab(), args.format())
        .pub_result(ErrorType::Load)?;
    let message = if records.is_empty() {
        NO_DATA.to_string()
    } else {
        format!("Showing {} records for {period}", records.len())
    };
    Ok(Out::new(message, rows))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::view::{Format, Tab};
    use crate::test::TestEnv;

    const DOC: &str = r#"[
        {"id": 1, "Mês/Ano": "2024-01", "TipoOperacao": "Receita", "Categoria Financeira": "Vendas",
         "Conta Contábil": "1.1", "Valor": 100},
        {"id": 2, "Mês/Ano": "2024-01", "TipoOperacao": "Despesa", "Categoria Financeira": "Aluguel",
         "Conta Contábil": "2.1", "Valor": 40},
        {"id": 3, "Mês/Ano": "2024-02", "TipoOperacao": "Despesa", "Categoria Financeira": "Aluguel",
         "Conta Contábil": "2.1", "Valor": 10}
    ]"#;

    fn json(out: &Out<Rows>) -> serde_json::Value {
        match out.structure().unwrap() {
            Rows::Json(v) => v.clone(),
            other => panic!("expected JSON, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_show_period_summaries() {
        let env = TestEnv::with_document(DOC).await;
        let args = ShowArgs::new(Some("2024-01".to_string()), Tab::All, Format::Json);
        let out = show(&env.config(), Mode::Test, &args).await.unwrap();
        let v = json(&out);
        assert_eq!(v["records"].as_array().unwrap().len(), 2);
        assert_eq!(v["by_type"][0]["TipoOperacao"], "Receita");
        assert_eq!(v["by_type"][0]["Valor"], 100.0);
        assert_eq!(v["by_type"][1]["TipoOperacao"], "Despesa");
        assert_eq!(v["by_type"][1]["Valor"], 40.0);
        assert_eq!(v["by_type_and_account"][0]["Conta Contábil"], "1.1");
        assert_eq!(out.message(), "Showing 2 records for 2024-01");
    }

    #[tokio::test]
    async fn test_show_defaults_to_most_recent_period() {
        let env = TestEnv::with_document(DOC).await;
        let args = ShowArgs::new(None, Tab::Detail, Format::Json);
        let out = show(&env.config(), Mode::Test, &args).await.unwrap();
        let v = json(&out);
        assert_eq!(v["period"], "2024-02");
        assert_eq!(v["records"][0]["id"], 3);
    }

    #[tokio::test]
    async fn test_show_empty_period() {
        let env = TestEnv::with_document(DOC).await;
        let args = ShowArgs::new(Some("1999-01".to_string()), Tab::All, Format::Table);
        let out = show(&env.config(), Mode::Test, &args).await.unwrap();
        assert_eq!(out.message(), NO_DATA);
        let text = out.structure().unwrap().to_string();
        assert!(text.contains(NO_DATA), "{text}");
    }

    #[tokio::test]
    async fn test_show_seed_document_table() {
        let env = TestEnv::new().await;
        let args = ShowArgs::new(None, Tab::All, Format::Table);
        let out = show(&env.config(), Mode::Test, &args).await.unwrap();
        let text = out.structure().unwrap().to_string();
        assert!(text.starts_with("# 2025-10"), "{text}");
        // The entry whose value is not a number counts as zero
        assert!(text.contains("R$ 0,00"), "{text}");
        assert!(text.contains("R$ 23.400,50"), "{text}");
    }

    #[tokio::test]
    async fn test_show_load_failure() {
        let env = TestEnv::with_document("{}").await;
        let err = show(&env.config(), Mode::Test, &ShowArgs::default())
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Load);
    }
}
