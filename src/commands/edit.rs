use crate::api::Mode;
use crate::args::EditArgs;
use crate::commands::{load_repository, select_period, Out};
use crate::error::{Error, ErrorType};
use crate::model::{Reais, Record};
use crate::session::EditSession;
use crate::{Config, Result};
use anyhow::anyhow;
use tracing::debug;

/// Opens the record `args.id()` from the selected period, overwrites the form fields that were
/// given, and saves the whole document. Fields that were not given keep their current values.
pub async fn edit(config: &Config, mode: Mode, args: &EditArgs) -> Result<Out<Record>> {
    let mut repository = load_repository(config, mode).await?;
    let period = select_period(&repository, args.period()).ok_or_else(|| {
        Error::new(
            ErrorType::NotFound,
            anyhow!("The document has no periods, so there is nothing to edit"),
        )
    })?;

    let mut session = EditSession::default();
    session.open(&repository, &period, args.id())?;
    if let Some(form) = session.form_mut() {
        if let Some(s) = args.operation_type() {
            form.operation_type = s.to_string();
        }
        if let Some(s) = args.category() {
            form.category = s.to_string();
        }
        if let Some(s) = args.supplier() {
            form.supplier = s.to_string();
        }
        if let Some(s) = args.description() {
            form.description = s.to_string();
        }
        if let Some(s) = args.financial_category() {
            form.financial_category = s.to_string();
        }
        if let Some(s) = args.account() {
            form.account = s.to_string();
        }
        if let Some(s) = args.value() {
            form.set_value_text(s);
        }
        debug!("Saving form {form:?}");
    }

    let updated = session.save(&mut repository, args.force()).await?;
    Ok(Out::new(
        format!(
            "Record {} was updated, its value is now {}",
            args.id(),
            Reais(updated.value())
        ),
        updated,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::TestEnv;

    const DOC: &str = r#"[
        {"id": 1, "Mês/Ano": "2024-01", "TipoOperacao": "Receita", "Valor": 100},
        {"id": 2, "Mês/Ano": "2024-01", "TipoOperacao": "Despesa", "Categoria": "Ocupação",
         "Valor": 40},
        {"id": 3, "Mês/Ano": "2024-02", "TipoOperacao": "Despesa", "Valor": 10}
    ]"#;

    #[tokio::test]
    async fn test_edit_value() {
        let env = TestEnv::with_document(DOC).await;
        let args = EditArgs::new("2").with_period("2024-01").with_value("75.5");
        let out = edit(&env.config(), Mode::Test, &args).await.unwrap();
        assert_eq!(out.message(), "Record 2 was updated, its value is now R$ 75,50");
        assert_eq!(out.structure().unwrap().value(), 75.5);

        assert_eq!(env.get_state().replace_count, 1);
        let doc = env.document();
        assert_eq!(doc.as_array().unwrap().len(), 3);
        assert_eq!(doc[1]["Valor"], 75.5);
        assert_eq!(doc[1]["Categoria"], "Ocupação");
        assert_eq!(doc[0]["Valor"], 100);
        assert_eq!(doc[2]["Valor"], 10);
    }

    #[tokio::test]
    async fn test_edit_all_fields() {
        let env = TestEnv::with_document(DOC).await;
        let args = EditArgs::new("3")
            .with_operation_type("Receita")
            .with_category("Serviços")
            .with_supplier("Cliente")
            .with_description("Ajuste")
            .with_financial_category("Vendas")
            .with_account("4.1.01")
            .with_value("not a number");
        edit(&env.config(), Mode::Test, &args).await.unwrap();
        let doc = env.document();
        let record = &doc[2];
        assert_eq!(record["TipoOperacao"], "Receita");
        assert_eq!(record["Categoria"], "Serviços");
        assert_eq!(record["Fornecedor"], "Cliente");
        assert_eq!(record["Descrição"], "Ajuste");
        assert_eq!(record["Categoria Financeira"], "Vendas");
        assert_eq!(record["Conta Contábil"], "4.1.01");
        assert_eq!(record["Valor"], 0.0);
        assert_eq!(record["Mês/Ano"], "2024-02");
    }

    #[tokio::test]
    async fn test_edit_record_outside_period() {
        let env = TestEnv::with_document(DOC).await;
        // Defaults to 2024-02, which does not contain record 1
        let err = edit(&env.config(), Mode::Test, &EditArgs::new("1"))
            .await
            .unwrap_err();
        assert_eq!(err.error_type(), ErrorType::NotFound);
        assert_eq!(env.get_state().replace_count, 0);
    }

    #[tokio::test]
    async fn test_edit_upload_failure() {
        let env = TestEnv::with_document(DOC).await;
        env.update_state(|s| s.fail_replace = true);
        let args = EditArgs::new("3").with_value("1");
        let err = edit(&env.config(), Mode::Test, &args).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Transport);
        assert_eq!(env.document()[2]["Valor"], 10);
    }

    #[tokio::test]
    async fn test_edit_conflict_and_force() {
        let env = TestEnv::with_document(DOC).await;
        let config = env.config();
        let mut repository = load_repository(&config, Mode::Test).await.unwrap();

        // Another session saves first
        edit(&config, Mode::Test, &EditArgs::new("3").with_value("11"))
            .await
            .unwrap();

        let mut session = EditSession::default();
        session.open(&repository, "2024-02", "3").unwrap();
        session.form_mut().unwrap().value = 12.0;
        let err = session.save(&mut repository, false).await.unwrap_err();
        assert_eq!(err.error_type(), ErrorType::Conflict);
        assert!(session.is_open());

        session.save(&mut repository, true).await.unwrap();
        assert_eq!(env.document()[2]["Valor"], 12.0);
    }

    #[tokio::test]
    async fn test_edit_writes_backup() {
        let env = TestEnv::with_document(DOC).await;
        let args = EditArgs::new("3").with_value("1");
        edit(&env.config(), Mode::Test, &args).await.unwrap();
        let backups: Vec<_> = std::fs::read_dir(env.config().backups())
            .unwrap()
            .map(|e| e.unwrap().path())
            .collect();
        assert_eq!(backups.len(), 1);
        let name = backups[0].file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("pre-save."), "{name}");
        assert_eq!(std::fs::read_to_string(&backups[0]).unwrap(), DOC);
    }
}
