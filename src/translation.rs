use rusqlite::{params, Connection, OptionalExtension};
use serde::Deserialize;

use crate::constants::DEEPL_API_URL;
use crate::data_types::Language;
use crate::errors::Result;
use crate::menu_service::PendingTranslation;

/// Dish titles are translated on a best-effort basis: a missing key or a
/// failing API never blocks menu collection.
pub enum Translator {
    Deepl { api_key: String },
    Noop,
}

#[derive(Deserialize)]
struct DeeplResponse {
    translations: Vec<DeeplTranslation>,
}

#[derive(Deserialize)]
struct DeeplTranslation {
    text: String,
}

impl Translator {
    pub fn from_key(api_key: Option<String>) -> Self {
        match api_key {
            Some(key) if !key.is_empty() => Translator::Deepl { api_key: key },
            _ => {
                log::info!("no DeepL API key configured, dish titles stay untranslated");
                Translator::Noop
            }
        }
    }

    /// `Ok(None)` means "no translation available", which is not an error.
    pub async fn translate(
        &self,
        client: &reqwest::Client,
        text: &str,
        target: Language,
    ) -> anyhow::Result<Option<String>> {
        let api_key = match self {
            Translator::Deepl { api_key } => api_key,
            Translator::Noop => return Ok(None),
        };

        let response: DeeplResponse = client
            .post(DEEPL_API_URL)
            .form(&[
                ("auth_key", api_key.as_str()),
                ("text", text),
                ("source_lang", Language::SOURCE.deepl_code()),
                ("target_lang", target.deepl_code()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(response.translations.into_iter().next().map(|t| t.text))
    }
}

/// Fills in missing target-language titles for the given dishes. Existing
/// rows are never re-translated, so re-parsing a week is cheap.
///
/// Takes the connection mutably: a shared `&Connection` held across the
/// translation awaits would make the future non-`Send`.
pub async fn ensure_translations(
    conn: &mut Connection,
    client: &reqwest::Client,
    translator: &Translator,
    pending: &[PendingTranslation],
) -> Result<()> {
    if matches!(translator, Translator::Noop) {
        return Ok(());
    }

    for entry in pending {
        let dish_id = entry.dish_id.to_string();
        for target in Language::TARGETS {
            let existing: Option<String> = conn
                .query_row(
                    "select title from dish_translations
                        where dish_id = ?1 and language = ?2",
                    params![dish_id, target.code()],
                    |row| row.get(0),
                )
                .optional()?;
            if existing.is_some() {
                continue;
            }

            match translator.translate(client, &entry.title, target).await {
                Ok(Some(translated)) => {
                    conn.execute(
                        "insert into dish_translations (dish_id, language, title)
                            values (?1, ?2, ?3)",
                        params![dish_id, target.code(), translated],
                    )?;
                }
                Ok(None) => {}
                Err(e) => {
                    log::warn!("translation of '{}' failed: {}", entry.title, e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db_operations::open_test_db;
    use crate::menu_service::dish_id;

    #[tokio::test]
    async fn noop_translator_yields_nothing() {
        let client = reqwest::Client::new();
        let translator = Translator::Noop;
        let translated = translator
            .translate(&client, "Schnitzel", Language::EnglishUs)
            .await
            .unwrap();
        assert!(translated.is_none());
    }

    #[tokio::test]
    async fn noop_translator_inserts_no_rows() {
        let mut conn = open_test_db();
        let client = reqwest::Client::new();
        let pending = [PendingTranslation {
            dish_id: dish_id("Schnitzel"),
            title: "Schnitzel".to_string(),
        }];

        ensure_translations(&mut conn, &client, &Translator::Noop, &pending)
            .await
            .unwrap();

        let rows: i64 = conn
            .query_row("select count(*) from dish_translations", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 0);
    }

    #[test]
    fn missing_key_falls_back_to_noop() {
        assert!(matches!(Translator::from_key(None), Translator::Noop));
        assert!(matches!(
            Translator::from_key(Some(String::new())),
            Translator::Noop
        ));
        assert!(matches!(
            Translator::from_key(Some("abc".to_string())),
            Translator::Deepl { .. }
        ));
    }
}
