use thiserror::Error;

/// One canteen failing must never poison the whole run: `Fetch` skips the
/// source, `Processing` skips the affected day, `Database` aborts and rolls
/// back the current canteen's transaction only.
#[derive(Debug, Error)]
pub enum FetcherError {
    #[error("Datenabruf fehlgeschlagen: {0}")]
    Fetch(#[from] reqwest::Error),
    #[error("Datenverarbeitung fehlgeschlagen: {0}")]
    Processing(String),
    #[error("Datenbankfehler: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, FetcherError>;
