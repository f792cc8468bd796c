use std::time::Duration;

pub const MENU_URL_TEMPLATE: &str =
    "https://www.studierendenwerk-muenchen-oberbayern.de/mensa/speiseplan/speiseplan_{url_id}_-de.html";

pub const DEEPL_API_URL: &str = "https://api-free.deepl.com/v2/translate";

pub const HTTP_TIMEOUT: Duration = Duration::from_secs(10);

pub const DEFAULT_DB: &str = "mensa.sqlite";

/// How far into the future menu days are pre-seeded.
pub const FETCH_WINDOW_DAYS: i64 = 28;

/// Daily run, shortly after the Studierendenwerk publishes updates.
pub const DEFAULT_SCHEDULE: &str = "0 8 9 * * *";
