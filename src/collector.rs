use std::time::Instant;

use chrono::{Duration, Local};
use rusqlite::Connection;

use crate::canteens::Canteen;
use crate::constants::HTTP_TIMEOUT;
use crate::menu_parser::MenuSource;
use crate::menu_service::MenuService;
use crate::translation::{ensure_translations, Translator};

/// One full collection run over every known canteen: seed the forward
/// calendar, scrape, reconcile, translate. A failing canteen is logged and
/// skipped, the run itself only fails on setup errors.
pub async fn collect_food(db_path: &str, translator: &Translator, days: i64) -> anyhow::Result<()> {
    let run_started = Instant::now();

    let client = reqwest::Client::builder().timeout(HTTP_TIMEOUT).build()?;
    let mut conn = Connection::open(db_path)?;

    let today = Local::now().date_naive();
    let horizon = today + Duration::days(days);

    for canteen in Canteen::ALL {
        let mut service = MenuService::new(&mut conn);
        if let Err(e) = service.store_menu_days(canteen, today, horizon) {
            log::error!("{}: seeding menu days failed: {}", canteen.id(), e);
        }
    }

    for canteen in Canteen::ALL {
        let source = MenuSource::new(canteen);
        let menus = source.parse(&client).await;
        if menus.is_empty() {
            log::warn!("{}: no menus parsed", canteen.id());
            continue;
        }

        let pending = {
            let mut service = MenuService::new(&mut conn);
            match service.store_menus(canteen, &menus) {
                Ok(pending) => pending,
                Err(e) => {
                    log::error!("{}: storing menus failed: {}", canteen.id(), e);
                    continue;
                }
            }
        };

        let unrecognized = source.label_table().unrecognized_count();
        if unrecognized > 0 {
            log::warn!(
                "{}: {} unrecognized marker codes, table may be out of date",
                canteen.id(),
                unrecognized
            );
        }

        if let Err(e) = ensure_translations(&mut conn, &client, translator, &pending).await {
            log::error!("{}: translating dish titles failed: {}", canteen.id(), e);
        }
    }

    log::info!("collection run finished in {:.2?}", run_started.elapsed());
    Ok(())
}
