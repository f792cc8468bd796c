use chrono::{Datelike, Duration, NaiveDate};
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use crate::canteens::Canteen;
use crate::data_types::{DishCategory, Language, Menu, Price, PriceTier};
use crate::errors::{FetcherError, Result};
use crate::labels::detect_labels_from_title;
use crate::lecture_period::{is_closed_on, is_lecture_free};
use crate::pricing::calculate_simple_price;

/// The reconciliation key: the same source-language title always hashes to
/// the same id, across canteens and across time.
pub fn dish_id(title: &str) -> Uuid {
    Uuid::new_v5(&Uuid::NAMESPACE_DNS, title.trim().as_bytes())
}

/// A dish whose translations should be checked after the batch committed.
#[derive(Debug, Clone)]
pub struct PendingTranslation {
    pub dish_id: Uuid,
    pub title: String,
}

/// Owns the whole write path to dishes, prices, menu days and associations.
/// The parser never persists anything.
pub struct MenuService<'a> {
    conn: &'a mut Connection,
}

impl<'a> MenuService<'a> {
    pub fn new(conn: &'a mut Connection) -> Self {
        MenuService { conn }
    }

    /// Pre-seeds MenuDay rows for every date in `[date_from, date_to)` on
    /// which the canteen's service-day table says it serves food, so the
    /// forward calendar exists before any menu content is scraped.
    pub fn store_menu_days(
        &mut self,
        canteen: Canteen,
        date_from: NaiveDate,
        date_to: NaiveDate,
    ) -> Result<()> {
        let tx = self.conn.transaction()?;
        {
            let mut stmt = tx.prepare_cached(
                "replace into menu_days (date, canteen_id, is_closed)
                    values (?1, ?2, ?3)",
            )?;

            let mut current = date_from;
            while current < date_to {
                let lecture_free = is_lecture_free(current);
                if canteen
                    .service_days()
                    .serves_on(current.weekday(), lecture_free)
                {
                    stmt.execute(params![
                        current.to_string(),
                        canteen.id(),
                        is_closed_on(current)
                    ])?;
                }
                current += Duration::days(1);
            }
        }
        tx.commit()?;

        log::info!(
            "{}: menu days seeded from {} to {}",
            canteen.id(),
            date_from,
            date_to
        );
        Ok(())
    }

    /// Reconciles parsed menus into the store, one transaction per canteen
    /// batch. Any error rolls the whole batch back and is surfaced to the
    /// caller, which logs and moves on to the next canteen.
    pub fn store_menus(
        &mut self,
        canteen: Canteen,
        menus: &[Menu],
    ) -> Result<Vec<PendingTranslation>> {
        let tx = self.conn.transaction()?;
        let mut pending = Vec::new();
        let mut dishes_added = 0usize;

        for menu in menus {
            let date_str = menu.date.to_string();

            // menu day may exist outside the seeded window (source serves
            // although the service-day table said otherwise)
            tx.execute(
                "replace into menu_days (date, canteen_id, is_closed)
                    values (?1, ?2, ?3)",
                params![date_str, canteen.id(), is_closed_on(menu.date)],
            )?;

            // full replacement: stale associations must not survive a re-parse
            tx.execute(
                "delete from menu_dish_associations
                    where menu_day_date = ?1 and canteen_id = ?2",
                params![date_str, canteen.id()],
            )?;

            for dish in &menu.dishes {
                let id = dish_id(&dish.title);
                let id_str = id.to_string();

                let mut combined_labels = dish.labels.clone();
                combined_labels.extend(detect_labels_from_title(&dish.title));
                let labels_json = serde_json::to_string(&combined_labels)
                    .map_err(|e| FetcherError::Processing(e.to_string()))?;

                let exists: Option<String> = tx
                    .query_row(
                        "select id from dishes where id = ?1",
                        params![id_str],
                        |row| row.get(0),
                    )
                    .optional()?;

                if exists.is_some() {
                    // labels are overwritten wholesale on every re-sighting
                    tx.execute(
                        "update dishes set labels = ?2 where id = ?1",
                        params![id_str, labels_json],
                    )?;

                    if !dish.prices.students.is_unknown() {
                        tx.execute(
                            "update dishes set price_simple = ?2 where id = ?1",
                            params![id_str, calculate_simple_price(&dish.prices)],
                        )?;
                        for tier in PriceTier::ALL {
                            upsert_price(&tx, &id_str, tier, dish.prices.tier(tier))?;
                        }
                    } else {
                        // keep the prior price history untouched
                        log::warn!(
                            "{}: no price data for dish '{}'",
                            canteen.id(),
                            dish.title
                        );
                    }
                } else {
                    // category is derived once and stays fixed afterwards,
                    // even if the dish type string drifts on later sightings
                    let category = DishCategory::from_dish_type(&dish.dish_type);
                    tx.execute(
                        "insert into dishes (id, dish_type, dish_category, labels, price_simple)
                            values (?1, ?2, ?3, ?4, ?5)",
                        params![
                            id_str,
                            dish.dish_type,
                            category.as_db_str(),
                            labels_json,
                            calculate_simple_price(&dish.prices)
                        ],
                    )?;
                    tx.execute(
                        "insert into dish_translations (dish_id, language, title)
                            values (?1, ?2, ?3)",
                        params![id_str, Language::SOURCE.code(), dish.title],
                    )?;
                    for tier in PriceTier::ALL {
                        insert_price(&tx, &id_str, tier, dish.prices.tier(tier))?;
                    }
                    dishes_added += 1;
                }

                tx.execute(
                    "insert into menu_dish_associations (dish_id, menu_day_date, canteen_id)
                        values (?1, ?2, ?3)",
                    params![id_str, date_str, canteen.id()],
                )?;

                pending.push(PendingTranslation {
                    dish_id: id,
                    title: dish.title.clone(),
                });
            }
        }

        tx.commit()?;
        log::info!(
            "{}: stored {} menus, {} new dishes",
            canteen.id(),
            menus.len(),
            dishes_added
        );
        Ok(pending)
    }
}

fn upsert_price(
    tx: &Transaction,
    dish_id: &str,
    tier: PriceTier,
    price: &Price,
) -> rusqlite::Result<()> {
    let updated = tx.execute(
        "update dish_prices
            set base_price = ?3, price_per_unit = ?4, unit = ?5
            where dish_id = ?1 and tier = ?2",
        params![
            dish_id,
            tier.as_db_str(),
            price.base_price,
            price.price_per_unit,
            price.unit
        ],
    )?;
    if updated == 0 {
        insert_price(tx, dish_id, tier, price)?;
    }
    Ok(())
}

fn insert_price(
    tx: &Transaction,
    dish_id: &str,
    tier: PriceTier,
    price: &Price,
) -> rusqlite::Result<()> {
    tx.execute(
        "insert into dish_prices (dish_id, tier, base_price, price_per_unit, unit)
            values (?1, ?2, ?3, ?4, ?5)",
        params![
            dish_id,
            tier.as_db_str(),
            price.base_price,
            price.price_per_unit,
            price.unit
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_types::{Dish, LabelSet, Prices};
    use crate::db_operations::open_test_db;
    use crate::labels::Label;
    use crate::pricing::{self_service_prices, BasePriceType, PricePerUnitType};

    fn mk_dish(title: &str, dish_type: &str) -> Dish {
        Dish {
            title: title.to_string(),
            prices: self_service_prices(BasePriceType::Meat, PricePerUnitType::Classic),
            labels: LabelSet::from([Label::Meat]),
            dish_type: dish_type.to_string(),
        }
    }

    fn mk_menu(date: (i32, u32, u32), dishes: Vec<Dish>) -> Menu {
        Menu::new(
            NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
            dishes,
        )
    }

    fn count(conn: &Connection, sql: &str) -> i64 {
        conn.query_row(sql, [], |row| row.get(0)).unwrap()
    }

    #[test]
    fn dish_id_is_a_pure_function_of_the_title() {
        assert_eq!(dish_id("Schnitzel"), dish_id("Schnitzel"));
        assert_eq!(dish_id("  Schnitzel "), dish_id("Schnitzel"));
        assert_ne!(dish_id("Schnitzel"), dish_id("schnitzel"));
    }

    #[test]
    fn storing_twice_keeps_one_association_per_dish() {
        let mut conn = open_test_db();
        let menus = vec![mk_menu(
            (2025, 4, 7),
            vec![mk_dish("Schnitzel", "Tagesgericht"), mk_dish("Pommes", "Beilagen")],
        )];

        let mut service = MenuService::new(&mut conn);
        service.store_menus(Canteen::MensaGarching, &menus).unwrap();
        service.store_menus(Canteen::MensaGarching, &menus).unwrap();

        assert_eq!(count(&conn, "select count(*) from menu_dish_associations"), 2);
        assert_eq!(count(&conn, "select count(*) from dishes"), 2);
        assert_eq!(count(&conn, "select count(*) from dish_prices"), 6);
    }

    #[test]
    fn same_title_collapses_across_canteens_and_days() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 4, 7), vec![mk_dish("Schnitzel", "Tagesgericht")])],
            )
            .unwrap();
        service
            .store_menus(
                Canteen::MensaArcisstr,
                &[mk_menu((2025, 4, 9), vec![mk_dish("Schnitzel", "Tagesgericht")])],
            )
            .unwrap();

        assert_eq!(count(&conn, "select count(*) from dishes"), 1);
        assert_eq!(count(&conn, "select count(*) from menu_dish_associations"), 2);
    }

    #[test]
    fn absent_dish_loses_association_but_keeps_entity() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu(
                    (2025, 4, 7),
                    vec![mk_dish("Schnitzel", "Tagesgericht"), mk_dish("Salat", "Beilagen")],
                )],
            )
            .unwrap();
        // next parse of the same day no longer offers the Schnitzel
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 4, 7), vec![mk_dish("Salat", "Beilagen")])],
            )
            .unwrap();

        assert_eq!(count(&conn, "select count(*) from menu_dish_associations"), 1);
        assert_eq!(count(&conn, "select count(*) from dishes"), 2);
        let schnitzel_prices: i64 = conn
            .query_row(
                "select count(*) from dish_prices where dish_id = ?1",
                params![dish_id("Schnitzel").to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(schnitzel_prices, 3);
    }

    #[test]
    fn unknown_price_on_resighting_keeps_old_rows() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 4, 7), vec![mk_dish("Schnitzel", "Tagesgericht")])],
            )
            .unwrap();

        let mut unpriced = mk_dish("Schnitzel", "Tagesgericht");
        unpriced.prices = Prices::default();
        service
            .store_menus(Canteen::MensaGarching, &[mk_menu((2025, 4, 8), vec![unpriced])])
            .unwrap();

        let base: Option<f64> = conn
            .query_row(
                "select base_price from dish_prices where dish_id = ?1 and tier = 'STUDENTS'",
                params![dish_id("Schnitzel").to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(base, Some(1.0));
        let simple: Option<String> = conn
            .query_row(
                "select price_simple from dishes where id = ?1",
                params![dish_id("Schnitzel").to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(simple.as_deref(), Some("€€€"));
    }

    #[test]
    fn labels_are_overwritten_and_enriched_from_title() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        let mut dish = mk_dish("Hähnchencurry", "Tagesgericht");
        dish.labels = LabelSet::from([Label::Gluten]);
        service
            .store_menus(Canteen::MensaGarching, &[mk_menu((2025, 4, 7), vec![dish])])
            .unwrap();

        let labels: String = conn
            .query_row(
                "select labels from dishes where id = ?1",
                params![dish_id("Hähnchencurry").to_string()],
                |row| row.get(0),
            )
            .unwrap();
        let labels: LabelSet = serde_json::from_str(&labels).unwrap();
        assert!(labels.contains(&Label::Gluten));
        // recovered from the title even though the source omitted it
        assert!(labels.contains(&Label::Poultry));

        // re-sighting with different labels replaces the set wholesale
        let mut dish = mk_dish("Hähnchencurry", "Tagesgericht");
        dish.labels = LabelSet::from([Label::Soy]);
        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(Canteen::MensaGarching, &[mk_menu((2025, 4, 8), vec![dish])])
            .unwrap();

        let labels: String = conn
            .query_row(
                "select labels from dishes where id = ?1",
                params![dish_id("Hähnchencurry").to_string()],
                |row| row.get(0),
            )
            .unwrap();
        let labels: LabelSet = serde_json::from_str(&labels).unwrap();
        assert!(!labels.contains(&Label::Gluten));
        assert!(labels.contains(&Label::Soy));
        assert!(labels.contains(&Label::Poultry));
    }

    #[test]
    fn category_is_fixed_at_first_sighting() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 4, 7), vec![mk_dish("Eintopf", "Studitopf")])],
            )
            .unwrap();
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 4, 8), vec![mk_dish("Eintopf", "Tagesgericht")])],
            )
            .unwrap();

        let category: String = conn
            .query_row(
                "select dish_category from dishes where id = ?1",
                params![dish_id("Eintopf").to_string()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(category, "SOUP");
    }

    #[test]
    fn source_language_translation_is_created_once() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        let menus = [mk_menu((2025, 4, 7), vec![mk_dish("Schnitzel", "Tagesgericht")])];
        service.store_menus(Canteen::MensaGarching, &menus).unwrap();
        service.store_menus(Canteen::MensaGarching, &menus).unwrap();

        let (lang, title): (String, String) = conn
            .query_row(
                "select language, title from dish_translations where dish_id = ?1",
                params![dish_id("Schnitzel").to_string()],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .unwrap();
        assert_eq!(lang, "de-DE");
        assert_eq!(title, "Schnitzel");
        assert_eq!(count(&conn, "select count(*) from dish_translations"), 1);
    }

    #[test]
    fn menu_days_are_seeded_for_serving_weekdays_only() {
        let mut conn = open_test_db();

        // Mon 2025-06-02 .. Mon 2025-06-09 (exclusive): one full week
        let from = NaiveDate::from_ymd_opt(2025, 6, 2).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 6, 9).unwrap();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menu_days(Canteen::MensaGarching, from, to)
            .unwrap();

        // Mon-Fri seeded, weekend not
        assert_eq!(count(&conn, "select count(*) from menu_days"), 5);

        // seeding again is idempotent
        let mut service = MenuService::new(&mut conn);
        service
            .store_menu_days(Canteen::MensaGarching, from, to)
            .unwrap();
        assert_eq!(count(&conn, "select count(*) from menu_days"), 5);
    }

    #[test]
    fn dish_less_day_clears_stale_associations() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 4, 7), vec![mk_dish("Schnitzel", "Tagesgericht")])],
            )
            .unwrap();
        // the re-parsed day now serves nothing
        service
            .store_menus(Canteen::MensaGarching, &[mk_menu((2025, 4, 7), vec![])])
            .unwrap();

        assert_eq!(count(&conn, "select count(*) from menu_dish_associations"), 0);
        assert_eq!(count(&conn, "select count(*) from menu_days"), 1);
        // the dish entity itself survives
        assert_eq!(count(&conn, "select count(*) from dishes"), 1);
    }

    #[test]
    fn menu_day_is_created_even_outside_seeded_window() {
        let mut conn = open_test_db();

        let mut service = MenuService::new(&mut conn);
        service
            .store_menus(
                Canteen::MensaGarching,
                &[mk_menu((2025, 8, 13), vec![mk_dish("Schnitzel", "Tagesgericht")])],
            )
            .unwrap();

        assert_eq!(count(&conn, "select count(*) from menu_days"), 1);
    }
}
