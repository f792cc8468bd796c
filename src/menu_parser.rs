use chrono::NaiveDate;
use regex_lite::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Instant;

use crate::canteens::Canteen;
use crate::data_types::{Dish, Menu};
use crate::errors::{FetcherError, Result};
use crate::labels::{apply_diet_flag, LabelTable};
use crate::pricing::{self_service_prices, BasePriceType, PricePerUnitType, PriceSignal};

/// A scrapeable menu source: canteen identity plus the capabilities the
/// generic parsing algorithm needs (marker-code table, price regime).
pub struct MenuSource {
    canteen: Canteen,
    label_table: LabelTable,
}

impl MenuSource {
    pub fn new(canteen: Canteen) -> Self {
        MenuSource {
            canteen,
            label_table: LabelTable::studentenwerk(),
        }
    }

    pub fn canteen(&self) -> Canteen {
        self.canteen
    }

    pub fn label_table(&self) -> &LabelTable {
        &self.label_table
    }

    /// Fetches and parses the canteen's meal plan. Fails soft: network or
    /// page-level parse trouble is logged and yields an empty list so one
    /// canteen cannot abort the whole batch.
    pub async fn parse(&self, client: &Client) -> Vec<Menu> {
        let url = self.canteen.menu_url();

        let now = Instant::now();
        let html_text = match fetch_page(client, &url).await {
            Ok(text) => text,
            Err(e) => {
                log::warn!("{}: {}", self.canteen.id(), e);
                return Vec::new();
            }
        };
        log::debug!("{}: menu page fetched in {:.2?}", self.canteen.id(), now.elapsed());

        let now = Instant::now();
        let menus = self.extract_menus(&html_text);
        log::debug!("{}: menu page parsed in {:.2?}", self.canteen.id(), now.elapsed());

        menus
    }

    fn extract_menus(&self, html_text: &str) -> Vec<Menu> {
        let document = Html::parse_document(html_text);
        let day_sel = Selector::parse("div.c-schedule__item").unwrap();

        let mut menus = Vec::new();
        for day_block in document.select(&day_sel) {
            match self.parse_day(day_block) {
                Ok(Some(menu)) => menus.push(menu),
                Ok(None) => {}
                // skip the day, keep the rest of the week
                Err(e) => log::error!("{}: {}", self.canteen.id(), e),
            }
        }
        menus
    }

    fn parse_day(&self, day_block: ElementRef) -> Result<Option<Menu>> {
        let Some(date) = extract_date(day_block) else {
            log::warn!("{}: day block without parseable date", self.canteen.id());
            return Ok(None);
        };

        // a day without dishes is still emitted: "served nothing" must reach
        // the store so stale associations of that day get cleared
        let dishes = self.parse_dishes(day_block)?;

        let mut menu = Menu::new(date, dishes);
        menu.remove_duplicates();
        Ok(Some(menu))
    }

    fn parse_dishes(&self, day_block: ElementRef) -> Result<Vec<Dish>> {
        let title_sel = Selector::parse("p.c-menu-dish__title").unwrap();
        let type_sel = Selector::parse("span.stwm-artname").unwrap();
        let item_sel = Selector::parse("li.c-menu-dish-list__item").unwrap();

        let names: Vec<String> = day_block
            .select(&title_sel)
            .map(|el| el.text().collect::<String>().trim_end().to_string())
            .collect();
        let names = make_duplicates_unique(names);

        // type spans may be blank to mean "same as previous"
        let mut dish_types: Vec<String> = Vec::with_capacity(names.len());
        let mut current_type = String::new();
        for type_el in day_block.select(&type_sel) {
            let text = type_el.text().collect::<String>().trim().to_string();
            if !text.is_empty() {
                current_type = text;
            }
            dish_types.push(current_type.clone());
        }

        let items: Vec<ElementRef> = day_block.select(&item_sel).collect();

        // The three extractions walk the same markup, so their lengths must
        // agree; a mismatch would silently mispair names and markers.
        if names.len() != items.len() || names.len() != dish_types.len() {
            return Err(FetcherError::Processing(format!(
                "misaligned menu markup: {} names, {} types, {} items",
                names.len(),
                dish_types.len(),
                items.len()
            )));
        }

        let mut dishes = Vec::with_capacity(names.len());
        for ((name, dish_type), item) in names.into_iter().zip(dish_types).zip(items) {
            let additive_codes = item.value().attr("data-essen-zusatz").unwrap_or_default();
            let allergen_codes = item.value().attr("data-essen-allergene").unwrap_or_default();
            let type_codes = item.value().attr("data-essen-typ").unwrap_or_default();
            let meatless_flag = item.value().attr("data-essen-fleischlos").unwrap_or_default();

            let mut labels = self.label_table.resolve(additive_codes);
            labels.extend(self.label_table.resolve(allergen_codes));
            labels.extend(self.label_table.resolve(type_codes));
            apply_diet_flag(&mut labels, meatless_flag);

            let prices = if dish_type == "Beilagen" {
                // side dishes carry no base price, whatever the other signals say
                self_service_prices(BasePriceType::VegetarianSoupStew, PricePerUnitType::Classic)
            } else {
                let signal = PriceSignal {
                    dish_type: &dish_type,
                    allergen_codes,
                    meatless_flag,
                };
                crate::pricing::derive_price(self.canteen.price_regime(), &signal, &name)
            };

            dishes.push(Dish {
                title: name,
                prices,
                labels,
                dish_type,
            });
        }

        Ok(dishes)
    }
}

async fn fetch_page(client: &Client, url: &str) -> Result<String> {
    let resp = client.get(url).send().await?.error_for_status()?;
    Ok(resp.text().await?)
}

/// Pulls the `dd.mm.yyyy` date out of the day header.
fn extract_date(day_block: ElementRef) -> Option<NaiveDate> {
    let strong_sel = Selector::parse("strong").unwrap();
    let header = day_block
        .select(&strong_sel)
        .next()?
        .text()
        .collect::<String>();

    let re = Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap();
    let caps = re.captures(&header)?;

    NaiveDate::from_ymd_opt(
        caps[3].parse().ok()?,
        caps[2].parse().ok()?,
        caps[1].parse().ok()?,
    )
}

/// Makes repeated names unique by suffixing " (2)", " (3)", … in order.
fn make_duplicates_unique(names: Vec<String>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::with_capacity(names.len());
    let mut unique = Vec::with_capacity(names.len());

    for name in names {
        let count = seen.iter().filter(|n| **n == name).count();
        seen.push(name.clone());
        if count == 0 {
            unique.push(name);
        } else {
            unique.push(format!("{} ({})", name, count + 1));
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Label;

    fn day_html(body: &str) -> String {
        format!(
            r#"<html><body><div class="c-schedule__item">
                 <strong>Montag, 07.04.2025</strong>
                 <ul class="c-menu-dish-list">{body}</ul>
               </div></body></html>"#
        )
    }

    fn dish_li(title: &str, zusatz: &str, allergene: &str, typ: &str, fleischlos: &str, art: &str) -> String {
        format!(
            r#"<li class="c-menu-dish-list__item" data-essen-zusatz="{zusatz}"
                  data-essen-allergene="{allergene}" data-essen-typ="{typ}"
                  data-essen-fleischlos="{fleischlos}">
                 <span class="stwm-artname">{art}</span>
                 <p class="c-menu-dish__title">{title}</p>
               </li>"#
        )
    }

    fn parse_fragment(source: &MenuSource, html: &str) -> Result<Vec<Menu>> {
        let document = Html::parse_document(html);
        let day_sel = Selector::parse("div.c-schedule__item").unwrap();
        let mut menus = Vec::new();
        for block in document.select(&day_sel) {
            if let Some(menu) = source.parse_day(block)? {
                menus.push(menu);
            }
        }
        Ok(menus)
    }

    #[test]
    fn parses_a_full_day() {
        let html = day_html(&format!(
            "{}{}",
            dish_li("Schweinebraten mit Knödel", "2", "Gl,Sl", "", "0", "Tagesgericht"),
            dish_li("Gemüsecurry", "", "So", "", "2", ""),
        ));

        let source = MenuSource::new(Canteen::MensaGarching);
        let menus = parse_fragment(&source, &html).unwrap();
        assert_eq!(menus.len(), 1);

        let menu = &menus[0];
        assert_eq!(menu.date, NaiveDate::from_ymd_opt(2025, 4, 7).unwrap());
        assert_eq!(menu.dishes.len(), 2);

        let braten = &menu.dishes[0];
        assert_eq!(braten.title, "Schweinebraten mit Knödel");
        // empty span inherits the previous type
        assert_eq!(menu.dishes[1].dish_type, "Tagesgericht");
        assert!(braten.labels.contains(&Label::Meat));
        assert!(braten.labels.contains(&Label::Gluten));
        // meat base price, classic per-unit
        assert_eq!(braten.prices.students.base_price, Some(1.0));
        assert_eq!(braten.prices.students.price_per_unit, Some(0.80));

        let curry = &menu.dishes[1];
        assert!(curry.labels.contains(&Label::Vegan));
        assert!(curry.labels.contains(&Label::Vegetarian));
        assert_eq!(curry.prices.students.base_price, Some(0.0));
    }

    #[test]
    fn side_dishes_bypass_price_derivation() {
        let html = day_html(&dish_li("Bratwurst", "", "Fi", "", "0", "Beilagen"));

        let source = MenuSource::new(Canteen::MensaGarching);
        let menus = parse_fragment(&source, &html).unwrap();
        let side = &menus[0].dishes[0];
        // meat/fish signals are ignored for the side-dish bucket
        assert_eq!(side.prices.students.base_price, Some(0.0));
        assert_eq!(side.prices.students.price_per_unit, Some(0.80));
    }

    #[test]
    fn duplicate_names_get_numbered() {
        let names = vec![
            "Pommes".to_string(),
            "Pommes".to_string(),
            "Salat".to_string(),
            "Pommes".to_string(),
        ];
        assert_eq!(
            make_duplicates_unique(names),
            vec!["Pommes", "Pommes (2)", "Salat", "Pommes (3)"]
        );
    }

    #[test]
    fn misaligned_markup_is_a_processing_error() {
        // a dish title outside any list item breaks the 1:1 assumption
        let html = day_html(&format!(
            "{}<p class=\"c-menu-dish__title\">Geistergericht</p>",
            dish_li("Pasta", "", "", "", "1", "Tagesgericht"),
        ));

        let source = MenuSource::new(Canteen::MensaGarching);
        let err = parse_fragment(&source, &html).unwrap_err();
        assert!(matches!(err, FetcherError::Processing(_)));
    }

    #[test]
    fn fixed_table_canteen_uses_type_lookup() {
        let html = day_html(&dish_li("Linseneintopf", "", "", "", "1", "Tagesgericht 2"));

        let source = MenuSource::new(Canteen::MensaLothstr);
        let menus = parse_fragment(&source, &html).unwrap();
        let dish = &menus[0].dishes[0];
        assert_eq!(dish.prices.students.base_price, Some(1.70));
        assert_eq!(dish.prices.guests.base_price, Some(3.50));
        assert_eq!(dish.prices.students.price_per_unit, None);
    }

    #[test]
    fn dish_less_day_is_still_emitted() {
        let html = day_html("");

        let source = MenuSource::new(Canteen::MensaGarching);
        let menus = parse_fragment(&source, &html).unwrap();
        assert_eq!(menus.len(), 1);
        assert_eq!(menus[0].date, NaiveDate::from_ymd_opt(2025, 4, 7).unwrap());
        assert!(menus[0].dishes.is_empty());
    }

    #[test]
    fn day_without_date_is_skipped() {
        let html = r#"<html><body><div class="c-schedule__item">
              <strong>Feiertag</strong>
            </div></body></html>"#;
        let source = MenuSource::new(Canteen::MensaGarching);
        let menus = parse_fragment(&source, html).unwrap();
        assert!(menus.is_empty());
    }
}
