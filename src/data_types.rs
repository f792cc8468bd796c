use std::collections::BTreeSet;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::labels::Label;

pub type LabelSet = BTreeSet<Label>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PriceTier {
    Students,
    Staff,
    Guests,
}

impl PriceTier {
    pub const ALL: [PriceTier; 3] = [PriceTier::Students, PriceTier::Staff, PriceTier::Guests];

    pub fn as_db_str(self) -> &'static str {
        match self {
            PriceTier::Students => "STUDENTS",
            PriceTier::Staff => "STAFF",
            PriceTier::Guests => "GUESTS",
        }
    }
}

/// A single price tier. Both fields unset means "price unknown".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Price {
    pub base_price: Option<f64>,
    pub price_per_unit: Option<f64>,
    pub unit: Option<String>,
}

impl Price {
    pub fn flat(base_price: f64) -> Self {
        Price {
            base_price: Some(base_price),
            price_per_unit: None,
            unit: None,
        }
    }

    pub fn per_unit(base_price: f64, price_per_unit: f64, unit: &str) -> Self {
        Price {
            base_price: Some(base_price),
            price_per_unit: Some(price_per_unit),
            unit: Some(unit.to_string()),
        }
    }

    pub fn is_unknown(&self) -> bool {
        self.base_price.is_none() && self.price_per_unit.is_none()
    }
}

/// Three-tier price. Staff/guest tiers fall back to the student tier when a
/// source only publishes a single price.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prices {
    pub students: Price,
    pub staff: Price,
    pub guests: Price,
}

impl Prices {
    pub fn new(students: Price, staff: Price, guests: Price) -> Self {
        Prices {
            students,
            staff,
            guests,
        }
    }

    pub fn uniform(students: Price) -> Self {
        Prices {
            staff: students.clone(),
            guests: students.clone(),
            students,
        }
    }

    pub fn tier(&self, tier: PriceTier) -> &Price {
        match tier {
            PriceTier::Students => &self.students,
            PriceTier::Staff => &self.staff,
            PriceTier::Guests => &self.guests,
        }
    }
}

/// Parse-time dish, emitted by the menu parser. Never persisted directly.
#[derive(Debug, Clone, PartialEq)]
pub struct Dish {
    pub title: String,
    pub prices: Prices,
    pub labels: LabelSet,
    pub dish_type: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Menu {
    pub date: NaiveDate,
    pub dishes: Vec<Dish>,
}

impl Menu {
    pub fn new(date: NaiveDate, dishes: Vec<Dish>) -> Self {
        Menu { date, dishes }
    }

    /// Drops dishes that are equal in all fields, keeping first occurrence.
    pub fn remove_duplicates(&mut self) {
        let mut unique: Vec<Dish> = Vec::with_capacity(self.dishes.len());
        for dish in self.dishes.drain(..) {
            if !unique.contains(&dish) {
                unique.push(dish);
            }
        }
        self.dishes = unique;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DishCategory {
    Main,
    Side,
    Soup,
    Dessert,
}

impl DishCategory {
    /// Derived once at first sighting of a dish, from the text before the
    /// first comma of the source's dish type string.
    pub fn from_dish_type(dish_type: &str) -> Self {
        let first_word = dish_type
            .trim()
            .split(',')
            .next()
            .unwrap_or_default()
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_uppercase();

        match first_word.as_str() {
            "SÜSSSPEISE" | "DESSERT" => DishCategory::Dessert,
            "BEILAGEN" | "SIDE" => DishCategory::Side,
            "STUDITOPF" | "TAGESSUPE" => DishCategory::Soup,
            _ => DishCategory::Main,
        }
    }

    pub fn as_db_str(self) -> &'static str {
        match self {
            DishCategory::Main => "MAIN",
            DishCategory::Side => "SIDE",
            DishCategory::Soup => "SOUP",
            DishCategory::Dessert => "DESSERT",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    German,
    EnglishUs,
}

impl Language {
    pub const SOURCE: Language = Language::German;
    pub const TARGETS: [Language; 1] = [Language::EnglishUs];

    pub fn code(self) -> &'static str {
        match self {
            Language::German => "de-DE",
            Language::EnglishUs => "en-US",
        }
    }

    /// DeepL wants plain two-letter codes on the source side.
    pub fn deepl_code(self) -> &'static str {
        match self {
            Language::German => "DE",
            Language::EnglishUs => "EN-US",
        }
    }
}
