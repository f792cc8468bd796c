use crate::data_types::{Price, Prices};

// Prices taken from:
// https://www.studierendenwerk-muenchen-oberbayern.de/mensa/mensa-preise/

/// Flat base component of a self-service price, (students, staff, guests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BasePriceType {
    VegetarianSoupStew,
    Sausage,
    Meat,
    Fish,
    PizzaVegie,
    PizzaMeat,
    Dessert,
}

impl BasePriceType {
    pub fn price(self) -> (f64, f64, f64) {
        match self {
            BasePriceType::VegetarianSoupStew => (0.0, 0.0, 0.0),
            BasePriceType::Sausage => (0.5, 0.5, 0.5),
            BasePriceType::Meat => (1.0, 1.0, 1.0),
            BasePriceType::Fish => (1.5, 1.5, 1.5),
            BasePriceType::PizzaVegie => (4.0, 4.5, 5.0),
            BasePriceType::PizzaMeat => (4.5, 5.0, 5.5),
            BasePriceType::Dessert => (1.5, 1.5, 1.5),
        }
    }
}

/// Weighed component, per 100g, (students, staff, guests).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PricePerUnitType {
    Classic,
    SoupStew,
    Pizza,
    Dessert,
}

impl PricePerUnitType {
    pub const UNIT: &'static str = "100g";

    pub fn price(self) -> (f64, f64, f64) {
        match self {
            PricePerUnitType::Classic => (0.80, 1.00, 1.35),
            PricePerUnitType::SoupStew => (0.33, 0.65, 1.35),
            PricePerUnitType::Pizza => (0.0, 0.0, 0.0),
            PricePerUnitType::Dessert => (0.0, 0.0, 0.0),
        }
    }
}

/// How a canteen prices its dishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceRegime {
    /// Flat per-tier prices looked up by dish type.
    FixedTable,
    /// Base price plus price per 100g, derived from dish signals.
    SelfService,
}

/// The raw per-dish signals the decision cascade works from.
#[derive(Debug, Clone, Copy)]
pub struct PriceSignal<'a> {
    pub dish_type: &'a str,
    pub allergen_codes: &'a str,
    /// `data-essen-fleischlos`: "0" means the dish contains meat or fish.
    pub meatless_flag: &'a str,
}

impl PriceSignal<'_> {
    fn is_non_vegetarian(&self) -> bool {
        self.meatless_flag == "0"
    }

    fn has_fish_allergen(&self) -> bool {
        self.allergen_codes
            .split(',')
            .any(|code| code.trim() == "Fi")
    }
}

pub fn self_service_prices(
    base_price_type: BasePriceType,
    price_per_unit_type: PricePerUnitType,
) -> Prices {
    let base = base_price_type.price();
    let per_unit = price_per_unit_type.price();
    Prices::new(
        Price::per_unit(base.0, per_unit.0, PricePerUnitType::UNIT),
        Price::per_unit(base.1, per_unit.1, PricePerUnitType::UNIT),
        Price::per_unit(base.2, per_unit.2, PricePerUnitType::UNIT),
    )
}

/// Resolves the (base, per-unit) pair for a self-service canteen. This is an
/// ordered cascade of overrides, not an exclusive branch: later rules win.
pub fn choose_self_service_types(
    signal: &PriceSignal,
    dish_name: &str,
) -> (BasePriceType, PricePerUnitType) {
    let name_lower = dish_name.to_lowercase();

    let mut price_per_unit_type = if signal.dish_type == "Studitopf" {
        PricePerUnitType::SoupStew
    } else {
        PricePerUnitType::Classic
    };

    let mut base_price_type = if signal.dish_type != "Studitopf" && signal.is_non_vegetarian() {
        if signal.has_fish_allergen() {
            BasePriceType::Fish
        // TODO: find a better way to distinguish sausage from meat
        } else if name_lower.contains("wurst") || name_lower.contains("würstchen") {
            BasePriceType::Sausage
        } else {
            BasePriceType::Meat
        }
    } else {
        BasePriceType::VegetarianSoupStew
    };

    if signal.dish_type == "Dessert (Glas)" {
        price_per_unit_type = PricePerUnitType::Dessert;
        base_price_type = BasePriceType::Dessert;
    }

    // soup by name wins over type by code
    if name_lower.contains("suppe") {
        price_per_unit_type = PricePerUnitType::SoupStew;
        base_price_type = BasePriceType::VegetarianSoupStew;
    }

    if signal.dish_type == "Pizza" {
        price_per_unit_type = PricePerUnitType::Pizza;
        base_price_type = if signal.is_non_vegetarian() {
            BasePriceType::PizzaMeat
        } else {
            BasePriceType::PizzaVegie
        };
    }

    (base_price_type, price_per_unit_type)
}

/// Pre-set daily menu prices of Mensa Weihenstephan and Mensa Lothstraße.
/// Unknown dish types resolve to an all-unknown `Prices`.
pub fn fixed_menu_prices(dish_type: &str) -> Prices {
    let flat = |students: f64, staff: f64, guests: f64| {
        Prices::new(Price::flat(students), Price::flat(staff), Price::flat(guests))
    };

    match dish_type {
        "Tagesgericht 1" => flat(1.00, 2.25, 3.10),
        "Tagesgericht 2" => flat(1.70, 2.50, 3.50),
        "Tagesgericht 3" => flat(2.05, 2.85, 3.90),
        "Tagesgericht 4" => flat(2.55, 3.20, 4.30),
        "Suppe" => flat(0.60, 0.70, 1.10),
        "Stärkebeilagen" | "Beilage" => flat(0.65, 0.90, 1.25),
        "Salatbuffet" => Prices::new(
            Price::per_unit(0.0, 0.80, "100g"),
            Price::per_unit(0.0, 1.00, "100g"),
            Price::per_unit(0.0, 1.35, "100g"),
        ),
        "Obst" => flat(0.85, 0.85, 0.85),
        "Bio-/Aktionsgericht 1" => flat(1.70, 2.50, 3.50),
        "Bio-/Aktionsgericht 2" => flat(2.05, 2.85, 3.90),
        "Bio-/Aktionsgericht 3" => flat(2.55, 3.20, 4.30),
        "Bio-/Aktionsgericht 4" => flat(2.75, 3.55, 4.70),
        "Bio-/Aktionsgericht 5" => flat(2.95, 3.90, 5.10),
        "Bio-/Aktionsgericht 6" => flat(3.15, 4.25, 5.50),
        "Bio-/Aktionsgericht 7" => flat(3.35, 4.60, 5.90),
        "Bio-/Aktionsgericht 8" => flat(3.65, 4.95, 6.30),
        "Bio-/Aktionsgericht 9" => flat(4.15, 5.30, 6.70),
        "Bio-/Aktionsgericht 10" => flat(4.65, 5.65, 7.10),
        "Bio-/Aktionsbeilage 1" => flat(0.65, 0.90, 1.30),
        "Bio-/Aktionsbeilage 2" => flat(0.80, 1.05, 1.50),
        "Bio-/Aktionsbeilage 3" => flat(0.90, 1.25, 1.70),
        "Bio-/Aktionsbeilage 4" => flat(1.10, 1.45, 2.00),
        "Aktionsbeilage 6" => flat(1.50, 1.70, 2.30),
        _ => Prices::default(),
    }
}

/// Always returns a value; "price unknown" is an all-`None` `Prices`.
pub fn derive_price(regime: PriceRegime, signal: &PriceSignal, dish_name: &str) -> Prices {
    match regime {
        PriceRegime::FixedTable => fixed_menu_prices(signal.dish_type),
        PriceRegime::SelfService => {
            let (base, per_unit) = choose_self_service_types(signal, dish_name);
            self_service_prices(base, per_unit)
        }
    }
}

/// Lossy €/€€/€€€ display hint from the student tier, treating the per-unit
/// component as one nominal 100g portion. Not a real price.
pub fn calculate_simple_price(prices: &Prices) -> Option<&'static str> {
    let students = &prices.students;

    let base_price = students.base_price?;
    if students.price_per_unit.is_none() && students.unit.is_none() {
        return None;
    }

    let total = base_price + students.price_per_unit.unwrap_or(0.0);

    if total <= 0.5 {
        Some("€")
    } else if total <= 1.6 {
        Some("€€")
    } else {
        Some("€€€")
    }
}
