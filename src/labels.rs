use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

use crate::data_types::LabelSet;

/// Controlled label vocabulary: allergens, additives, diet classifiers and
/// certifications. Persisted by name, so variants must not be renamed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Label {
    Gluten,
    Wheat,
    Rye,
    Barley,
    Oat,
    Spelt,
    Hybrids,
    Shellfish,
    ChickenEggs,
    Fish,
    Peanuts,
    Soy,
    Milk,
    Lactose,
    Almonds,
    Hazelnuts,
    Walnuts,
    Cashews,
    Pecan,
    Pistachioes,
    Macadamia,
    Celery,
    Mustard,
    Sesame,
    Sulphurs,
    Sulfites,
    Lupin,
    Molluscs,
    ShellFruits,
    Bavaria,
    Msc,
    Dyestuff,
    Preservatives,
    Antioxidants,
    FlavorEnhancer,
    Waxed,
    Phospates,
    Sweeteners,
    Phenylalanine,
    CocoaContainingGrease,
    Gelatin,
    Alcohol,
    Pork,
    Beef,
    Veal,
    WildMeat,
    Lamb,
    Garlic,
    Poultry,
    Cereal,
    Meat,
    Vegan,
    Vegetarian,
}

const NUT_LABELS: [Label; 8] = [
    Label::Almonds,
    Label::Hazelnuts,
    Label::Macadamia,
    Label::Cashews,
    Label::Pecan,
    Label::Pistachioes,
    Label::Sesame,
    Label::Walnuts,
];

const GRAIN_LABELS: [Label; 5] = [
    Label::Barley,
    Label::Oat,
    Label::Rye,
    Label::Spelt,
    Label::Wheat,
];

const RED_MEAT_LABELS: [Label; 3] = [Label::Pork, Label::Beef, Label::Veal];

/// Adds generic labels implied by specific ones. Supertypes never imply
/// subtypes, so a single pass is enough and re-applying is a no-op.
pub fn add_supertype_labels(labels: &mut LabelSet) {
    if NUT_LABELS.iter().any(|l| labels.contains(l)) {
        labels.insert(Label::ShellFruits);
    }
    if GRAIN_LABELS.iter().any(|l| labels.contains(l)) {
        labels.insert(Label::Cereal);
    }
    if labels.contains(&Label::Vegan) {
        labels.insert(Label::Vegetarian);
    }
    if RED_MEAT_LABELS.iter().any(|l| labels.contains(l)) {
        labels.insert(Label::Meat);
    }
}

/// The `data-essen-fleischlos` attribute: "0" meat (unless a fish allergen
/// was already found), "1" vegetarian, "2" vegan.
pub fn apply_diet_flag(labels: &mut LabelSet, diet_flag: &str) {
    match diet_flag {
        "0" => {
            if !labels.contains(&Label::Fish) {
                labels.insert(Label::Meat);
            }
        }
        "1" => {
            labels.insert(Label::Vegetarian);
        }
        "2" => {
            labels.insert(Label::Vegan);
        }
        _ => {}
    }
    add_supertype_labels(labels);
}

const TITLE_KEYWORDS: [(&str, Label); 13] = [
    ("huhn", Label::Poultry),
    ("hähnchen", Label::Poultry),
    ("hahn", Label::Poultry),
    ("chicken", Label::Poultry),
    ("pute", Label::Poultry),
    ("hühner", Label::Poultry),
    ("ente", Label::Poultry),
    ("hendl", Label::Poultry),
    ("schwein", Label::Pork),
    ("rind", Label::Beef),
    ("hirsch", Label::WildMeat),
    ("lamm", Label::Lamb),
    ("kalb", Label::Veal),
];

/// Recovers species labels the source omitted by scanning the German dish
/// title. Conflicting signals are kept, not reconciled.
pub fn detect_labels_from_title(title: &str) -> LabelSet {
    let title_lower = title.to_lowercase();
    let mut labels = LabelSet::new();

    for (keyword, label) in TITLE_KEYWORDS {
        if title_lower.contains(keyword) {
            labels.insert(label);
        }
    }
    if title_lower.contains("tintenfisch") {
        labels.insert(Label::Shellfish);
    }

    labels
}

/// Maps source-specific marker codes to labels. Tables differ per source:
/// "Gl" or "1" can mean different things elsewhere, so a table is built per
/// source and injected into the parser.
pub struct LabelTable {
    codes: BTreeMap<&'static str, &'static [Label]>,
    unrecognized: AtomicU64,
}

impl LabelTable {
    /// Marker codes of the Studierendenwerk München-Oberbayern menu pages.
    pub fn studentenwerk() -> Self {
        let codes: [(&'static str, &'static [Label]); 45] = [
            ("GQB", &[Label::Bavaria]),
            ("MSC", &[Label::Msc]),
            ("1", &[Label::Dyestuff]),
            ("2", &[Label::Preservatives]),
            ("3", &[Label::Antioxidants]),
            ("4", &[Label::FlavorEnhancer]),
            ("5", &[Label::Sulphurs]),
            ("6", &[Label::Dyestuff]),
            ("7", &[Label::Waxed]),
            ("8", &[Label::Phospates]),
            ("9", &[Label::Sweeteners]),
            ("10", &[Label::Phenylalanine]),
            ("11", &[Label::Sweeteners]),
            ("13", &[Label::CocoaContainingGrease]),
            ("14", &[Label::Gelatin]),
            ("99", &[Label::Alcohol]),
            ("f", &[Label::Vegetarian]),
            ("v", &[Label::Vegan]),
            ("S", &[Label::Pork]),
            ("R", &[Label::Beef]),
            ("K", &[Label::Veal]),
            ("Kn", &[Label::Garlic]),
            ("Ei", &[Label::ChickenEggs]),
            ("En", &[Label::Peanuts]),
            ("Fi", &[Label::Fish]),
            ("Gl", &[Label::Gluten]),
            ("GlW", &[Label::Wheat]),
            ("GlR", &[Label::Rye]),
            ("GlG", &[Label::Barley]),
            ("GlH", &[Label::Oat]),
            ("GlD", &[Label::Spelt]),
            ("Kr", &[Label::Shellfish]),
            ("Lu", &[Label::Lupin]),
            ("Mi", &[Label::Milk, Label::Lactose]),
            ("ScM", &[Label::Almonds]),
            ("ScH", &[Label::Hazelnuts]),
            ("ScW", &[Label::Walnuts]),
            ("ScC", &[Label::Cashews]),
            ("ScP", &[Label::Pistachioes]),
            ("Se", &[Label::Sesame]),
            ("Sf", &[Label::Mustard]),
            ("Sl", &[Label::Celery]),
            ("So", &[Label::Soy]),
            ("Sw", &[Label::Sulphurs, Label::Sulfites]),
            ("Wt", &[Label::Molluscs]),
        ];

        LabelTable {
            codes: codes.into_iter().collect(),
            unrecognized: AtomicU64::new(0),
        }
    }

    /// Resolves a comma-separated marker string. Unknown codes are counted
    /// and logged, never an error: source tables evolve without notice.
    pub fn resolve(&self, raw_codes: &str) -> LabelSet {
        let mut labels = LabelSet::new();

        for token in raw_codes.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            match self.codes.get(token) {
                Some(mapped) => labels.extend(mapped.iter().copied()),
                None => {
                    self.unrecognized.fetch_add(1, Ordering::Relaxed);
                    log::debug!("unrecognized label code '{token}'");
                }
            }
        }

        add_supertype_labels(&mut labels);
        labels
    }

    /// Diagnostic counter of codes dropped since construction.
    pub fn unrecognized_count(&self) -> u64 {
        self.unrecognized.load(Ordering::Relaxed)
    }
}
