use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::constants::MENU_URL_TEMPLATE;
use crate::pricing::PriceRegime;

/// Regular vs. lecture-free serving weekdays; which table applies depends
/// on the semester calendar. Only the weekday matters for menu-day seeding.
#[derive(Debug, Clone, Copy)]
pub struct ServiceDays {
    pub regular: &'static [Weekday],
    pub lecture_free: &'static [Weekday],
}

impl ServiceDays {
    pub fn serves_on(&self, day: Weekday, lecture_free: bool) -> bool {
        let table = if lecture_free {
            self.lecture_free
        } else {
            self.regular
        };
        table.contains(&day)
    }
}

const WORK_WEEK: [Weekday; 5] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
];

const MENSA_DAYS: ServiceDays = ServiceDays {
    regular: &WORK_WEEK,
    lecture_free: &WORK_WEEK,
};

const BISTRO_DAYS: ServiceDays = ServiceDays {
    regular: &WORK_WEEK,
    lecture_free: &WORK_WEEK,
};

// closed on Fridays during the lecture-free period
const CAFE_DAYS: ServiceDays = ServiceDays {
    regular: &WORK_WEEK,
    lecture_free: &[Weekday::Mon, Weekday::Tue, Weekday::Wed, Weekday::Thu],
};

/// Canteens of the Studierendenwerk München-Oberbayern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Canteen {
    MensaLeopoldstr,
    MensaLothstr,
    MensaArcisstr,
    MensaGarching,
    MensaMartinsried,
    MensaPasing,
    MensaWeihenstephan,
    MensaRosenheim,
    StuBistroArcisstr,
    StuBistroSchellingstr,
    StuBistroGoethestr,
    StuBistroButenandstr,
    StuBistroAkademiestr,
    StuCafeKarlstr,
}

impl Canteen {
    pub const ALL: [Canteen; 14] = [
        Canteen::MensaLeopoldstr,
        Canteen::MensaLothstr,
        Canteen::MensaArcisstr,
        Canteen::MensaGarching,
        Canteen::MensaMartinsried,
        Canteen::MensaPasing,
        Canteen::MensaWeihenstephan,
        Canteen::MensaRosenheim,
        Canteen::StuBistroArcisstr,
        Canteen::StuBistroSchellingstr,
        Canteen::StuBistroGoethestr,
        Canteen::StuBistroButenandstr,
        Canteen::StuBistroAkademiestr,
        Canteen::StuCafeKarlstr,
    ];

    /// Stable identifier used as `canteen_id` in the database.
    pub fn id(self) -> &'static str {
        match self {
            Canteen::MensaLeopoldstr => "mensa-leopoldstr",
            Canteen::MensaLothstr => "mensa-lothstr",
            Canteen::MensaArcisstr => "mensa-arcisstr",
            Canteen::MensaGarching => "mensa-garching",
            Canteen::MensaMartinsried => "mensa-martinsried",
            Canteen::MensaPasing => "mensa-pasing",
            Canteen::MensaWeihenstephan => "mensa-weihenstephan",
            Canteen::MensaRosenheim => "mensa-rosenheim",
            Canteen::StuBistroArcisstr => "stubistro-arcisstr",
            Canteen::StuBistroSchellingstr => "stubistro-schellingstr",
            Canteen::StuBistroGoethestr => "stubistro-goethestr",
            Canteen::StuBistroButenandstr => "stubistro-butenandstr",
            Canteen::StuBistroAkademiestr => "stubistro-akademiestr",
            Canteen::StuCafeKarlstr => "stucafe-karlstr",
        }
    }

    /// Numeric id used in the meal plan URL.
    pub fn url_id(self) -> u32 {
        match self {
            Canteen::MensaLeopoldstr => 411,
            Canteen::MensaLothstr => 431,
            Canteen::MensaArcisstr => 421,
            Canteen::MensaGarching => 422,
            Canteen::MensaMartinsried => 412,
            Canteen::MensaPasing => 432,
            Canteen::MensaWeihenstephan => 423,
            Canteen::MensaRosenheim => 441,
            Canteen::StuBistroArcisstr => 450,
            Canteen::StuBistroSchellingstr => 416,
            Canteen::StuBistroGoethestr => 418,
            Canteen::StuBistroButenandstr => 414,
            Canteen::StuBistroAkademiestr => 455,
            Canteen::StuCafeKarlstr => 453,
        }
    }

    pub fn menu_url(self) -> String {
        MENU_URL_TEMPLATE.replace("{url_id}", &self.url_id().to_string())
    }

    /// Weihenstephan and Lothstraße run a fixed daily-menu pricing scheme,
    /// everything else is self-service.
    pub fn price_regime(self) -> PriceRegime {
        match self {
            Canteen::MensaWeihenstephan | Canteen::MensaLothstr => PriceRegime::FixedTable,
            _ => PriceRegime::SelfService,
        }
    }

    pub fn service_days(self) -> &'static ServiceDays {
        match self {
            Canteen::MensaLeopoldstr
            | Canteen::MensaLothstr
            | Canteen::MensaArcisstr
            | Canteen::MensaGarching
            | Canteen::MensaMartinsried
            | Canteen::MensaPasing
            | Canteen::MensaWeihenstephan
            | Canteen::MensaRosenheim => &MENSA_DAYS,
            Canteen::StuBistroArcisstr
            | Canteen::StuBistroSchellingstr
            | Canteen::StuBistroGoethestr
            | Canteen::StuBistroButenandstr
            | Canteen::StuBistroAkademiestr => &BISTRO_DAYS,
            Canteen::StuCafeKarlstr => &CAFE_DAYS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn menu_url_contains_url_id() {
        assert!(Canteen::MensaArcisstr.menu_url().contains("speiseplan_421_-de.html"));
    }

    #[test]
    fn weekend_is_never_served() {
        for canteen in Canteen::ALL {
            let days = canteen.service_days();
            assert!(!days.serves_on(Weekday::Sat, false));
            assert!(!days.serves_on(Weekday::Sun, true));
        }
    }

    #[test]
    fn cafe_skips_friday_when_lecture_free() {
        let days = Canteen::StuCafeKarlstr.service_days();
        assert!(days.serves_on(Weekday::Fri, false));
        assert!(!days.serves_on(Weekday::Fri, true));
    }

    #[test]
    fn fixed_table_regime_is_limited_to_two_mensen() {
        let fixed: Vec<Canteen> = Canteen::ALL
            .into_iter()
            .filter(|c| c.price_regime() == PriceRegime::FixedTable)
            .collect();
        assert_eq!(fixed, vec![Canteen::MensaLothstr, Canteen::MensaWeihenstephan]);
    }
}
