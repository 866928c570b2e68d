//! Country and region names recognized in category tags

use std::collections::HashSet;
use std::sync::LazyLock;

const COUNTRY_NAMES: &[&str] = &[
    "afghanistan", "albania", "algeria", "andorra", "angola", "argentina", "armenia",
    "australia", "austria", "azerbaijan", "bahamas", "bahrain", "bangladesh", "barbados",
    "belarus", "belgium", "belize", "benin", "bhutan", "bolivia", "bosnia and herzegovina",
    "botswana", "brazil", "brunei", "bulgaria", "burkina faso", "burundi", "cambodia",
    "cameroon", "canada", "cape verde", "chad", "chile", "china", "colombia", "comoros",
    "congo", "costa rica", "croatia", "cuba", "cyprus", "czech republic", "czechia",
    "denmark", "djibouti", "dominica", "dominican republic", "ecuador", "egypt",
    "el salvador", "equatorial guinea", "eritrea", "estonia", "eswatini", "ethiopia", "fiji",
    "finland", "france", "gabon", "gambia", "georgia", "germany", "ghana", "greece",
    "grenada", "guatemala", "guinea", "guyana", "haiti", "honduras", "hong kong", "hungary",
    "iceland", "india", "indonesia", "iran", "iraq", "ireland", "israel", "italy",
    "ivory coast", "jamaica", "japan", "jordan", "kazakhstan", "kenya", "kosovo", "kuwait",
    "kyrgyzstan", "laos", "latvia", "lebanon", "lesotho", "liberia", "libya",
    "liechtenstein", "lithuania", "luxembourg", "macau", "madagascar", "malawi", "malaysia",
    "maldives", "mali", "malta", "mauritania", "mauritius", "mexico", "moldova", "monaco",
    "mongolia", "montenegro", "morocco", "mozambique", "myanmar", "namibia", "nepal",
    "netherlands", "new zealand", "nicaragua", "niger", "nigeria", "north korea",
    "north macedonia", "norway", "oman", "pakistan", "palestine", "panama",
    "papua new guinea", "paraguay", "peru", "philippines", "poland", "portugal",
    "puerto rico", "qatar", "romania", "russia", "rwanda", "san marino", "saudi arabia",
    "senegal", "serbia", "seychelles", "sierra leone", "singapore", "slovakia", "slovenia",
    "somalia", "south africa", "south korea", "south sudan", "spain", "sri lanka", "sudan",
    "suriname", "sweden", "switzerland", "syria", "taiwan", "tajikistan", "tanzania",
    "thailand", "togo", "trinidad and tobago", "tunisia", "turkey", "turkmenistan",
    "uganda", "ukraine", "united arab emirates", "united kingdom", "united states",
    "uruguay", "uzbekistan", "vatican city", "venezuela", "vietnam", "yemen", "zambia",
    "zimbabwe",
    // Regions commonly used as tags
    "international", "worldwide", "europe", "latin america", "middle east", "africa",
    "asia", "caribbean",
];

const COUNTRY_ABBREVIATIONS: &[&str] = &[
    "uk", "gb", "usa", "us", "uae", "drc", "ksa", "nz", "rsa", "prc", "roc", "england",
    "scotland", "wales", "northern ireland", "great britain", "america", "holland",
    "korea", "türkiye", "viet nam",
];

static COUNTRIES: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    COUNTRY_NAMES
        .iter()
        .chain(COUNTRY_ABBREVIATIONS.iter())
        .copied()
        .collect()
});

/// Case-insensitive membership test against the known country set
pub fn is_country(token: &str) -> bool {
    let normalized = token.trim().to_lowercase();
    !normalized.is_empty() && COUNTRIES.contains(normalized.as_str())
}
