//! Static name to code tables for sector and country breakdowns

use std::collections::HashMap;

/// Code substituted when a display name is not in the table.
pub const OTHER_CODE: &str = "OTH";

const SECTORS: &[(&str, &str)] = &[
    ("Communication Services", "COM"),
    ("Communications", "COM"),
    ("Telecommunication Services", "COM"),
    ("Telecommunications", "COM"),
    ("Consumer Discretionary", "CSD"),
    ("Consumer Staples", "CSS"),
    ("Energy", "ENE"),
    ("Financials", "FIN"),
    ("Health Care", "HLT"),
    ("Industrials", "IND"),
    ("Information Technology", "TEC"),
    ("Technology", "TEC"),
    ("Materials", "MAT"),
    ("Basic Materials", "MAT"),
    ("Real Estate", "REA"),
    ("Utilities", "UTL"),
    ("Government", "GOV"),
    ("Treasury", "GOV"),
    ("Federal", "GOV"),
    ("Provincial", "PRV"),
    ("Municipal", "MUN"),
    ("Agency", "AGY"),
    ("Corporate", "CRP"),
    ("Securitized", "SCZ"),
    ("Cash", "CSH"),
    ("Cash and Equivalents", "CSH"),
    ("Other", "OTH"),
];

const COUNTRIES: &[(&str, &str)] = &[
    ("Argentina", "ARG"),
    ("Australia", "AUS"),
    ("Austria", "AUT"),
    ("Bahrain", "BHR"),
    ("Belgium", "BEL"),
    ("Bermuda", "BMU"),
    ("Brazil", "BRA"),
    ("Canada", "CAN"),
    ("Cayman Islands", "CYM"),
    ("Chile", "CHL"),
    ("China", "CHN"),
    ("Colombia", "COL"),
    ("Czech Republic", "CZE"),
    ("Denmark", "DNK"),
    ("Egypt", "EGY"),
    ("Finland", "FIN"),
    ("France", "FRA"),
    ("Germany", "DEU"),
    ("Greece", "GRC"),
    ("Hong Kong", "HKG"),
    ("Hungary", "HUN"),
    ("India", "IND"),
    ("Indonesia", "IDN"),
    ("Ireland", "IRL"),
    ("Israel", "ISR"),
    ("Italy", "ITA"),
    ("Japan", "JPN"),
    ("Jersey", "JEY"),
    ("Korea", "KOR"),
    ("South Korea", "KOR"),
    ("Republic of Korea", "KOR"),
    ("Kuwait", "KWT"),
    ("Luxembourg", "LUX"),
    ("Macau", "MAC"),
    ("Malaysia", "MYS"),
    ("Mexico", "MEX"),
    ("Netherlands", "NLD"),
    ("New Zealand", "NZL"),
    ("Norway", "NOR"),
    ("Pakistan", "PAK"),
    ("Peru", "PER"),
    ("Philippines", "PHL"),
    ("Poland", "POL"),
    ("Portugal", "PRT"),
    ("Qatar", "QAT"),
    ("Russia", "RUS"),
    ("Russian Federation", "RUS"),
    ("Saudi Arabia", "SAU"),
    ("Singapore", "SGP"),
    ("South Africa", "ZAF"),
    ("Spain", "ESP"),
    ("Sweden", "SWE"),
    ("Switzerland", "CHE"),
    ("Taiwan", "TWN"),
    ("Thailand", "THA"),
    ("Turkey", "TUR"),
    ("United Arab Emirates", "ARE"),
    ("United Kingdom", "GBR"),
    ("United States", "USA"),
    ("United States of America", "USA"),
];

/// Case-insensitive lookup tables, built once and shared read-only.
#[derive(Debug, Clone)]
pub struct LookupTables {
    sectors: HashMap<String, &'static str>,
    countries: HashMap<String, &'static str>,
}

impl LookupTables {
    pub fn builtin() -> Self {
        Self::from_entries(SECTORS, COUNTRIES)
    }

    pub fn from_entries(
        sectors: &[(&str, &'static str)],
        countries: &[(&str, &'static str)],
    ) -> Self {
        fn index(entries: &[(&str, &'static str)]) -> HashMap<String, &'static str> {
            entries
                .iter()
                .map(|(name, code)| (name.to_uppercase(), *code))
                .collect()
        }
        Self {
            sectors: index(sectors),
            countries: index(countries),
        }
    }

    pub fn sector_code(&self, name: &str) -> Option<&'static str> {
        self.sectors.get(&name.to_uppercase()).copied()
    }

    pub fn country_code(&self, name: &str) -> Option<&'static str> {
        self.countries.get(&name.to_uppercase()).copied()
    }
}

impl Default for LookupTables {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_ignores_case() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.country_code("canada"), Some("CAN"));
        assert_eq!(tables.country_code("UNITED STATES"), Some("USA"));
        assert_eq!(tables.sector_code("information technology"), Some("TEC"));
        assert_eq!(tables.sector_code("Real Estate"), Some("REA"));
    }

    #[test]
    fn test_lookup_is_exact_match() {
        let tables = LookupTables::builtin();
        assert_eq!(tables.country_code("Canada "), None);
        assert_eq!(tables.country_code("Can"), None);
        assert_eq!(tables.sector_code("Energy Equipment"), None);
    }

    #[test]
    fn test_all_codes_are_three_letters() {
        for (_, code) in SECTORS.iter().chain(COUNTRIES.iter()) {
            assert_eq!(code.len(), 3, "code {code} is not three letters");
        }
        assert_eq!(OTHER_CODE.len(), 3);
    }
}
