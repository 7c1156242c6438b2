//! Country name canonicalization against the ISO 3166-1 table

use std::collections::HashMap;
use std::sync::OnceLock;

use tracing::warn;

use crate::types::UNKNOWN_COUNTRY;

/// One ISO 3166-1 entry
#[derive(Debug)]
pub struct Country {
    pub alpha2: &'static str,
    pub alpha3: &'static str,
    /// Canonical English short name
    pub name: &'static str,
    /// Official names and common spellings that also resolve to this entry
    pub aliases: &'static [&'static str],
}

macro_rules! country {
    ($a2:literal, $a3:literal, $name:literal) => {
        Country { alpha2: $a2, alpha3: $a3, name: $name, aliases: &[] }
    };
    ($a2:literal, $a3:literal, $name:literal, [$($alias:literal),* $(,)?]) => {
        Country { alpha2: $a2, alpha3: $a3, name: $name, aliases: &[$($alias),*] }
    };
}

pub static COUNTRIES: &[Country] = &[
    country!("AW", "ABW", "Aruba"),
    country!("AF", "AFG", "Afghanistan", ["Islamic Republic of Afghanistan"]),
    country!("AO", "AGO", "Angola", ["Republic of Angola"]),
    country!("AI", "AIA", "Anguilla"),
    country!("AX", "ALA", "Åland Islands"),
    country!("AL", "ALB", "Albania", ["Republic of Albania"]),
    country!("AD", "AND", "Andorra", ["Principality of Andorra"]),
    country!("AE", "ARE", "United Arab Emirates", ["UAE"]),
    country!("AR", "ARG", "Argentina", ["Argentine Republic"]),
    country!("AM", "ARM", "Armenia", ["Republic of Armenia"]),
    country!("AS", "ASM", "American Samoa"),
    country!("AQ", "ATA", "Antarctica"),
    country!("TF", "ATF", "French Southern Territories"),
    country!("AG", "ATG", "Antigua and Barbuda"),
    country!("AU", "AUS", "Australia"),
    country!("AT", "AUT", "Austria", ["Republic of Austria", "Österreich"]),
    country!("AZ", "AZE", "Azerbaijan", ["Republic of Azerbaijan"]),
    country!("BI", "BDI", "Burundi", ["Republic of Burundi"]),
    country!("BE", "BEL", "Belgium", ["Kingdom of Belgium", "België / Belgique / Belgien"]),
    country!("BJ", "BEN", "Benin", ["Republic of Benin"]),
    country!("BQ", "BES", "Bonaire, Sint Eustatius and Saba", ["Caribbean Netherlands"]),
    country!("BF", "BFA", "Burkina Faso"),
    country!("BD", "BGD", "Bangladesh", ["People's Republic of Bangladesh"]),
    country!("BG", "BGR", "Bulgaria", ["Republic of Bulgaria"]),
    country!("BH", "BHR", "Bahrain", ["Kingdom of Bahrain"]),
    country!("BS", "BHS", "Bahamas", ["Commonwealth of the Bahamas", "The Bahamas"]),
    country!("BA", "BIH", "Bosnia and Herzegovina"),
    country!("BL", "BLM", "Saint Barthélemy"),
    country!("BY", "BLR", "Belarus", ["Republic of Belarus"]),
    country!("BZ", "BLZ", "Belize"),
    country!("BM", "BMU", "Bermuda"),
    country!("BO", "BOL", "Bolivia, Plurinational State of", ["Bolivia", "Plurinational State of Bolivia"]),
    country!("BR", "BRA", "Brazil", ["Federative Republic of Brazil", "Brasil"]),
    country!("BB", "BRB", "Barbados"),
    country!("BN", "BRN", "Brunei Darussalam", ["Brunei"]),
    country!("BT", "BTN", "Bhutan", ["Kingdom of Bhutan"]),
    country!("BV", "BVT", "Bouvet Island"),
    country!("BW", "BWA", "Botswana", ["Republic of Botswana"]),
    country!("CF", "CAF", "Central African Republic"),
    country!("CA", "CAN", "Canada"),
    country!("CC", "CCK", "Cocos (Keeling) Islands"),
    country!("CH", "CHE", "Switzerland", ["Swiss Confederation", "Schweiz/Suisse/Svizzera/Svizra"]),
    country!("CL", "CHL", "Chile", ["Republic of Chile"]),
    country!("CN", "CHN", "China", ["People's Republic of China"]),
    country!("CI", "CIV", "Côte d'Ivoire", ["Republic of Côte d'Ivoire", "Ivory Coast", "Cote d'Ivoire"]),
    country!("CM", "CMR", "Cameroon", ["Republic of Cameroon"]),
    country!("CD", "COD", "Congo, The Democratic Republic of the", ["Democratic Republic of the Congo", "DR Congo", "DRC"]),
    country!("CG", "COG", "Congo", ["Republic of the Congo", "Congo-Brazzaville"]),
    country!("CK", "COK", "Cook Islands"),
    country!("CO", "COL", "Colombia", ["Republic of Colombia"]),
    country!("KM", "COM", "Comoros", ["Union of the Comoros"]),
    country!("CV", "CPV", "Cabo Verde", ["Republic of Cabo Verde", "Cape Verde"]),
    country!("CR", "CRI", "Costa Rica", ["Republic of Costa Rica"]),
    country!("CU", "CUB", "Cuba", ["Republic of Cuba"]),
    country!("CW", "CUW", "Curaçao"),
    country!("CX", "CXR", "Christmas Island"),
    country!("KY", "CYM", "Cayman Islands"),
    country!("CY", "CYP", "Cyprus", ["Republic of Cyprus"]),
    country!("CZ", "CZE", "Czechia", ["Czech Republic"]),
    country!("DE", "DEU", "Germany", ["Federal Republic of Germany", "Deutschland"]),
    country!("DJ", "DJI", "Djibouti", ["Republic of Djibouti"]),
    country!("DM", "DMA", "Dominica", ["Commonwealth of Dominica"]),
    country!("DK", "DNK", "Denmark", ["Kingdom of Denmark", "Danmark"]),
    country!("DO", "DOM", "Dominican Republic"),
    country!("DZ", "DZA", "Algeria", ["People's Democratic Republic of Algeria"]),
    country!("EC", "ECU", "Ecuador", ["Republic of Ecuador"]),
    country!("EG", "EGY", "Egypt", ["Arab Republic of Egypt"]),
    country!("ER", "ERI", "Eritrea", ["the State of Eritrea"]),
    country!("EH", "ESH", "Western Sahara"),
    country!("ES", "ESP", "Spain", ["Kingdom of Spain", "España"]),
    country!("EE", "EST", "Estonia", ["Republic of Estonia"]),
    country!("ET", "ETH", "Ethiopia", ["Federal Democratic Republic of Ethiopia"]),
    country!("FI", "FIN", "Finland", ["Republic of Finland"]),
    country!("FJ", "FJI", "Fiji", ["Republic of Fiji"]),
    country!("FK", "FLK", "Falkland Islands (Malvinas)", ["Falkland Islands"]),
    country!("FR", "FRA", "France", ["French Republic"]),
    country!("FO", "FRO", "Faroe Islands"),
    country!("FM", "FSM", "Micronesia, Federated States of", ["Federated States of Micronesia", "Micronesia"]),
    country!("GA", "GAB", "Gabon", ["Gabonese Republic"]),
    country!("GB", "GBR", "United Kingdom", ["United Kingdom of Great Britain and Northern Ireland", "UK", "Great Britain"]),
    country!("GE", "GEO", "Georgia"),
    country!("GG", "GGY", "Guernsey"),
    country!("GH", "GHA", "Ghana", ["Republic of Ghana"]),
    country!("GI", "GIB", "Gibraltar"),
    country!("GN", "GIN", "Guinea", ["Republic of Guinea"]),
    country!("GP", "GLP", "Guadeloupe"),
    country!("GM", "GMB", "Gambia", ["Republic of the Gambia", "The Gambia"]),
    country!("GW", "GNB", "Guinea-Bissau", ["Republic of Guinea-Bissau"]),
    country!("GQ", "GNQ", "Equatorial Guinea", ["Republic of Equatorial Guinea"]),
    country!("GR", "GRC", "Greece", ["Hellenic Republic"]),
    country!("GD", "GRD", "Grenada"),
    country!("GL", "GRL", "Greenland"),
    country!("GT", "GTM", "Guatemala", ["Republic of Guatemala"]),
    country!("GF", "GUF", "French Guiana"),
    country!("GU", "GUM", "Guam"),
    country!("GY", "GUY", "Guyana", ["Republic of Guyana"]),
    country!("HK", "HKG", "Hong Kong", ["Hong Kong Special Administrative Region of China"]),
    country!("HM", "HMD", "Heard Island and McDonald Islands"),
    country!("HN", "HND", "Honduras", ["Republic of Honduras"]),
    country!("HR", "HRV", "Croatia", ["Republic of Croatia"]),
    country!("HT", "HTI", "Haiti", ["Republic of Haiti"]),
    country!("HU", "HUN", "Hungary", ["Magyarország"]),
    country!("ID", "IDN", "Indonesia", ["Republic of Indonesia"]),
    country!("IM", "IMN", "Isle of Man"),
    country!("IN", "IND", "India", ["Republic of India"]),
    country!("IO", "IOT", "British Indian Ocean Territory"),
    country!("IE", "IRL", "Ireland", ["Republic of Ireland"]),
    country!("IR", "IRN", "Iran, Islamic Republic of", ["Iran", "Islamic Republic of Iran"]),
    country!("IQ", "IRQ", "Iraq", ["Republic of Iraq"]),
    country!("IS", "ISL", "Iceland", ["Republic of Iceland"]),
    country!("IL", "ISR", "Israel", ["State of Israel"]),
    country!("IT", "ITA", "Italy", ["Italian Republic", "Italia"]),
    country!("JM", "JAM", "Jamaica"),
    country!("JE", "JEY", "Jersey"),
    country!("JO", "JOR", "Jordan", ["Hashemite Kingdom of Jordan"]),
    country!("JP", "JPN", "Japan"),
    country!("KZ", "KAZ", "Kazakhstan", ["Republic of Kazakhstan"]),
    country!("KE", "KEN", "Kenya", ["Republic of Kenya"]),
    country!("KG", "KGZ", "Kyrgyzstan", ["Kyrgyz Republic"]),
    country!("KH", "KHM", "Cambodia", ["Kingdom of Cambodia"]),
    country!("KI", "KIR", "Kiribati", ["Republic of Kiribati"]),
    country!("KN", "KNA", "Saint Kitts and Nevis"),
    country!("KR", "KOR", "Korea, Republic of", ["South Korea", "Republic of Korea"]),
    country!("KW", "KWT", "Kuwait", ["State of Kuwait"]),
    country!("LA", "LAO", "Lao People's Democratic Republic", ["Laos"]),
    country!("LB", "LBN", "Lebanon", ["Lebanese Republic"]),
    country!("LR", "LBR", "Liberia", ["Republic of Liberia"]),
    country!("LY", "LBY", "Libya"),
    country!("LC", "LCA", "Saint Lucia"),
    country!("LI", "LIE", "Liechtenstein", ["Principality of Liechtenstein"]),
    country!("LK", "LKA", "Sri Lanka", ["Democratic Socialist Republic of Sri Lanka"]),
    country!("LS", "LSO", "Lesotho", ["Kingdom of Lesotho"]),
    country!("LT", "LTU", "Lithuania", ["Republic of Lithuania"]),
    country!("LU", "LUX", "Luxembourg", ["Grand Duchy of Luxembourg"]),
    country!("LV", "LVA", "Latvia", ["Republic of Latvia"]),
    country!("MO", "MAC", "Macao", ["Macao Special Administrative Region of China", "Macau"]),
    country!("MF", "MAF", "Saint Martin (French part)"),
    country!("MA", "MAR", "Morocco", ["Kingdom of Morocco"]),
    country!("MC", "MCO", "Monaco", ["Principality of Monaco"]),
    country!("MD", "MDA", "Moldova, Republic of", ["Moldova", "Republic of Moldova"]),
    country!("MG", "MDG", "Madagascar", ["Republic of Madagascar"]),
    country!("MV", "MDV", "Maldives", ["Republic of Maldives"]),
    country!("MX", "MEX", "Mexico", ["United Mexican States", "México"]),
    country!("MH", "MHL", "Marshall Islands", ["Republic of the Marshall Islands"]),
    country!("MK", "MKD", "North Macedonia", ["Republic of North Macedonia", "Macedonia"]),
    country!("ML", "MLI", "Mali", ["Republic of Mali"]),
    country!("MT", "MLT", "Malta", ["Republic of Malta"]),
    country!("MM", "MMR", "Myanmar", ["Republic of Myanmar", "Burma"]),
    country!("ME", "MNE", "Montenegro"),
    country!("MN", "MNG", "Mongolia"),
    country!("MP", "MNP", "Northern Mariana Islands", ["Commonwealth of the Northern Mariana Islands"]),
    country!("MZ", "MOZ", "Mozambique", ["Republic of Mozambique"]),
    country!("MR", "MRT", "Mauritania", ["Islamic Republic of Mauritania"]),
    country!("MS", "MSR", "Montserrat"),
    country!("MQ", "MTQ", "Martinique"),
    country!("MU", "MUS", "Mauritius", ["Republic of Mauritius"]),
    country!("MW", "MWI", "Malawi", ["Republic of Malawi"]),
    country!("MY", "MYS", "Malaysia"),
    country!("YT", "MYT", "Mayotte"),
    country!("NA", "NAM", "Namibia", ["Republic of Namibia"]),
    country!("NC", "NCL", "New Caledonia"),
    country!("NE", "NER", "Niger", ["Republic of the Niger"]),
    country!("NF", "NFK", "Norfolk Island"),
    country!("NG", "NGA", "Nigeria", ["Federal Republic of Nigeria"]),
    country!("NI", "NIC", "Nicaragua", ["Republic of Nicaragua"]),
    country!("NU", "NIU", "Niue"),
    country!("NL", "NLD", "Netherlands", ["Kingdom of the Netherlands", "The Netherlands", "Nederland"]),
    country!("NO", "NOR", "Norway", ["Kingdom of Norway", "Norge"]),
    country!("NP", "NPL", "Nepal", ["Federal Democratic Republic of Nepal"]),
    country!("NR", "NRU", "Nauru", ["Republic of Nauru"]),
    country!("NZ", "NZL", "New Zealand"),
    country!("OM", "OMN", "Oman", ["Sultanate of Oman"]),
    country!("PK", "PAK", "Pakistan", ["Islamic Republic of Pakistan"]),
    country!("PA", "PAN", "Panama", ["Republic of Panama"]),
    country!("PN", "PCN", "Pitcairn"),
    country!("PE", "PER", "Peru", ["Republic of Peru"]),
    country!("PH", "PHL", "Philippines", ["Republic of the Philippines"]),
    country!("PW", "PLW", "Palau", ["Republic of Palau"]),
    country!("PG", "PNG", "Papua New Guinea", ["Independent State of Papua New Guinea"]),
    country!("PL", "POL", "Poland", ["Republic of Poland", "Polska"]),
    country!("PR", "PRI", "Puerto Rico"),
    country!("KP", "PRK", "Korea, Democratic People's Republic of", ["North Korea", "Democratic People's Republic of Korea"]),
    country!("PT", "PRT", "Portugal", ["Portuguese Republic"]),
    country!("PY", "PRY", "Paraguay", ["Republic of Paraguay"]),
    country!("PS", "PSE", "Palestine, State of", ["the State of Palestine", "Palestine", "Palestinian Territory", "Palestinian Territories"]),
    country!("PF", "PYF", "French Polynesia"),
    country!("QA", "QAT", "Qatar", ["State of Qatar"]),
    country!("RE", "REU", "Réunion"),
    country!("RO", "ROU", "Romania", ["România"]),
    country!("RU", "RUS", "Russian Federation", ["Russia"]),
    country!("RW", "RWA", "Rwanda", ["Rwandese Republic"]),
    country!("SA", "SAU", "Saudi Arabia", ["Kingdom of Saudi Arabia"]),
    country!("SD", "SDN", "Sudan", ["Republic of the Sudan"]),
    country!("SN", "SEN", "Senegal", ["Republic of Senegal", "Sénégal"]),
    country!("SG", "SGP", "Singapore", ["Republic of Singapore"]),
    country!("GS", "SGS", "South Georgia and the South Sandwich Islands"),
    country!("SH", "SHN", "Saint Helena, Ascension and Tristan da Cunha"),
    country!("SJ", "SJM", "Svalbard and Jan Mayen"),
    country!("SB", "SLB", "Solomon Islands"),
    country!("SL", "SLE", "Sierra Leone", ["Republic of Sierra Leone"]),
    country!("SV", "SLV", "El Salvador", ["Republic of El Salvador"]),
    country!("SM", "SMR", "San Marino", ["Republic of San Marino"]),
    country!("SO", "SOM", "Somalia", ["Federal Republic of Somalia"]),
    country!("PM", "SPM", "Saint Pierre and Miquelon"),
    country!("RS", "SRB", "Serbia", ["Republic of Serbia"]),
    country!("SS", "SSD", "South Sudan", ["Republic of South Sudan"]),
    country!("ST", "STP", "Sao Tome and Principe", ["Democratic Republic of Sao Tome and Principe", "São Tomé and Príncipe"]),
    country!("SR", "SUR", "Suriname", ["Republic of Suriname"]),
    country!("SK", "SVK", "Slovakia", ["Slovak Republic"]),
    country!("SI", "SVN", "Slovenia", ["Republic of Slovenia"]),
    country!("SE", "SWE", "Sweden", ["Kingdom of Sweden", "Sverige"]),
    country!("SZ", "SWZ", "Eswatini", ["Kingdom of Eswatini", "Swaziland"]),
    country!("SX", "SXM", "Sint Maarten (Dutch part)"),
    country!("SC", "SYC", "Seychelles", ["Republic of Seychelles"]),
    country!("SY", "SYR", "Syrian Arab Republic", ["Syria"]),
    country!("TC", "TCA", "Turks and Caicos Islands"),
    country!("TD", "TCD", "Chad", ["Republic of Chad"]),
    country!("TG", "TGO", "Togo", ["Togolese Republic"]),
    country!("TH", "THA", "Thailand", ["Kingdom of Thailand"]),
    country!("TJ", "TJK", "Tajikistan", ["Republic of Tajikistan"]),
    country!("TK", "TKL", "Tokelau"),
    country!("TM", "TKM", "Turkmenistan"),
    country!("TL", "TLS", "Timor-Leste", ["Democratic Republic of Timor-Leste", "East Timor"]),
    country!("TO", "TON", "Tonga", ["Kingdom of Tonga"]),
    country!("TT", "TTO", "Trinidad and Tobago", ["Republic of Trinidad and Tobago"]),
    country!("TN", "TUN", "Tunisia", ["Republic of Tunisia"]),
    country!("TR", "TUR", "Türkiye", ["Republic of Türkiye", "Turkey"]),
    country!("TV", "TUV", "Tuvalu"),
    country!("TW", "TWN", "Taiwan, Province of China", ["Taiwan"]),
    country!("TZ", "TZA", "Tanzania, United Republic of", ["Tanzania", "United Republic of Tanzania"]),
    country!("UG", "UGA", "Uganda", ["Republic of Uganda"]),
    country!("UA", "UKR", "Ukraine"),
    country!("UM", "UMI", "United States Minor Outlying Islands"),
    country!("UY", "URY", "Uruguay", ["Eastern Republic of Uruguay"]),
    country!("US", "USA", "United States", ["United States of America", "USA"]),
    country!("UZ", "UZB", "Uzbekistan", ["Republic of Uzbekistan"]),
    country!("VA", "VAT", "Holy See (Vatican City State)", ["Vatican City", "Holy See"]),
    country!("VC", "VCT", "Saint Vincent and the Grenadines"),
    country!("VE", "VEN", "Venezuela, Bolivarian Republic of", ["Venezuela", "Bolivarian Republic of Venezuela"]),
    country!("VG", "VGB", "Virgin Islands, British", ["British Virgin Islands"]),
    country!("VI", "VIR", "Virgin Islands, U.S.", ["Virgin Islands of the United States"]),
    country!("VN", "VNM", "Viet Nam", ["Socialist Republic of Viet Nam", "Vietnam"]),
    country!("VU", "VUT", "Vanuatu", ["Republic of Vanuatu"]),
    country!("WF", "WLF", "Wallis and Futuna"),
    country!("WS", "WSM", "Samoa", ["Independent State of Samoa"]),
    country!("YE", "YEM", "Yemen", ["Republic of Yemen"]),
    country!("ZA", "ZAF", "South Africa", ["Republic of South Africa"]),
    country!("ZM", "ZMB", "Zambia", ["Republic of Zambia"]),
    country!("ZW", "ZWE", "Zimbabwe", ["Republic of Zimbabwe"]),
];

/// Lowercased code/name/alias -> table entry
fn index() -> &'static HashMap<String, &'static Country> {
    static INDEX: OnceLock<HashMap<String, &'static Country>> = OnceLock::new();
    INDEX.get_or_init(|| {
        let mut map = HashMap::new();
        for country in COUNTRIES {
            let keys = [country.alpha2, country.alpha3, country.name]
                .into_iter()
                .chain(country.aliases.iter().copied());
            for key in keys {
                map.entry(key.to_lowercase()).or_insert(country);
            }
        }
        map
    })
}

/// Look up a country by code, name or alias (case-insensitive)
pub fn lookup(query: &str) -> Option<&'static Country> {
    let key = query.trim().to_lowercase();
    if key.is_empty() {
        return None;
    }
    index().get(&key).copied()
}

/// Maps raw country strings to canonical names, remembering past answers
#[derive(Debug, Default)]
pub struct CountryNormalizer {
    cache: HashMap<String, String>,
}

impl CountryNormalizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Canonical name for `raw`, or `raw` itself when it is not a known country
    pub fn normalize(&mut self, raw: &str) -> String {
        if let Some(hit) = self.cache.get(raw) {
            return hit.clone();
        }

        let canonical = match lookup(raw) {
            Some(country) => country.name.to_string(),
            None => {
                if raw != UNKNOWN_COUNTRY {
                    warn!("Could not standardize country name: {}", raw);
                }
                raw.to_string()
            }
        };

        self.cache.insert(raw.to_string(), canonical.clone());
        canonical
    }

    #[cfg(test)]
    pub fn cached(&self) -> usize {
        self.cache.len()
    }
}
