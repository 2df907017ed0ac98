//! Address → population density cascade.
//!
//! Resolution order (first substring match wins, no fuzzy matching):
//! 1. Tokyo special-ward table (sub-city granularity)
//! 2. Osaka-city ward table (sub-city granularity)
//! 3. Major-city table
//! 4. Prefecture-average table
//! 5. Fixed defaults
//!
//! All values are persons/km² from the 2020 national census. The resolver
//! is deterministic and has no side effects.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Resolved density plus a provenance label for the narrative trace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DensityLookup {
    /// Persons per km², always > 0.
    pub density: u32,
    /// Human-readable provenance ("which table matched").
    pub source: String,
}

/// Free-text address → (density, provenance).
#[derive(Debug, Clone, Copy, Default)]
pub struct DensityResolver;

/// Fallback when the address is empty.
const DEFAULT_DENSITY_NO_ADDRESS: u32 = 3_000;
/// Fallback when no table matches.
const DEFAULT_DENSITY_UNRESOLVED: u32 = 1_500;
/// Tokyo prefecture average, used when "東京都" matches without a ward.
const TOKYO_AVERAGE: u32 = 6_263;
/// Osaka city average, used when "大阪市" matches without a ward.
const OSAKA_CITY_AVERAGE: u32 = 12_110;

impl DensityResolver {
    pub fn resolve(&self, address: &str) -> DensityLookup {
        let addr = address.trim();
        if addr.is_empty() {
            return DensityLookup {
                density: DEFAULT_DENSITY_NO_ADDRESS,
                source: "address missing (mid-density default)".to_string(),
            };
        }
        if addr.contains("東京都") {
            for (ward, density) in TOKYO_WARD_DENSITY {
                if addr.contains(ward) {
                    return DensityLookup {
                        density: *density,
                        source: format!("{ward} (Tokyo), 2020 census"),
                    };
                }
            }
            return DensityLookup {
                density: TOKYO_AVERAGE,
                source: "Tokyo average (ward not identified), 2020 census".to_string(),
            };
        }
        if addr.contains("大阪市") {
            for (ward, density) in OSAKA_WARD_DENSITY {
                if addr.contains(ward) {
                    return DensityLookup {
                        density: *density,
                        source: format!("Osaka {ward}, 2020 census"),
                    };
                }
            }
            return DensityLookup {
                density: OSAKA_CITY_AVERAGE,
                source: "Osaka city average (ward not identified), 2020 census".to_string(),
            };
        }
        for (city, density) in CITY_DENSITY {
            if addr.contains(city) {
                return DensityLookup {
                    density: *density,
                    source: format!("{city} average density, 2020 census"),
                };
            }
        }
        for (pref, density) in PREFECTURE_DENSITY {
            if addr.contains(pref) {
                return DensityLookup {
                    density: *density,
                    source: format!("{pref} average density, 2020 census"),
                };
            }
        }
        DensityLookup {
            density: DEFAULT_DENSITY_UNRESOLVED,
            source: "address unresolved (mid-density default 1,500/km2)".to_string(),
        }
    }
}

/// Tokyo 23 special wards, persons/km² (2020 census).
static TOKYO_WARD_DENSITY: &[(&str, u32)] = &[
    ("千代田区", 4_073),
    ("中央区", 13_762),
    ("港区", 10_649),
    ("新宿区", 18_235),
    ("文京区", 20_105),
    ("台東区", 19_419),
    ("墨田区", 19_508),
    ("江東区", 13_943),
    ("品川区", 17_617),
    ("目黒区", 18_984),
    ("大田区", 12_461),
    ("世田谷区", 16_006),
    ("渋谷区", 15_608),
    ("中野区", 20_539),
    ("杉並区", 16_524),
    ("豊島区", 22_449),
    ("北区", 17_974),
    ("荒川区", 21_222),
    ("板橋区", 17_598),
    ("練馬区", 14_587),
    ("足立区", 13_752),
    ("葛飾区", 13_802),
    ("江戸川区", 13_329),
];

/// Osaka city 24 wards, persons/km² (2020 census).
static OSAKA_WARD_DENSITY: &[(&str, u32)] = &[
    ("都島区", 13_500),
    ("福島区", 11_000),
    ("此花区", 6_700),
    ("西区", 12_500),
    ("港区", 12_000),
    ("大正区", 10_500),
    ("天王寺区", 15_500),
    ("浪速区", 15_000),
    ("西淀川区", 9_500),
    ("東淀川区", 17_000),
    ("東成区", 19_000),
    ("生野区", 18_000),
    ("旭区", 15_000),
    ("城東区", 18_000),
    ("阿倍野区", 15_500),
    ("住吉区", 14_500),
    ("東住吉区", 15_500),
    ("西成区", 18_000),
    ("淀川区", 15_500),
    ("鶴見区", 12_000),
    ("住之江区", 8_500),
    ("平野区", 13_500),
    ("北区", 9_500),
    ("中央区", 7_000),
];

/// Government-ordinance and major cities, persons/km² (2020 census).
static CITY_DENSITY: &[(&str, u32)] = &[
    ("札幌市", 1_882),
    ("仙台市", 1_510),
    ("さいたま市", 5_527),
    ("千葉市", 3_625),
    ("横浜市", 8_717),
    ("川崎市", 10_235),
    ("相模原市", 2_716),
    ("新潟市", 1_100),
    ("静岡市", 496),
    ("浜松市", 537),
    ("名古屋市", 7_138),
    ("京都市", 2_804),
    ("大阪市", 12_110),
    ("堺市", 5_219),
    ("神戸市", 2_799),
    ("岡山市", 942),
    ("広島市", 1_625),
    ("北九州市", 1_994),
    ("福岡市", 4_990),
    ("熊本市", 1_891),
    ("旭川市", 454),
    ("函館市", 566),
    ("青森市", 753),
    ("盛岡市", 757),
    ("秋田市", 629),
    ("山形市", 844),
    ("福島市", 619),
    ("郡山市", 768),
    ("いわき市", 268),
    ("水戸市", 2_122),
    ("宇都宮市", 1_255),
    ("前橋市", 966),
    ("高崎市", 1_062),
    ("川越市", 3_017),
    ("船橋市", 7_068),
    ("柏市", 4_022),
    ("八王子市", 2_584),
    ("府中市", 7_029),
    ("調布市", 8_225),
    ("町田市", 4_965),
    ("藤沢市", 5_046),
    ("横須賀市", 3_665),
    ("長野市", 648),
    ("岐阜市", 2_098),
    ("豊橋市", 2_031),
    ("豊田市", 989),
    ("岡崎市", 1_575),
    ("一宮市", 3_030),
    ("大津市", 1_070),
    ("吹田市", 10_267),
    ("高槻市", 4_898),
    ("東大阪市", 9_267),
    ("姫路市", 1_150),
    ("尼崎市", 8_116),
    ("西宮市", 3_796),
    ("奈良市", 1_087),
    ("和歌山市", 2_310),
    ("倉敷市", 849),
    ("福山市", 953),
    ("呉市", 786),
    ("下関市", 552),
    ("高松市", 1_583),
    ("松山市", 1_140),
    ("高知市", 1_106),
    ("久留米市", 2_045),
    ("長崎市", 1_641),
    ("佐世保市", 638),
    ("大分市", 861),
    ("宮崎市", 849),
    ("鹿児島市", 1_439),
    ("那覇市", 8_356),
    ("川口市", 7_230),
    ("越谷市", 5_630),
    ("草加市", 8_270),
    ("春日部市", 2_810),
    ("松戸市", 6_230),
    ("市川市", 6_610),
    ("浦安市", 10_490),
    ("市原市", 1_090),
    ("所沢市", 3_640),
    ("平塚市", 3_490),
    ("厚木市", 2_070),
    ("大和市", 6_610),
];

/// Prefecture averages, persons/km² (2020 census).
static PREFECTURE_DENSITY: &[(&str, u32)] = &[
    ("北海道", 64),
    ("青森県", 130),
    ("岩手県", 84),
    ("宮城県", 321),
    ("秋田県", 86),
    ("山形県", 116),
    ("福島県", 139),
    ("茨城県", 476),
    ("栃木県", 307),
    ("群馬県", 309),
    ("埼玉県", 1_927),
    ("千葉県", 1_211),
    ("東京都", 6_263),
    ("神奈川県", 3_810),
    ("新潟県", 179),
    ("富山県", 247),
    ("石川県", 277),
    ("福井県", 189),
    ("山梨県", 185),
    ("長野県", 155),
    ("岐阜県", 191),
    ("静岡県", 469),
    ("愛知県", 1_457),
    ("三重県", 309),
    ("滋賀県", 351),
    ("京都府", 566),
    ("大阪府", 4_631),
    ("兵庫県", 652),
    ("奈良県", 366),
    ("和歌山県", 196),
    ("鳥取県", 162),
    ("島根県", 103),
    ("岡山県", 270),
    ("広島県", 336),
    ("山口県", 224),
    ("徳島県", 184),
    ("香川県", 519),
    ("愛媛県", 241),
    ("高知県", 102),
    ("福岡県", 1_023),
    ("佐賀県", 340),
    ("長崎県", 330),
    ("熊本県", 238),
    ("大分県", 182),
    ("宮崎県", 141),
    ("鹿児島県", 179),
    ("沖縄県", 637),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_address_default() {
        let r = DensityResolver.resolve("");
        assert_eq!(r.density, 3_000);
    }

    #[test]
    fn test_tokyo_ward_match() {
        let r = DensityResolver.resolve("東京都豊島区東池袋1丁目");
        assert_eq!(r.density, 22_449);
        assert!(r.source.contains("豊島区"));
    }

    #[test]
    fn test_tokyo_without_ward_falls_back_to_average() {
        let r = DensityResolver.resolve("東京都西多摩郡");
        assert_eq!(r.density, 6_263);
    }

    #[test]
    fn test_osaka_ward_match() {
        let r = DensityResolver.resolve("大阪府大阪市天王寺区");
        assert_eq!(r.density, 15_500);
    }

    #[test]
    fn test_city_match() {
        let r = DensityResolver.resolve("神奈川県川崎市中原区新丸子東3丁目");
        assert_eq!(r.density, 10_235);
        assert!(r.source.contains("川崎市"));
    }

    #[test]
    fn test_prefecture_fallback() {
        let r = DensityResolver.resolve("長野県上田市常田2丁目");
        assert_eq!(r.density, 155);
    }

    #[test]
    fn test_unresolved_default() {
        let r = DensityResolver.resolve("Unknown Street 42");
        assert_eq!(r.density, 1_500);
    }

    #[test]
    fn test_deterministic() {
        let a = DensityResolver.resolve("東京都中央区銀座");
        let b = DensityResolver.resolve("東京都中央区銀座");
        assert_eq!(a, b);
    }

    #[test]
    fn test_all_densities_positive() {
        for (_, d) in TOKYO_WARD_DENSITY
            .iter()
            .chain(OSAKA_WARD_DENSITY)
            .chain(CITY_DENSITY)
            .chain(PREFECTURE_DENSITY)
        {
            assert!(*d > 0);
        }
    }
}
