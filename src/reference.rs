// 参考数据 - 首尔商圈地区表与业态分类目录

use crate::models::District;

/// 业态分类目录（大分类 -> 小分类，保持展示顺序）
pub const CATEGORIES: &[(&str, &[&str])] = &[
    ("음식", &["한식", "일식", "중식", "양식", "카페/디저트", "치킨", "분식"]),
    ("미용", &["헤어숍", "피부관리", "네일아트", "바버샵"]),
    ("도/소매", &["편의점", "의류점", "꽃집", "슈퍼마켓"]),
    ("교육", &["입시학원", "어학원", "예체능학원"]),
    ("오락", &["PC방", "노래방", "당구장", "스크린골프"]),
    ("서비스", &["세탁소", "부동산", "사진관", "수리점"]),
];

/// 默认选择
pub const DEFAULT_MAIN_CATEGORY: &str = "음식";
pub const DEFAULT_SUB_CATEGORY: &str = "카페/디저트";

/// (name, lat, lng, population, rent)
const SEOUL_DISTRICTS: &[(&str, f64, f64, &str, &str)] = &[
    ("강남", 37.4979, 127.0276, "85.0K", "520만원"),
    ("홍대", 37.5565, 126.9239, "72.0K", "410만원"),
    ("명동", 37.5637, 126.9846, "95.0K", "600만원"),
    ("이태원", 37.5345, 126.9941, "58.0K", "350만원"),
    ("잠실", 37.5133, 127.1001, "68.0K", "440만원"),
    ("성수", 37.5446, 127.0559, "52.0K", "420만원"),
    ("여의도", 37.5216, 126.9242, "78.0K", "480만원"),
    ("압구정", 37.5271, 127.0285, "65.0K", "550만원"),
    ("가로수길", 37.5209, 127.0227, "48.0K", "470만원"),
    ("건대입구", 37.5404, 127.0692, "70.0K", "390만원"),
    ("신촌", 37.5552, 126.9369, "62.0K", "380만원"),
    ("종로", 37.5730, 126.9794, "45.2K", "380만원"),
    ("노원", 37.6542, 127.0608, "42.0K", "280만원"),
    ("구로", 37.4835, 126.8924, "45.0K", "310만원"),
    ("서초", 37.4836, 127.0327, "56.0K", "500만원"),
];

/// 全部地区
pub fn seoul_districts() -> Vec<District> {
    SEOUL_DISTRICTS
        .iter()
        .map(|(name, lat, lng, population, rent)| District {
            name: name.to_string(),
            lat: *lat,
            lng: *lng,
            population: population.to_string(),
            rent: rent.to_string(),
        })
        .collect()
}

/// 按名称查找地区
pub fn find_district(name: &str) -> Option<District> {
    seoul_districts()
        .into_iter()
        .find(|district| district.name == name.trim())
}

/// 大分类对应的小分类列表
pub fn subcategories(main: &str) -> Option<&'static [&'static str]> {
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == main)
        .map(|(_, subs)| *subs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_is_consistent() {
        for (_, subs) in CATEGORIES {
            assert!(!subs.is_empty());
        }
        let subs = subcategories(DEFAULT_MAIN_CATEGORY).unwrap();
        assert!(subs.contains(&DEFAULT_SUB_CATEGORY));
    }

    #[test]
    fn test_find_district() {
        let district = find_district("성수").unwrap();
        assert_eq!(district.rent, "420만원");
        assert!(find_district("부산").is_none());
        assert_eq!(seoul_districts().len(), 15);
    }
}
