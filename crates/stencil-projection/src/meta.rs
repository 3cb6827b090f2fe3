//! Metadata projection kinds accepted by `$meta`.

pub const TEXT_SCORE: &str = "textScore";
pub const RAND_VAL: &str = "randVal";
pub const SEARCH_SCORE: &str = "searchScore";
pub const SEARCH_HIGHLIGHTS: &str = "searchHighlights";
pub const GEO_NEAR_DISTANCE: &str = "geoNearDistance";
pub const GEO_NEAR_POINT: &str = "geoNearPoint";
pub const RECORD_ID: &str = "recordId";
pub const INDEX_KEY: &str = "indexKey";
pub const SORT_KEY: &str = "sortKey";

pub const KINDS: [&str; 9] = [
    TEXT_SCORE,
    RAND_VAL,
    SEARCH_SCORE,
    SEARCH_HIGHLIGHTS,
    GEO_NEAR_DISTANCE,
    GEO_NEAR_POINT,
    RECORD_ID,
    INDEX_KEY,
    SORT_KEY,
];

pub fn is_valid(kind: &str) -> bool {
    KINDS.contains(&kind)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_kinds_validate() {
        for kind in KINDS {
            assert!(is_valid(kind), "{kind}");
        }
    }

    #[test]
    fn unknown_and_miscased_kinds_do_not() {
        assert!(!is_valid("textscore"));
        assert!(!is_valid("TEXTSCORE"));
        assert!(!is_valid("score"));
        assert!(!is_valid(""));
    }
}
