//! Post-classification filters applied by the pipeline, in this order:
//! exclusion, recency, whitepaper, free-text query.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::RunError;
use crate::ingest::types::RawItem;

/// Items older than this are never shown, whatever window was asked for.
pub const RECENCY_CEILING_DAYS: i64 = 365;

const EXCLUDE_WORDS: &[&str] = &[
    "職員募集",
    "採用",
    "求人",
    "人事",
    "採用情報",
    "インターン",
    "説明会",
    "セミナー",
    "ウェビナー",
    "イベント",
    "メンテナンス",
    "障害",
    "停止",
    "入札",
    "recruitment",
    "hiring",
    "job opening",
    "career",
    "internship",
    "seminar",
    "webinar",
    "maintenance",
    "outage",
];

const WHITEPAPER_WORDS: &[&str] = &["白書", "ホワイトペーパー", "white paper"];

/// Look-back window in days: one of 7, 30, 90, 180, 365.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct DayWindow(u32);

impl DayWindow {
    pub const CHOICES: [u32; 5] = [7, 30, 90, 180, 365];

    pub fn days(&self) -> u32 {
        self.0
    }
}

impl Default for DayWindow {
    fn default() -> Self {
        DayWindow(30)
    }
}

impl TryFrom<u32> for DayWindow {
    type Error = RunError;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        if Self::CHOICES.contains(&days) {
            Ok(DayWindow(days))
        } else {
            Err(RunError::InvalidDayWindow(days))
        }
    }
}

impl From<DayWindow> for u32 {
    fn from(w: DayWindow) -> u32 {
        w.0
    }
}

fn haystack(item: &RawItem) -> String {
    format!("{}\n{}", item.title, item.summary)
}

/// Recruitment, events, outages, tenders and similar noise.
pub fn should_exclude(item: &RawItem) -> bool {
    let hay = haystack(item).to_lowercase();
    EXCLUDE_WORDS.iter().any(|w| hay.contains(w))
}

/// `published_at` within the window, or within the 365-day ceiling. Undated items fail.
pub fn within_recency(item: &RawItem, now: DateTime<Utc>, window: DayWindow) -> bool {
    let Some(ts) = item.published_at else {
        return false;
    };
    let window_start = now - Duration::days(i64::from(window.days()));
    let ceiling_start = now - Duration::days(RECENCY_CEILING_DAYS);
    ts >= window_start || ts >= ceiling_start
}

/// Case-sensitive, like the labels it looks for.
pub fn is_whitepaper(item: &RawItem) -> bool {
    let hay = haystack(item);
    WHITEPAPER_WORDS.iter().any(|w| hay.contains(w))
}

/// Blank queries match everything.
pub fn matches_query(item: &RawItem, query: &str) -> bool {
    let q = query.trim().to_lowercase();
    if q.is_empty() {
        return true;
    }
    [&item.title, &item.summary, &item.source]
        .iter()
        .any(|field| field.to_lowercase().contains(&q))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::types::Region;

    fn item(title: &str, summary: &str, age_days: Option<i64>, now: DateTime<Utc>) -> RawItem {
        RawItem {
            source: "金融庁 新着".into(),
            source_id: "fsa_news".into(),
            region: Region::Jp,
            title: title.into(),
            link: "https://www.fsa.go.jp/".into(),
            summary: summary.into(),
            published_at: age_days.map(|d| now - Duration::days(d)),
            document_type: None,
        }
    }

    #[test]
    fn day_window_accepts_only_fixed_choices() {
        assert_eq!(DayWindow::try_from(90).map(|w| w.days()), Ok(90));
        assert_eq!(
            DayWindow::try_from(14),
            Err(RunError::InvalidDayWindow(14))
        );
        assert!(serde_json::from_str::<DayWindow>("45").is_err());
        assert_eq!(serde_json::from_str::<DayWindow>("7").unwrap().days(), 7);
    }

    #[test]
    fn recency_keeps_the_365_day_relaxation() {
        let now = Utc::now();
        let w30 = DayWindow::try_from(30).unwrap();
        assert!(within_recency(&item("a", "", Some(3), now), now, w30));
        assert!(within_recency(&item("a", "", Some(200), now), now, w30));
        assert!(!within_recency(&item("a", "", Some(400), now), now, w30));
        assert!(!within_recency(&item("a", "", None, now), now, w30));
    }

    #[test]
    fn exclusion_words() {
        let now = Utc::now();
        assert!(should_exclude(&item("2025年度 採用説明会のご案内", "", Some(1), now)));
        assert!(should_exclude(&item("Notice", "Planned MAINTENANCE window", Some(1), now)));
        assert!(!should_exclude(&item("有価証券届出書の提出について", "", Some(1), now)));
    }

    #[test]
    fn whitepaper_is_case_sensitive() {
        let now = Utc::now();
        assert!(is_whitepaper(&item("令和6年版 金融白書", "", Some(1), now)));
        assert!(is_whitepaper(&item("x", "a white paper on tokenisation", Some(1), now)));
        assert!(!is_whitepaper(&item("White Paper", "", Some(1), now)));
    }

    #[test]
    fn query_matches_title_summary_or_source() {
        let now = Utc::now();
        let it = item("Stablecoin guidance", "Draft text", Some(1), now);
        assert!(matches_query(&it, "  STABLECOIN "));
        assert!(matches_query(&it, "draft"));
        assert!(matches_query(&it, "金融庁"));
        assert!(matches_query(&it, "   "));
        assert!(!matches_query(&it, "merger"));
    }
}
