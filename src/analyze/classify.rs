//! Heuristic topic classifier.
//!
//! Every signal is a row of one static table `(signal, category, weight)`:
//! - `Keywords`: `weight` per distinct listed word found in the text
//! - `Link`: host (and optionally path) of the item link contains a marker
//! - `LinkText`: host marker plus a pattern that must (or must not) match the text
//! - `Pattern`: regex over the text
//!
//! The text is `title + "\n" + summary`, lowercased. The highest score wins,
//! ties go to the category listed first in [`Category::ALL`], and a best score
//! of zero means [`Category::General`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use url::Url;

use crate::errors::RunError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    MarketsCorporate,
    PaymentsCrypto,
    SecRulemaking,
    SecEnforcement,
    FilingsDisclosure,
    MnaFinance,
    LawReform,
    General,
}

impl Category {
    /// Fixed display and tie-break order.
    pub const ALL: [Category; 8] = [
        Category::MarketsCorporate,
        Category::PaymentsCrypto,
        Category::SecRulemaking,
        Category::SecEnforcement,
        Category::FilingsDisclosure,
        Category::MnaFinance,
        Category::LawReform,
        Category::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::MarketsCorporate => "markets_corporate",
            Category::PaymentsCrypto => "payments_crypto",
            Category::SecRulemaking => "sec_rulemaking",
            Category::SecEnforcement => "sec_enforcement",
            Category::FilingsDisclosure => "filings_disclosure",
            Category::MnaFinance => "mna_finance",
            Category::LawReform => "law_reform",
            Category::General => "general",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::MarketsCorporate => "金商法・会社法",
            Category::PaymentsCrypto => "資金決済法・暗号資産",
            Category::SecRulemaking => "SECルールメイキング",
            Category::SecEnforcement => "SECエンフォースメント",
            Category::FilingsDisclosure => "開示・提出書類",
            Category::MnaFinance => "M&A・ファイナンス",
            Category::LawReform => "法令改正・制度",
            Category::General => "その他",
        }
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = RunError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == needle)
            .ok_or_else(|| RunError::UnknownCategory(s.trim().to_string()))
    }
}

enum Signal {
    Keywords(&'static [&'static str]),
    Link {
        hosts: &'static [&'static str],
        paths: &'static [&'static str],
    },
    LinkText {
        hosts: &'static [&'static str],
        pattern: Regex,
        matches: bool,
    },
    Pattern(Regex),
}

struct Rule {
    signal: Signal,
    category: Category,
    weight: i32,
}

const FILINGS_WORDS: &[&str] = &[
    "有価証券報告書",
    "有報",
    "四半期報告書",
    "半期報告書",
    "確認書",
    "変更報告書",
    "大量保有報告書",
    "臨時報告書",
    "有価証券届出書",
    "目論見書",
    "訂正届出書",
    "提出書類",
    "disclosure",
    "filing",
    "8-k",
    "10-k",
    "10-q",
    "6-k",
    "13d",
    "13g",
    "tender offer statement",
    "registration statement",
    "prospectus",
];

const MNA_WORDS: &[&str] = &[
    "m&a",
    "買収",
    "合併",
    "株式交換",
    "公開買付",
    "tob",
    "資本提携",
    "第三者割当",
    "有償割当",
    "増資",
    "資金調達",
    "社債",
    "acquisition",
    "merger",
    "tender offer",
    "financing",
    "capital raising",
    "bond",
    "equity offering",
    "private placement",
];

const LAW_REFORM_WORDS: &[&str] = &[
    "改正",
    "改定",
    "パブリックコメント",
    "政令",
    "省令",
    "告示",
    "通達",
    "法案",
    "ガイダンス",
    "amendment",
    "rulemaking",
    "guidance",
    "proposal",
    "consultation",
];

const MARKETS_WORDS: &[&str] = &[
    "金商法",
    "金融商品取引法",
    "有価証券",
    "開示",
    "上場",
    "会社法",
    "株主",
    "取締役",
    "securities",
    "disclosure",
    "ipo",
    "prospectus",
];

const PAYMENTS_WORDS: &[&str] = &[
    "資金決済",
    "暗号資産",
    "仮想通貨",
    "ステーブルコイン",
    "crypto",
    "blockchain",
    "stablecoin",
    "payment services",
];

const SEC_RULEMAKING_WORDS: &[&str] = &[
    "proposed rule",
    "final rule",
    "rulemaking",
    "release no.",
    "file no.",
];

const SEC_ENFORCEMENT_WORDS: &[&str] = &[
    "litigation release",
    "enforcement",
    "complaint",
    "settled",
    "sanction",
];

fn re(pattern: &str) -> Regex {
    Regex::new(pattern).unwrap()
}

static RULES: Lazy<Vec<Rule>> = Lazy::new(|| {
    use Category::*;
    let rule = |signal, category, weight| Rule {
        signal,
        category,
        weight,
    };
    vec![
        // keyword lists
        rule(Signal::Keywords(FILINGS_WORDS), FilingsDisclosure, 1),
        rule(Signal::Keywords(MNA_WORDS), MnaFinance, 1),
        rule(Signal::Keywords(LAW_REFORM_WORDS), LawReform, 1),
        rule(Signal::Keywords(MARKETS_WORDS), MarketsCorporate, 1),
        rule(Signal::Keywords(PAYMENTS_WORDS), PaymentsCrypto, 1),
        rule(Signal::Keywords(SEC_RULEMAKING_WORDS), SecRulemaking, 1),
        rule(Signal::Keywords(SEC_ENFORCEMENT_WORDS), SecEnforcement, 1),
        // where the item comes from
        rule(
            Signal::Link {
                hosts: &["public-comment.e-gov.go.jp"],
                paths: &[],
            },
            LawReform,
            3,
        ),
        rule(
            Signal::Link {
                hosts: &["sec.gov"],
                paths: &["browse-edgar", "edgar"],
            },
            FilingsDisclosure,
            4,
        ),
        rule(
            Signal::Link {
                hosts: &["esma.europa.eu", "eba.europa.eu"],
                paths: &[],
            },
            LawReform,
            2,
        ),
        rule(
            Signal::LinkText {
                hosts: &["fsa.go.jp"],
                pattern: re(r"(有価証券|届出|提出|目論見書|disclosure|filing)"),
                matches: true,
            },
            FilingsDisclosure,
            2,
        ),
        rule(
            Signal::LinkText {
                hosts: &["fsa.go.jp"],
                pattern: re(r"(有価証券|届出|提出|目論見書|disclosure|filing)"),
                matches: false,
            },
            LawReform,
            1,
        ),
        // strong patterns
        rule(
            Signal::Pattern(re(
                r"(?i)(8-k|10-k|10-q|6-k|13d|13g|tender offer|registration statement|prospectus|届出書|目論見書|有価証券報告書|大量保有報告)",
            )),
            FilingsDisclosure,
            3,
        ),
        rule(
            Signal::Pattern(re(
                r"(?i)(公開買付|tob|買収|合併|資金調達|第三者割当|増資|bond|equity offering|acquisition|merger)",
            )),
            MnaFinance,
            3,
        ),
        rule(
            Signal::Pattern(re(
                r"(?i)(意見募集|意見公募|結果公示|改正|rulemaking|guidance|consultation)",
            )),
            LawReform,
            2,
        ),
        rule(
            Signal::Pattern(re(r"(?i)(litigation release|enforcement|課徴金|行政処分)")),
            SecEnforcement,
            3,
        ),
    ]
});

/// Lowercased host and `path?query` of a link; `None` when it does not parse.
fn link_parts(link: &str) -> Option<(String, String)> {
    let url = Url::parse(link.trim()).ok()?;
    let host = url.host_str()?.to_lowercase();
    let mut path = url.path().to_lowercase();
    if let Some(q) = url.query() {
        path.push('?');
        path.push_str(q);
    }
    Some((host, path))
}

impl Signal {
    fn score(&self, text: &str, link: Option<&(String, String)>) -> i32 {
        let host_has = |hosts: &[&str]| {
            link.map(|(h, _)| hosts.iter().any(|m| h.contains(m)))
                .unwrap_or(false)
        };
        match self {
            Signal::Keywords(words) => words.iter().filter(|w| text.contains(*w)).count() as i32,
            Signal::Link { hosts, paths } => {
                let path_ok = paths.is_empty()
                    || link
                        .map(|(_, p)| paths.iter().any(|m| p.contains(m)))
                        .unwrap_or(false);
                i32::from(host_has(hosts) && path_ok)
            }
            Signal::LinkText {
                hosts,
                pattern,
                matches,
            } => i32::from(host_has(hosts) && pattern.is_match(text) == *matches),
            Signal::Pattern(p) => i32::from(p.is_match(text)),
        }
    }
}

/// Per-category scores in [`Category::ALL`] order.
pub fn score_breakdown(title: &str, summary: &str, link: &str) -> [(Category, i32); 8] {
    let text = format!("{title}\n{summary}").to_lowercase();
    let parts = link_parts(link);
    let mut scores = Category::ALL.map(|c| (c, 0));
    for rule in RULES.iter() {
        let hits = rule.signal.score(&text, parts.as_ref());
        scores[rule.category.index()].1 += hits * rule.weight;
    }
    scores
}

pub fn classify(title: &str, summary: &str, link: &str) -> Category {
    let mut best = (Category::General, 0);
    for (cat, score) in score_breakdown(title, summary, link) {
        if score > best.1 {
            best = (cat, score);
        }
    }
    best.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn score_of(scores: &[(Category, i32); 8], cat: Category) -> i32 {
        scores[cat.index()].1
    }

    #[test]
    fn japanese_filing_notice() {
        let s = score_breakdown("有価証券届出書の提出について", "", "");
        assert_eq!(score_of(&s, Category::FilingsDisclosure), 4);
        assert_eq!(score_of(&s, Category::MarketsCorporate), 1);
        assert_eq!(
            classify("有価証券届出書の提出について", "", ""),
            Category::FilingsDisclosure
        );
    }

    #[test]
    fn tie_goes_to_earlier_category() {
        let title = "Proposed Rule: Amendments to Regulation S-K";
        let s = score_breakdown(title, "", "");
        assert_eq!(score_of(&s, Category::SecRulemaking), 1);
        assert_eq!(score_of(&s, Category::LawReform), 1);
        assert_eq!(classify(title, "", ""), Category::SecRulemaking);
    }

    #[test]
    fn nothing_matches_is_general() {
        assert_eq!(classify("Weekly schedule", "", "not a url"), Category::General);
        assert_eq!(classify("", "", ""), Category::General);
    }

    #[test]
    fn link_heuristics() {
        assert_eq!(
            classify(
                "Current filings",
                "",
                "https://www.sec.gov/cgi-bin/browse-edgar?action=getcurrent"
            ),
            Category::FilingsDisclosure
        );
        assert_eq!(
            classify("案件一覧", "", "https://public-comment.e-gov.go.jp/servlet/Public"),
            Category::LawReform
        );
        assert_eq!(
            classify("Speech", "", "https://www.esma.europa.eu/press-news"),
            Category::LawReform
        );
        let fsa = "https://www.fsa.go.jp/news/r6/x.html";
        let s = score_breakdown("お知らせ", "", fsa);
        assert_eq!(score_of(&s, Category::LawReform), 1);
        let s = score_breakdown("書類の提出", "", fsa);
        assert_eq!(score_of(&s, Category::FilingsDisclosure), 2);
        assert_eq!(score_of(&s, Category::LawReform), 0);
    }

    #[test]
    fn enforcement_and_crypto() {
        assert_eq!(
            classify("Litigation Release No. 26000", "SEC obtains judgment", ""),
            Category::SecEnforcement
        );
        assert_eq!(
            classify("暗号資産交換業者に関する資金決済法の見直し", "", ""),
            Category::PaymentsCrypto
        );
    }

    #[test]
    fn deterministic() {
        let a = score_breakdown("Merger agreement", "bond financing", "https://x.example/");
        let b = score_breakdown("Merger agreement", "bond financing", "https://x.example/");
        assert_eq!(a, b);
        assert_eq!(
            classify("Merger agreement", "bond financing", ""),
            Category::MnaFinance
        );
    }

    #[test]
    fn category_names_and_labels() {
        assert_eq!("law_reform".parse::<Category>(), Ok(Category::LawReform));
        assert_eq!(" General ".parse::<Category>(), Ok(Category::General));
        assert!(matches!(
            "misc".parse::<Category>(),
            Err(RunError::UnknownCategory(_))
        ));
        assert_eq!(Category::General.label(), "その他");
        assert_eq!(
            serde_json::to_string(&Category::MnaFinance).unwrap(),
            "\"mna_finance\""
        );
    }
}
