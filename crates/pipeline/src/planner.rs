//! Publication planning: when, where, and how prominently to publish.

use chrono::{NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};

/// Hours at which news traffic peaks, in ascending order.
const PEAK_HOURS: [u32; 3] = [8, 12, 18];
const PROMOTION_HOURS: u32 = 12;
const HIGH_PRIORITY_WORDS: usize = 500;
const LONG_FORM_WORDS: usize = 1000;
const MANY_SEGMENTS: usize = 20;
const HIGH_SEO_PRIORITY: f64 = 0.6;
const REACH_CONFIDENCE: f64 = 0.5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriorityLevel {
    Normal,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionStrategy {
    pub channels: Vec<String>,
    pub social_platforms: Vec<String>,
    pub promotion_hours: u32,
    pub priority: PriorityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeoPriority {
    /// In `[0, 1]`, rounded to two decimals.
    pub score: f64,
    pub level: PriorityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReachEstimate {
    pub estimated_views: u32,
    pub estimated_shares: u32,
    pub confidence: f64,
}

/// Output of the publication planner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicationPlan {
    pub publication_date: NaiveDate,
    /// Next peak hour today. Past the last peak this is the first peak hour
    /// while the date stays today.
    pub publication_time: NaiveTime,
    pub final_categories: Vec<String>,
    pub final_tags: Vec<String>,
    /// Whether the article will be published automatically when ready.
    pub auto_publish: bool,
    pub distribution: DistributionStrategy,
    pub seo_priority: SeoPriority,
    pub expected_reach: ReachEstimate,
}

/// The publication planner.
#[derive(Debug, Clone, Copy, Default)]
pub struct PublicationPlanner;

impl PublicationPlanner {
    pub fn new() -> Self {
        Self
    }

    /// Plans publication of `text` at local time `now`.
    pub fn plan(
        &self,
        text: &str,
        categories: &[String],
        tags: &[String],
        auto_publish: bool,
        now: NaiveDateTime,
    ) -> PublicationPlan {
        let words = text.split_whitespace().count();

        PublicationPlan {
            publication_date: now.date(),
            publication_time: next_peak(now.hour()),
            final_categories: categories.to_vec(),
            final_tags: tags.to_vec(),
            auto_publish,
            distribution: distribution(words),
            seo_priority: seo_priority(words, text.split('.').count()),
            expected_reach: reach(words),
        }
    }
}

fn next_peak(current_hour: u32) -> NaiveTime {
    let hour = PEAK_HOURS
        .into_iter()
        .find(|&h| h > current_hour)
        .unwrap_or(PEAK_HOURS[0]);
    NaiveTime::from_hms_opt(hour, 0, 0).unwrap_or(NaiveTime::MIN)
}

fn distribution(words: usize) -> DistributionStrategy {
    DistributionStrategy {
        channels: vec!["cms".to_string(), "social".to_string()],
        social_platforms: ["facebook", "twitter", "linkedin"]
            .into_iter()
            .map(str::to_string)
            .collect(),
        promotion_hours: PROMOTION_HOURS,
        priority: if words > HIGH_PRIORITY_WORDS {
            PriorityLevel::High
        } else {
            PriorityLevel::Normal
        },
    }
}

fn seo_priority(words: usize, segments: usize) -> SeoPriority {
    // Tenths keep the sum exact.
    let mut tenths = 0u32;
    if words > HIGH_PRIORITY_WORDS {
        tenths += 3;
    }
    if words > LONG_FORM_WORDS {
        tenths += 2;
    }
    if segments > MANY_SEGMENTS {
        tenths += 2;
    }
    let score = (f64::from(tenths.min(10)) / 10.0 * 100.0).round() / 100.0;
    SeoPriority {
        score,
        level: if score > HIGH_SEO_PRIORITY {
            PriorityLevel::High
        } else {
            PriorityLevel::Normal
        },
    }
}

fn reach(words: usize) -> ReachEstimate {
    let views = match words {
        0..=300 => 500,
        301..=800 => 1000,
        _ => 2000,
    };
    ReachEstimate {
        estimated_views: views,
        estimated_shares: views / 10,
        confidence: REACH_CONFIDENCE,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 5, 4)
            .unwrap()
            .and_hms_opt(hour, 30, 0)
            .unwrap()
    }

    fn time(hour: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(hour, 0, 0).unwrap()
    }

    fn plan(text: &str, hour: u32) -> PublicationPlan {
        PublicationPlanner::new().plan(text, &["Salud".into()], &[], true, at(hour))
    }

    #[test]
    fn picks_next_peak_hour_strictly_after_now() {
        assert_eq!(plan("text", 7).publication_time, time(8));
        assert_eq!(plan("text", 8).publication_time, time(12));
        assert_eq!(plan("text", 17).publication_time, time(18));
    }

    #[test]
    fn after_last_peak_keeps_today_at_first_peak() {
        let plan = plan("text", 21);
        assert_eq!(plan.publication_time, time(8));
        assert_eq!(plan.publication_date, at(21).date());
    }

    #[test]
    fn short_text_gets_normal_priority_and_small_reach() {
        let plan = plan("A short piece.", 9);
        assert_eq!(plan.distribution.priority, PriorityLevel::Normal);
        assert_eq!(plan.seo_priority.score, 0.0);
        assert_eq!(plan.expected_reach.estimated_views, 500);
        assert_eq!(plan.expected_reach.estimated_shares, 50);
        assert_eq!(plan.final_categories, vec!["Salud"]);
        assert!(plan.auto_publish);
    }

    #[test]
    fn long_text_raises_priority_and_reach() {
        let text = "Word word word word word. ".repeat(220);
        let plan = plan(&text, 9);
        assert_eq!(plan.distribution.priority, PriorityLevel::High);
        assert_eq!(plan.seo_priority.score, 0.7);
        assert_eq!(plan.seo_priority.level, PriorityLevel::High);
        assert_eq!(plan.expected_reach.estimated_views, 2000);
    }

    #[test]
    fn reach_bands() {
        assert_eq!(reach(300).estimated_views, 500);
        assert_eq!(reach(301).estimated_views, 1000);
        assert_eq!(reach(800).estimated_views, 1000);
        assert_eq!(reach(801).estimated_views, 2000);
    }

    #[test]
    fn seo_priority_threshold_is_exclusive() {
        let medium = seo_priority(600, 30);
        assert_eq!(medium.score, 0.5);
        assert_eq!(medium.level, PriorityLevel::Normal);
    }
}
