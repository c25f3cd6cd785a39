pub mod catalog;
pub mod classifier;
pub mod embedding;
pub mod error;
pub mod features;
pub mod labeling;
pub mod logging;
pub mod pipeline;
pub mod ranking;
pub mod scoring;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use tracing::warn;

pub use catalog::{prepare_catalog, Catalog};
pub use error::RecommendError;
pub use pipeline::{Recommender, RecommenderConfig};
pub use ranking::RankedJob;

/// 給与カテゴリ。給与額の純関数で、求人行とユーザクエリの双方に同じ関数を使う。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
pub enum SalaryCategory {
    Low,
    Medium,
    High,
}

impl SalaryCategory {
    /// しきい値: Low ≤ 50000 < Medium ≤ 80000 < High
    pub fn from_salary(salary: f64) -> Self {
        if salary <= 50_000.0 {
            SalaryCategory::Low
        } else if salary <= 80_000.0 {
            SalaryCategory::Medium
        } else {
            SalaryCategory::High
        }
    }
}

/// 経験レベル。カタログ列の文字列表現（"Entry Level" 等）と相互変換できる。
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
pub enum ExperienceLevel {
    #[serde(rename = "Entry Level")]
    #[strum(serialize = "Entry Level")]
    Entry,
    #[serde(rename = "Mid Level")]
    #[strum(serialize = "Mid Level")]
    Mid,
    #[serde(rename = "Senior Level")]
    #[strum(serialize = "Senior Level")]
    Senior,
}

impl ExperienceLevel {
    /// 経験年数バケット: 0-2 → Entry, 2-5 → Mid, 5+ → Senior
    pub fn from_years(years: f64) -> Self {
        if years <= 2.0 {
            ExperienceLevel::Entry
        } else if years <= 5.0 {
            ExperienceLevel::Mid
        } else {
            ExperienceLevel::Senior
        }
    }
}

/// 求人カタログの1レコード。クリーニング後は不変。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobRecord {
    #[serde(rename = "Job Title")]
    pub title: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Industry")]
    pub industry: String,
    #[serde(rename = "Required Skills")]
    pub required_skills: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Experience Level")]
    pub experience_level: ExperienceLevel,
    #[serde(rename = "Salary")]
    pub salary: f64,
    #[serde(rename = "Salary Category")]
    pub salary_category: SalaryCategory,
}

/// 1リクエスト分のユーザクエリ。プロフィールストア（外部）から渡される。
#[derive(Debug, Clone, PartialEq)]
pub struct UserQuery {
    pub interests: String,
    pub skills: String,
    pub profession: String,
    pub expected_salary: f64,
    pub experience_years: f64,
}

impl UserQuery {
    /// テキスト項目は小文字化・trim、数値項目は非負の有限値に丸める
    pub fn new(
        interests: impl Into<String>,
        skills: impl Into<String>,
        profession: impl Into<String>,
        expected_salary: f64,
        experience_years: f64,
    ) -> Self {
        Self {
            interests: normalize_text_field(interests.into()),
            skills: normalize_text_field(skills.into()),
            profession: normalize_text_field(profession.into()),
            expected_salary: sanitize_numeric_field(expected_salary, "expected_salary"),
            experience_years: sanitize_numeric_field(experience_years, "experience_years"),
        }
    }

    /// フォーム入力からの構築。数値として解釈できない給与・経験年数は
    /// 0.0 に倒す（リクエストは拒否しない）。
    pub fn from_form(
        interests: &str,
        skills: &str,
        profession: &str,
        expected_salary: &str,
        experience_years: &str,
    ) -> Self {
        Self::new(
            interests,
            skills,
            profession,
            parse_numeric_field(expected_salary, "expected_salary"),
            parse_numeric_field(experience_years, "experience_years"),
        )
    }

    pub fn salary_category(&self) -> SalaryCategory {
        SalaryCategory::from_salary(self.expected_salary)
    }

    pub fn experience_level(&self) -> ExperienceLevel {
        ExperienceLevel::from_years(self.experience_years)
    }
}

fn normalize_text_field(value: String) -> String {
    value.trim().to_lowercase()
}

fn sanitize_numeric_field(value: f64, field: &'static str) -> f64 {
    if value.is_finite() && value >= 0.0 {
        value
    } else {
        warn!(field, value, "non-finite or negative numeric field; defaulting to 0.0");
        0.0
    }
}

fn parse_numeric_field(raw: &str, field: &'static str) -> f64 {
    match raw.trim().parse::<f64>() {
        Ok(value) => value,
        Err(_) => {
            warn!(field, raw, "unparsable numeric field; defaulting to 0.0");
            0.0
        }
    }
}
