use std::collections::{HashMap, HashSet};

use serde::Deserialize;
use tracing::info;

use crate::{ExperienceLevel, JobRecord, SalaryCategory};

/// データ品質上の既知の除外タイトル（プレースホルダ行、大文字小文字を区別しない）
const SENTINEL_TITLE: &str = "make";

/// 生の求人行。欠損は None または空白のみの文字列。
/// 元のタブular列ヘッダ（"Job Title" 等）からそのままデシリアライズできる。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawJobRow {
    #[serde(rename = "Job Title", default)]
    pub title: Option<String>,
    #[serde(rename = "Company", default)]
    pub company: Option<String>,
    #[serde(rename = "Industry", default)]
    pub industry: Option<String>,
    #[serde(rename = "Required Skills", default)]
    pub required_skills: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "Experience Level", default)]
    pub experience_level: Option<String>,
    #[serde(rename = "Salary", default)]
    pub salary: Option<String>,
}

/// クリーニングの前後件数と除外理由の内訳
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CleaningStats {
    pub initial_rows: usize,
    pub missing_dropped: usize,
    pub sentinel_dropped: usize,
    pub duplicate_dropped: usize,
    pub cleaned_rows: usize,
}

/// クリーニング済みの求人カタログ。行は 0 起点の密なインデックスで、
/// 以降の全ステージ（特徴行列・類似度・ラベル）と行順で対応する。
#[derive(Debug, Clone)]
pub struct Catalog {
    jobs: Vec<JobRecord>,
    stats: CleaningStats,
}

impl Catalog {
    /// クリーニング済みレコードから直接構築する（プロフィールストア側で
    /// 整形済みのデータを受け取る場合用）
    pub fn from_records(jobs: Vec<JobRecord>) -> Self {
        let rows = jobs.len();
        Self {
            jobs,
            stats: CleaningStats {
                initial_rows: rows,
                cleaned_rows: rows,
                ..CleaningStats::default()
            },
        }
    }

    pub fn jobs(&self) -> &[JobRecord] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn stats(&self) -> CleaningStats {
        self.stats
    }

    /// カタログ内で最頻の業界。同数の場合は辞書順で最小の値。
    pub fn modal_industry(&self) -> Option<&str> {
        modal_value(self.jobs.iter().map(|job| job.industry.as_str()))
    }

    /// カタログ内で最頻の勤務地。同数の場合は辞書順で最小の値。
    pub fn modal_location(&self) -> Option<&str> {
        modal_value(self.jobs.iter().map(|job| job.location.as_str()))
    }
}

/// 生データをクリーニングしてカタログを構築する。
///
/// 1. 欠損フィールドのある行を除外（給与・経験レベルが解釈不能な行も欠損扱い）
/// 2. タイトルがプレースホルダ "make" の行を除外
/// 3. (タイトル, 業界, 必須スキル) の重複を除外（先勝ち）
/// 4. 給与カテゴリを付与し、0 起点で再インデックス
pub fn prepare_catalog(rows: &[RawJobRow]) -> Catalog {
    info!(rows = rows.len(), "initial dataset size");

    let mut missing_dropped = 0usize;
    let mut sentinel_dropped = 0usize;
    let mut duplicate_dropped = 0usize;
    let mut seen: HashSet<(String, String, String)> = HashSet::new();
    let mut jobs = Vec::with_capacity(rows.len());

    for row in rows {
        let Some(record) = parse_row(row) else {
            missing_dropped += 1;
            continue;
        };
        if record.title.eq_ignore_ascii_case(SENTINEL_TITLE) {
            sentinel_dropped += 1;
            continue;
        }
        let key = (
            record.title.clone(),
            record.industry.clone(),
            record.required_skills.clone(),
        );
        if !seen.insert(key) {
            duplicate_dropped += 1;
            continue;
        }
        jobs.push(record);
    }

    let stats = CleaningStats {
        initial_rows: rows.len(),
        missing_dropped,
        sentinel_dropped,
        duplicate_dropped,
        cleaned_rows: jobs.len(),
    };

    info!(
        rows = stats.cleaned_rows,
        missing = stats.missing_dropped,
        sentinel = stats.sentinel_dropped,
        duplicates = stats.duplicate_dropped,
        "cleaned dataset size"
    );

    Catalog { jobs, stats }
}

fn parse_row(row: &RawJobRow) -> Option<JobRecord> {
    let title = non_blank(row.title.as_deref())?;
    let company = non_blank(row.company.as_deref())?;
    let industry = non_blank(row.industry.as_deref())?;
    let required_skills = non_blank(row.required_skills.as_deref())?;
    let location = non_blank(row.location.as_deref())?;
    let experience_level = non_blank(row.experience_level.as_deref())?
        .parse::<ExperienceLevel>()
        .ok()?;
    let salary = non_blank(row.salary.as_deref())?.parse::<f64>().ok()?;
    if !salary.is_finite() {
        return None;
    }

    Some(JobRecord {
        title: title.to_string(),
        company: company.to_string(),
        industry: industry.to_string(),
        required_skills: required_skills.to_string(),
        location: location.to_string(),
        experience_level,
        salary,
        salary_category: SalaryCategory::from_salary(salary),
    })
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

fn modal_value<'a>(values: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(a.0)))
        .map(|(value, _)| value)
}
