use std::collections::{BTreeSet, HashMap};

use tracing::debug;

use crate::catalog::Catalog;
use crate::error::RecommendError;
use crate::{JobRecord, UserQuery};

/// 特徴ベクトル（one-hot ブロック + スケール済み給与の1列）
pub type FeatureVector = Vec<f32>;

/// ソート済み語彙による one-hot ブロック。
/// fit 時に見なかった値は全ゼロのままにする（エラーにしない）。
#[derive(Debug, Clone)]
struct OneHotBlock {
    column: &'static str,
    categories: Vec<String>,
    index: HashMap<String, usize>,
}

impl OneHotBlock {
    fn fit(column: &'static str, values: impl Iterator<Item = String>) -> Self {
        let categories: Vec<String> = values.collect::<BTreeSet<_>>().into_iter().collect();
        let index = categories
            .iter()
            .enumerate()
            .map(|(i, category)| (category.clone(), i))
            .collect();
        Self {
            column,
            categories,
            index,
        }
    }

    fn width(&self) -> usize {
        self.categories.len()
    }

    fn encode_into(&self, value: &str, out: &mut Vec<f32>) {
        let start = out.len();
        out.resize(start + self.width(), 0.0);
        match self.index.get(value) {
            Some(&offset) => out[start + offset] = 1.0,
            None => debug!(
                column = self.column,
                value, "unknown category; encoding as all-zero block"
            ),
        }
    }
}

/// 給与の zero-mean / unit-variance スケーラ（母分散）。
/// 分散 0 のときは 1.0 で割る。
#[derive(Debug, Clone)]
struct StandardScaler {
    mean: f64,
    std: f64,
}

impl StandardScaler {
    fn fit(values: impl ExactSizeIterator<Item = f64> + Clone) -> Self {
        let n = values.len() as f64;
        let mean = values.clone().sum::<f64>() / n;
        let variance = values.map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        let std = variance.sqrt();
        Self {
            mean,
            std: if std > 0.0 { std } else { 1.0 },
        }
    }

    fn transform(&self, value: f64) -> f32 {
        ((value - self.mean) / self.std) as f32
    }
}

/// カタログで一度だけ fit し、求人行とユーザ行の双方に使い回すエンコーダ。
/// 列順とスケーリングは同じ fit 済みインスタンスを共有する限り一致する。
#[derive(Debug, Clone)]
pub struct FeatureEncoder {
    experience: OneHotBlock,
    industry: OneHotBlock,
    location: OneHotBlock,
    salary_category: OneHotBlock,
    salary: StandardScaler,
}

impl FeatureEncoder {
    pub fn fit(catalog: &Catalog) -> Result<Self, RecommendError> {
        if catalog.is_empty() {
            return Err(RecommendError::EmptyCatalog);
        }
        let jobs = catalog.jobs();

        Ok(Self {
            experience: OneHotBlock::fit(
                "experience_level",
                jobs.iter().map(|job| job.experience_level.to_string()),
            ),
            industry: OneHotBlock::fit("industry", jobs.iter().map(|job| job.industry.clone())),
            location: OneHotBlock::fit("location", jobs.iter().map(|job| job.location.clone())),
            salary_category: OneHotBlock::fit(
                "salary_category",
                jobs.iter().map(|job| job.salary_category.to_string()),
            ),
            salary: StandardScaler::fit(jobs.iter().map(|job| job.salary)),
        })
    }

    /// fit して全求人行を一括変換する。行順はカタログと一致する。
    pub fn fit_transform(catalog: &Catalog) -> Result<(Vec<FeatureVector>, Self), RecommendError> {
        let encoder = Self::fit(catalog)?;
        let matrix = catalog
            .jobs()
            .iter()
            .map(|job| encoder.transform_job(job))
            .collect();
        Ok((matrix, encoder))
    }

    /// one-hot 列数 + 給与1列
    pub fn dimension(&self) -> usize {
        self.experience.width()
            + self.industry.width()
            + self.location.width()
            + self.salary_category.width()
            + 1
    }

    pub fn transform_job(&self, job: &JobRecord) -> FeatureVector {
        self.encode(
            job.experience_level.as_ref(),
            &job.industry,
            &job.location,
            job.salary_category.as_ref(),
            job.salary,
        )
    }

    /// ユーザ行の合成: 経験年数バケット + カタログ最頻の業界/勤務地 +
    /// 希望給与（クエリは業界・勤務地を持たない）
    pub fn transform_query(
        &self,
        query: &UserQuery,
        modal_industry: &str,
        modal_location: &str,
    ) -> FeatureVector {
        self.encode(
            query.experience_level().as_ref(),
            modal_industry,
            modal_location,
            query.salary_category().as_ref(),
            query.expected_salary,
        )
    }

    fn encode(
        &self,
        experience_level: &str,
        industry: &str,
        location: &str,
        salary_category: &str,
        salary: f64,
    ) -> FeatureVector {
        let mut out = Vec::with_capacity(self.dimension());
        self.experience.encode_into(experience_level, &mut out);
        self.industry.encode_into(industry, &mut out);
        self.location.encode_into(location, &mut out);
        self.salary_category.encode_into(salary_category, &mut out);
        out.push(self.salary.transform(salary));
        out
    }
}
