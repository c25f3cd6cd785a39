use std::cmp::Ordering;
use std::collections::BTreeSet;

use serde::Serialize;
use tracing::warn;

use crate::catalog::Catalog;
use crate::embedding::cosine_similarity;
use crate::{JobRecord, UserQuery};

/// ランキング設定
#[derive(Debug, Clone)]
pub struct RankerConfig {
    /// 返却件数
    pub top_n: usize,
    /// 候補に残す適合確率のしきい値
    pub suitability_threshold: f32,
    /// 特徴空間類似度の重み
    pub feature_weight: f32,
    /// テキスト類似度の重み
    pub text_weight: f32,
}

impl Default for RankerConfig {
    fn default() -> Self {
        Self {
            top_n: 5,
            suitability_threshold: 0.5,
            feature_weight: 0.5,
            text_weight: 0.5,
        }
    }
}

/// ランキング結果の1件。外部（プロフィールストア側アプリ）へは
/// 元の列ヘッダ + スコア2種でシリアライズされる。
#[derive(Debug, Clone, Serialize)]
pub struct RankedJob {
    #[serde(flatten)]
    pub job: JobRecord,
    #[serde(rename = "combinedScore")]
    pub combined_score: f32,
    #[serde(rename = "textSimilarityScore")]
    pub text_similarity: f32,
}

pub struct Ranker {
    config: RankerConfig,
}

impl Ranker {
    pub fn new(config: RankerConfig) -> Self {
        Self { config }
    }

    /// 適合確率と給与カテゴリで候補を絞り込み、特徴空間類似度と
    /// テキスト類似度のブレンドで上位 top_n 件を返す。
    ///
    /// 同点は元のカタログ行順を保つ（stable sort）。
    pub fn rank(
        &self,
        catalog: &Catalog,
        job_features: &[Vec<f32>],
        user_vector: &[f32],
        suitability: &[f32],
        text_similarities: &[f32],
        query: &UserQuery,
    ) -> Vec<RankedJob> {
        let candidates = self.select_candidates(catalog, suitability, text_similarities, query);

        let mut scored: Vec<(usize, f32)> = candidates
            .into_iter()
            .map(|index| {
                let feature_similarity = cosine_similarity(user_vector, &job_features[index]);
                let combined = (self.config.feature_weight * feature_similarity
                    + self.config.text_weight * text_similarities[index])
                    .clamp(0.0, 1.0);
                (index, combined)
            })
            .collect();

        // stable sort: 同点は候補の行順（= カタログ行順）のまま
        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));

        scored
            .into_iter()
            .take(self.config.top_n)
            .map(|(index, combined_score)| RankedJob {
                job: catalog.jobs()[index].clone(),
                combined_score,
                text_similarity: text_similarities[index],
            })
            .collect()
    }

    /// しきい値通過かつ給与カテゴリ一致の行を候補にする。top_n 件に満たない
    /// 場合はテキスト類似度上位 top_n 件を合流させる（重複排除、行順維持）。
    fn select_candidates(
        &self,
        catalog: &Catalog,
        suitability: &[f32],
        text_similarities: &[f32],
        query: &UserQuery,
    ) -> Vec<usize> {
        let query_salary_category = query.salary_category();
        let jobs = catalog.jobs();

        let filtered: Vec<usize> = (0..jobs.len())
            .filter(|&index| {
                suitability[index] > self.config.suitability_threshold
                    && jobs[index].salary_category == query_salary_category
            })
            .collect();

        if filtered.len() >= self.config.top_n {
            return filtered;
        }

        warn!(
            found = filtered.len(),
            top_n = self.config.top_n,
            "few suitable jobs found; widening with high text-similarity candidates"
        );

        let mut order: Vec<usize> = (0..jobs.len()).collect();
        order.sort_by(|&a, &b| {
            text_similarities[a]
                .partial_cmp(&text_similarities[b])
                .unwrap_or(Ordering::Equal)
        });

        let mut widened: BTreeSet<usize> = filtered.into_iter().collect();
        widened.extend(order.iter().rev().take(self.config.top_n));
        widened.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ExperienceLevel, SalaryCategory};

    fn job(title: &str, salary: f64) -> JobRecord {
        JobRecord {
            title: title.into(),
            company: "Acme".into(),
            industry: "Software".into(),
            required_skills: "misc".into(),
            location: "Remote".into(),
            experience_level: ExperienceLevel::Entry,
            salary,
            salary_category: SalaryCategory::from_salary(salary),
        }
    }

    fn query() -> UserQuery {
        UserQuery::new("technology", "python", "engineer", 45_000.0, 1.0)
    }

    /// one-hot 風の素朴な特徴行列（ユーザは1行目と同一ベクトル）
    fn fixture() -> (Catalog, Vec<Vec<f32>>, Vec<f32>) {
        let catalog = Catalog::from_records(vec![
            job("Software Engineer", 45_000.0),
            job("Backend Developer", 45_000.0),
            job("Data Scientist", 95_000.0),
            job("Nurse", 45_000.0),
        ]);
        let features = vec![
            vec![1.0, 0.0, 0.0, 1.0],
            vec![0.0, 1.0, 0.0, 1.0],
            vec![0.0, 0.0, 1.0, 0.0],
            vec![0.0, 1.0, 1.0, 0.0],
        ];
        let user_vector = vec![1.0, 0.0, 0.0, 1.0];
        (catalog, features, user_vector)
    }

    #[test]
    fn filters_by_suitability_and_salary_category() {
        let (catalog, features, user_vector) = fixture();
        let ranker = Ranker::new(RankerConfig {
            top_n: 1,
            ..RankerConfig::default()
        });

        // 行0 のみしきい値と給与カテゴリの両方を満たす
        let suitability = vec![0.9, 0.4, 0.9, 0.2];
        let text_similarities = vec![0.8, 0.5, 0.6, 0.1];

        let ranked = ranker.rank(
            &catalog,
            &features,
            &user_vector,
            &suitability,
            &text_similarities,
            &query(),
        );

        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].job.title, "Software Engineer");
    }

    #[test]
    fn widens_candidates_when_filter_is_too_strict() {
        let (catalog, features, user_vector) = fixture();
        let ranker = Ranker::new(RankerConfig::default());

        // 全行しきい値未満 → テキスト類似度上位 top_n 件へ拡大
        let suitability = vec![0.1, 0.1, 0.1, 0.1];
        let text_similarities = vec![0.8, 0.5, 0.6, 0.1];

        let ranked = ranker.rank(
            &catalog,
            &features,
            &user_vector,
            &suitability,
            &text_similarities,
            &query(),
        );

        assert_eq!(ranked.len(), 4);
        assert_eq!(ranked[0].job.title, "Software Engineer");
    }

    #[test]
    fn output_length_is_min_of_top_n_and_candidates() {
        let (catalog, features, user_vector) = fixture();
        let suitability = vec![0.9, 0.9, 0.9, 0.9];
        let text_similarities = vec![0.8, 0.5, 0.6, 0.1];

        let two = Ranker::new(RankerConfig {
            top_n: 2,
            ..RankerConfig::default()
        })
        .rank(
            &catalog,
            &features,
            &user_vector,
            &suitability,
            &text_similarities,
            &query(),
        );
        assert_eq!(two.len(), 2);

        let ten = Ranker::new(RankerConfig {
            top_n: 10,
            ..RankerConfig::default()
        })
        .rank(
            &catalog,
            &features,
            &user_vector,
            &suitability,
            &text_similarities,
            &query(),
        );
        assert_eq!(ten.len(), 4);
    }

    #[test]
    fn combined_scores_are_clamped_to_unit_interval() {
        let (catalog, features, user_vector) = fixture();
        let ranker = Ranker::new(RankerConfig::default());

        // 類似度が範囲外でも combined は [0, 1] に収まる
        let suitability = vec![0.9, 0.9, 0.9, 0.9];
        let text_similarities = vec![5.0, -3.0, 1.2, -0.2];

        let ranked = ranker.rank(
            &catalog,
            &features,
            &user_vector,
            &suitability,
            &text_similarities,
            &query(),
        );

        assert!(!ranked.is_empty());
        for entry in &ranked {
            assert!((0.0..=1.0).contains(&entry.combined_score));
        }
    }

    #[test]
    fn sorts_descending_and_keeps_catalog_order_on_ties() {
        let (catalog, features, user_vector) = fixture();
        let ranker = Ranker::new(RankerConfig::default());

        // 行1 (feat 0.5 + text 0.4) と行3 (feat 0.0 + text 0.9) が combined 同点
        let suitability = vec![0.9, 0.9, 0.9, 0.9];
        let text_similarities = vec![0.9, 0.4, 0.2, 0.9];

        let ranked = ranker.rank(
            &catalog,
            &features,
            &user_vector,
            &suitability,
            &text_similarities,
            &query(),
        );

        for pair in ranked.windows(2) {
            assert!(pair[0].combined_score >= pair[1].combined_score);
        }
        let backend = ranked.iter().position(|r| r.job.title == "Backend Developer");
        let nurse = ranked.iter().position(|r| r.job.title == "Nurse");
        assert!(backend.unwrap() < nurse.unwrap());
    }
}
