use std::cmp::Ordering;

use tracing::{info, warn};

use crate::catalog::Catalog;
use crate::error::RecommendError;
use crate::UserQuery;

/// タイトル部分一致に使う職種キーワード（小文字比較）
pub const PROFESSION_KEYWORDS: [&str; 7] = [
    "engineer",
    "developer",
    "programmer",
    "scientist",
    "teacher",
    "educator",
    "administrator",
];

#[derive(Debug, Clone)]
pub struct LabelConfig {
    /// text_match のしきい値（生コサイン類似度に対する判定）
    pub text_match_threshold: f32,
    /// 全ラベル 0 のとき強制付与を検討する類似度上位件数
    pub forced_positive_count: usize,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self {
            text_match_threshold: 0.4,
            forced_positive_count: 5,
        }
    }
}

/// タイトルが職種キーワードのいずれかを含むか
pub fn title_matches_keywords(title: &str) -> bool {
    let lower = title.to_lowercase();
    PROFESSION_KEYWORDS
        .iter()
        .any(|keyword| lower.contains(keyword))
}

/// 求人ごとの弱ラベル（1 = 適合）をクエリに対して導出する。
///
/// ラベル規則: text_match AND title_match AND (salary_match OR exp_match)。
/// 全ラベルが 0 の場合、類似度上位のうちタイトル一致する求人を強制的に
/// 1 にする（下流の分類器に正例を最低1つ見せるため）。
///
/// 類似度の件数がカタログ行数と一致しない場合は致命的エラー（類似度計算後に
/// カタログが変更された兆候）。
pub fn derive_labels(
    catalog: &Catalog,
    query: &UserQuery,
    similarities: &[f32],
    config: &LabelConfig,
) -> Result<Vec<usize>, RecommendError> {
    if similarities.len() != catalog.len() {
        return Err(RecommendError::SimilarityCountMismatch {
            expected: catalog.len(),
            actual: similarities.len(),
        });
    }

    let user_salary_category = query.salary_category();
    let user_experience_level = query.experience_level();

    let mut labels = Vec::with_capacity(catalog.len());
    for (job, &similarity) in catalog.jobs().iter().zip(similarities) {
        let title_match = title_matches_keywords(&job.title);
        let text_match = similarity > config.text_match_threshold;
        let salary_match = job.salary_category == user_salary_category;
        let exp_match = job.experience_level == user_experience_level;

        labels.push(usize::from(
            text_match && title_match && (salary_match || exp_match),
        ));
    }

    if labels.iter().sum::<usize>() == 0 {
        apply_forced_positives(catalog, query, similarities, config, &mut labels);
    }

    let suitable: usize = labels.iter().sum();
    info!(
        suitable,
        unsuitable = labels.len() - suitable,
        "label distribution"
    );

    Ok(labels)
}

/// 類似度上位 forced_positive_count 件のうちタイトル一致する求人を 1 にする。
/// 強制正例の業界が興味とも "Software" とも一致しない場合は弱ラベル品質の
/// シグナルとして warn を出す（エラーにはしない）。
fn apply_forced_positives(
    catalog: &Catalog,
    query: &UserQuery,
    similarities: &[f32],
    config: &LabelConfig,
    labels: &mut [usize],
) {
    let mut order: Vec<usize> = (0..labels.len()).collect();
    order.sort_by(|&a, &b| {
        similarities[a]
            .partial_cmp(&similarities[b])
            .unwrap_or(Ordering::Equal)
    });

    for &index in order.iter().rev().take(config.forced_positive_count) {
        let job = &catalog.jobs()[index];
        if !title_matches_keywords(&job.title) {
            continue;
        }
        labels[index] = 1;

        if job.industry != query.interests && job.industry != "Software" {
            warn!(
                title = %job.title,
                industry = %job.industry,
                interests = %query.interests,
                "forced positive with mismatched industry"
            );
        }
    }
}
