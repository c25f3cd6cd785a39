use tracing::warn;

use crate::classifier::{ForestConfig, RandomForest};

/// クエリごとの適合確率スコアリング。状態を持たない: 学習器は呼び出しごとに
/// 新規作成・破棄され、リクエスト間で共有されない（ラベルがクエリ依存のため）。
///
/// ラベルが単一クラスしか含まない場合は正クラスの確率を取り出せないため、
/// 生のテキスト類似度ベクトルをそのままスコアとして代用する（エラーにしない）。
pub fn score_suitability(
    features: &[Vec<f32>],
    labels: &[usize],
    text_similarities: &[f32],
    config: &ForestConfig,
) -> Vec<f32> {
    let has_positive = labels.iter().any(|&label| label == 1);
    let has_negative = labels.iter().any(|&label| label == 0);
    if !(has_positive && has_negative) {
        warn!("only one label class present; falling back to text similarity");
        return text_similarities.to_vec();
    }

    match RandomForest::fit(features, labels, config) {
        Ok(forest) => forest
            .predict_proba(features)
            .iter()
            .map(|probabilities| probabilities[1])
            .collect(),
        Err(err) => {
            warn!(error = %err, "classifier training failed; falling back to text similarity");
            text_similarities.to_vec()
        }
    }
}
