use thiserror::Error;

/// 推薦パイプラインの致命的エラー。
/// 局所回復できる状態（単一クラス学習、候補不足、未知カテゴリ）は
/// エラーにせず warn ログ + フォールバックで処理する。
#[derive(Debug, Error)]
pub enum RecommendError {
    /// 類似度数とカタログ行数の不一致。類似度計算後にカタログが
    /// 変更されたことを示すため、リクエストを中断する。
    #[error("similarity count mismatch: expected {expected}, got {actual}")]
    SimilarityCountMismatch { expected: usize, actual: usize },

    #[error("catalog contains no rows after cleaning")]
    EmptyCatalog,

    #[error("invalid training data: {0}")]
    InvalidTrainingData(String),
}
