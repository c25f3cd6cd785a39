pub mod hash_embedder;
pub mod similarity;
pub mod tokenizer;

use chrono::{DateTime, Utc};
use tracing::warn;

pub use hash_embedder::HashEmbedder;
pub use similarity::cosine_similarity;

/// 埋め込みベクトル
#[derive(Debug, Clone)]
pub struct Embedding {
    pub vector: Vec<f32>,
    pub source: EmbeddingSource,
    pub created_at: DateTime<Utc>,
}

impl Embedding {
    pub fn dimension(&self) -> usize {
        self.vector.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingSource {
    Job,
    Query,
}

/// テキスト埋め込みモデルの抽象インターフェース
///
/// 実装:
/// - HashEmbedder: Feature Hashing（決定論的、モデルファイル不要）
///
/// 学習済みモデルを差し込む場合もこの trait を実装する。求人テキストと
/// クエリテキストは必ず同一インスタンスで埋め込むこと（次元と空間の共有）。
pub trait TextEmbedder: Send + Sync {
    /// 実装名（"hash" 等）
    fn name(&self) -> &'static str;

    /// バージョン情報（埋め込み空間の世代管理用）
    fn version(&self) -> &str;

    /// 埋め込み次元数
    fn dimension(&self) -> usize;

    /// 1テキストを埋め込みベクトルに変換
    fn embed_text(&self, text: &str, source: EmbeddingSource) -> Embedding;

    /// 複数テキストの一括埋め込み（デフォルト実装: ループ）
    fn embed_batch(&self, texts: &[String], source: EmbeddingSource) -> Vec<Embedding> {
        texts
            .iter()
            .map(|text| self.embed_text(text, source))
            .collect()
    }

    /// 2つの埋め込みベクトルのコサイン類似度（-1.0〜1.0）。
    /// 次元不一致は 0.0 を返す。
    fn similarity(&self, a: &Embedding, b: &Embedding) -> f32 {
        if a.dimension() != b.dimension() {
            warn!(
                source_a = ?a.source,
                source_b = ?b.source,
                a_dimension = a.dimension(),
                b_dimension = b.dimension(),
                "embedding dimension mismatch; returning zero similarity"
            );
            return 0.0;
        }
        cosine_similarity(&a.vector, &b.vector)
    }
}

#[derive(Debug, Clone)]
pub struct EmbedderConfig {
    /// 埋め込み次元数（2のべき乗推奨: 256, 512, 1024）
    pub dimension: usize,
}

impl Default for EmbedderConfig {
    fn default() -> Self {
        Self { dimension: 256 }
    }
}

/// 埋め込み実装のファクトリ。未知の名前は hash にフォールバックする。
pub fn create_embedder(name: &str, config: EmbedderConfig) -> Box<dyn TextEmbedder> {
    match name {
        "hash" => Box::new(HashEmbedder::new(config)),
        other => {
            warn!(embedder = other, "unknown embedder; falling back to hash");
            Box::new(HashEmbedder::new(config))
        }
    }
}

/// 環境変数から埋め込みモデルを初期化する
pub fn load_embedder_from_env() -> Box<dyn TextEmbedder> {
    let config = EmbedderConfig {
        dimension: std::env::var("CR_EMBEDDER_DIMENSION")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or_else(|| EmbedderConfig::default().dimension),
    };
    let name = std::env::var("CR_EMBEDDER").unwrap_or_else(|_| "hash".into());
    create_embedder(&name, config)
}
