use std::hash::{Hash, Hasher};

use siphasher::sip::SipHasher13;

use super::{tokenizer, EmbedderConfig, Embedding, EmbeddingSource, TextEmbedder};

/// 固定 seed（決定論的 hash のため）
/// この値を変更すると全 embedding が変わる → version() を上げること
const HASH_SEED_K0: u64 = 0x9e37_79b9_7f4a_7c15;
const HASH_SEED_K1: u64 = 0x2545_f491_4f6c_dd1d;

/// Feature Hashing による決定論的なテキスト埋め込み
///
/// - 学習不要（固定ハッシュ関数）
/// - O(n) where n = token count
/// - SipHash13 + 固定 seed で Rust バージョン間の安定性を保証
/// - 出力は L2 正規化済み
pub struct HashEmbedder {
    config: EmbedderConfig,
}

impl HashEmbedder {
    pub fn new(config: EmbedderConfig) -> Self {
        let mut config = config;
        config.dimension = config.dimension.max(1);
        Self { config }
    }

    /// トークンを次元インデックスにハッシュする
    fn hash_token(&self, token: &str) -> usize {
        let mut hasher = SipHasher13::new_with_keys(HASH_SEED_K0, HASH_SEED_K1);
        token.hash(&mut hasher);
        (hasher.finish() as usize) % self.config.dimension
    }

    fn embed_tokens(&self, tokens: &[String], source: EmbeddingSource) -> Embedding {
        let mut vector = vec![0.0f32; self.config.dimension];

        for token in tokens {
            let index = self.hash_token(token);
            // Sign hashing: 偶数ハッシュ → +1, 奇数ハッシュ → -1
            let sign = if self.hash_token(&format!("{token}#sign")) % 2 == 0 {
                1.0
            } else {
                -1.0
            };
            vector[index] += sign;
        }

        // L2正規化
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for value in &mut vector {
                *value /= norm;
            }
        }

        Embedding {
            vector,
            source,
            created_at: chrono::Utc::now(),
        }
    }
}

impl TextEmbedder for HashEmbedder {
    fn name(&self) -> &'static str {
        "hash"
    }

    fn version(&self) -> &str {
        // トークン設計やハッシュ seed が変わったらバージョンを上げる
        "v1"
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn embed_text(&self, text: &str, source: EmbeddingSource) -> Embedding {
        let tokens = tokenizer::tokenize(text);
        self.embed_tokens(&tokens, source)
    }
}
