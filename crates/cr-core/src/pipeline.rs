use std::cmp::Ordering;

use tracing::{debug, info};

use crate::catalog::Catalog;
use crate::classifier::ForestConfig;
use crate::embedding::{tokenizer, EmbedderConfig, EmbeddingSource, TextEmbedder};
use crate::error::RecommendError;
use crate::features::{FeatureEncoder, FeatureVector};
use crate::labeling::{derive_labels, LabelConfig};
use crate::ranking::{RankedJob, Ranker, RankerConfig};
use crate::scoring::score_suitability;
use crate::UserQuery;

/// パイプライン全体の設定
#[derive(Debug, Clone, Default)]
pub struct RecommenderConfig {
    pub embedder: EmbedderConfig,
    pub label: LabelConfig,
    pub forest: ForestConfig,
    pub ranker: RankerConfig,
}

/// 環境変数から設定を読み込む。未設定・解釈不能な値はデフォルトに倒す。
pub fn load_config_from_env() -> RecommenderConfig {
    let defaults = RecommenderConfig::default();
    RecommenderConfig {
        embedder: EmbedderConfig {
            dimension: env_parse("CR_EMBEDDER_DIMENSION", defaults.embedder.dimension),
        },
        label: LabelConfig {
            text_match_threshold: env_parse(
                "CR_TEXT_MATCH_THRESHOLD",
                defaults.label.text_match_threshold,
            ),
            forced_positive_count: env_parse(
                "CR_FORCED_POSITIVE_COUNT",
                defaults.label.forced_positive_count,
            ),
        },
        forest: ForestConfig {
            n_trees: env_parse("CR_FOREST_TREES", defaults.forest.n_trees),
            seed: env_parse("CR_FOREST_SEED", defaults.forest.seed),
            max_depth: defaults.forest.max_depth,
        },
        ranker: RankerConfig {
            top_n: env_parse("CR_TOP_N", defaults.ranker.top_n),
            suitability_threshold: env_parse(
                "CR_SUITABILITY_THRESHOLD",
                defaults.ranker.suitability_threshold,
            ),
            feature_weight: env_parse("CR_FEATURE_WEIGHT", defaults.ranker.feature_weight),
            text_weight: env_parse("CR_TEXT_WEIGHT", defaults.ranker.text_weight),
        },
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

/// 推薦エンジン。
///
/// カタログ・fit 済みエンコーダ・特徴行列・埋め込みモデルを読み取り専用で
/// 保持し、逐次リクエストで使い回す。分類器はラベルがクエリ依存のため
/// リクエストごとに新規作成される（共有状態なし）。
pub struct Recommender {
    catalog: Catalog,
    encoder: FeatureEncoder,
    job_features: Vec<FeatureVector>,
    embedder: Box<dyn TextEmbedder>,
    config: RecommenderConfig,
}

impl Recommender {
    /// クリーニング済みカタログでエンコーダを fit し、特徴行列を前計算する。
    /// 空のカタログはエラー。
    pub fn fit(
        catalog: Catalog,
        embedder: Box<dyn TextEmbedder>,
        config: RecommenderConfig,
    ) -> Result<Self, RecommendError> {
        let (job_features, encoder) = FeatureEncoder::fit_transform(&catalog)?;
        info!(
            jobs = catalog.len(),
            feature_dimension = encoder.dimension(),
            embedder = embedder.name(),
            embedder_version = embedder.version(),
            "recommender fitted"
        );
        Ok(Self {
            catalog,
            encoder,
            job_features,
            embedder,
            config,
        })
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn config(&self) -> &RecommenderConfig {
        &self.config
    }

    /// 設定済みの top_n で推薦する
    pub fn recommend(&self, query: &UserQuery) -> Result<Vec<RankedJob>, RecommendError> {
        self.recommend_top(query, self.config.ranker.top_n)
    }

    /// 1クエリ分の推薦: 類似度 → 弱ラベル → 適合確率 → ランキング
    pub fn recommend_top(
        &self,
        query: &UserQuery,
        top_n: usize,
    ) -> Result<Vec<RankedJob>, RecommendError> {
        let text_similarities = self.text_similarities(query);
        let labels = derive_labels(&self.catalog, query, &text_similarities, &self.config.label)?;
        let suitability = score_suitability(
            &self.job_features,
            &labels,
            &text_similarities,
            &self.config.forest,
        );

        let user_vector = self.encoder.transform_query(
            query,
            self.catalog.modal_industry().unwrap_or(""),
            self.catalog.modal_location().unwrap_or(""),
        );

        let ranker = Ranker::new(RankerConfig {
            top_n,
            ..self.config.ranker.clone()
        });
        let ranked = ranker.rank(
            &self.catalog,
            &self.job_features,
            &user_vector,
            &suitability,
            &text_similarities,
            query,
        );

        info!(results = ranked.len(), top_n, "recommendation complete");
        Ok(ranked)
    }

    /// 全求人テキストとクエリテキストを埋め込み、カタログ行順の
    /// コサイン類似度を返す。結果は保持しない（リクエストごとに再計算）。
    fn text_similarities(&self, query: &UserQuery) -> Vec<f32> {
        let job_texts: Vec<String> = self.catalog.jobs().iter().map(tokenizer::job_text).collect();
        let job_embeddings = self.embedder.embed_batch(&job_texts, EmbeddingSource::Job);
        let query_embedding = self
            .embedder
            .embed_text(&tokenizer::query_text(query), EmbeddingSource::Query);

        let similarities: Vec<f32> = job_embeddings
            .iter()
            .map(|embedding| self.embedder.similarity(&query_embedding, embedding))
            .collect();

        self.log_similarity_stats(&similarities);
        similarities
    }

    fn log_similarity_stats(&self, similarities: &[f32]) {
        if similarities.is_empty() {
            return;
        }

        let min = similarities.iter().copied().fold(f32::INFINITY, f32::min);
        let max = similarities
            .iter()
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);
        let mean = similarities.iter().sum::<f32>() / similarities.len() as f32;
        debug!(min, max, mean, "text similarity stats");

        // 上位10件（弱ラベル品質の調査用）
        let mut order: Vec<usize> = (0..similarities.len()).collect();
        order.sort_by(|&a, &b| {
            similarities[b]
                .partial_cmp(&similarities[a])
                .unwrap_or(Ordering::Equal)
        });
        for &index in order.iter().take(10) {
            let job = &self.catalog.jobs()[index];
            debug!(
                title = %job.title,
                industry = %job.industry,
                similarity = similarities[index],
                "top text similarity"
            );
        }
    }
}
