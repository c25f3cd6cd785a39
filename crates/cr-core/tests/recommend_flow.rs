use cr_core::catalog::{prepare_catalog, RawJobRow};
use cr_core::embedding::{
    create_embedder, tokenizer, EmbedderConfig, EmbeddingSource, TextEmbedder,
};
use cr_core::labeling::{derive_labels, LabelConfig};
use cr_core::{Recommender, RecommenderConfig, UserQuery};

fn raw_row(
    title: &str,
    company: &str,
    industry: &str,
    skills: &str,
    level: &str,
    salary: &str,
) -> RawJobRow {
    RawJobRow {
        title: Some(title.into()),
        company: Some(company.into()),
        industry: Some(industry.into()),
        required_skills: Some(skills.into()),
        location: Some("Remote".into()),
        experience_level: Some(level.into()),
        salary: Some(salary.into()),
    }
}

fn sample_rows() -> Vec<RawJobRow> {
    vec![
        raw_row(
            "Software Engineer",
            "TechCo",
            "Software",
            "python",
            "Entry Level",
            "45000",
        ),
        raw_row(
            "Nurse",
            "HealthCo",
            "Healthcare",
            "patient care",
            "Mid Level",
            "60000",
        ),
        raw_row(
            "Data Scientist",
            "DataCo",
            "Software",
            "statistics",
            "Senior Level",
            "95000",
        ),
    ]
}

fn fitted_recommender() -> Recommender {
    Recommender::fit(
        prepare_catalog(&sample_rows()),
        create_embedder("hash", EmbedderConfig::default()),
        RecommenderConfig::default(),
    )
    .expect("catalog is non-empty")
}

#[test]
fn engineer_query_ranks_software_engineer_first() {
    let recommender = fitted_recommender();
    let query = UserQuery::new("technology", "python", "engineer", 45_000.0, 1.0);

    let ranked = recommender.recommend(&query).expect("pipeline succeeds");

    assert!(!ranked.is_empty());
    assert_eq!(ranked[0].job.title, "Software Engineer");
    assert_eq!(ranked[0].job.company, "TechCo");
    for pair in ranked.windows(2) {
        assert!(pair[0].combined_score >= pair[1].combined_score);
    }
    for entry in &ranked {
        assert!((0.0..=1.0).contains(&entry.combined_score));
    }
}

#[test]
fn nurse_never_receives_a_positive_label() {
    let catalog = prepare_catalog(&sample_rows());
    let embedder = create_embedder("hash", EmbedderConfig::default());
    let query = UserQuery::new("technology", "python", "engineer", 45_000.0, 1.0);

    let query_embedding =
        embedder.embed_text(&tokenizer::query_text(&query), EmbeddingSource::Query);
    let similarities: Vec<f32> = catalog
        .jobs()
        .iter()
        .map(|job| {
            let job_embedding =
                embedder.embed_text(&tokenizer::job_text(job), EmbeddingSource::Job);
            embedder.similarity(&query_embedding, &job_embedding)
        })
        .collect();

    let labels = derive_labels(&catalog, &query, &similarities, &LabelConfig::default())
        .expect("similarity count matches catalog");

    // タイトルと給与カテゴリが一致する Software Engineer は正例、
    // キーワードを含まない Nurse はフォールバック経由でも正例にならない
    assert_eq!(labels[0], 1);
    assert_eq!(labels[1], 0);
}

#[test]
fn invalid_numeric_input_defaults_to_zero_and_still_recommends() {
    let recommender = fitted_recommender();
    let query = UserQuery::from_form("technology", "python", "engineer", "abc", "n/a");

    assert_eq!(query.expected_salary, 0.0);
    assert_eq!(query.experience_years, 0.0);

    let ranked = recommender.recommend(&query).expect("pipeline succeeds");
    assert!(!ranked.is_empty());
}

#[test]
fn identical_inputs_produce_identical_rankings_across_engines() {
    let query = UserQuery::new("technology", "python", "engineer", 45_000.0, 1.0);

    let first = fitted_recommender().recommend(&query).unwrap();
    let second = fitted_recommender().recommend(&query).unwrap();

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a.job, b.job);
        assert_eq!(a.combined_score, b.combined_score);
        assert_eq!(a.text_similarity, b.text_similarity);
    }
}

#[test]
fn ranked_output_serializes_with_catalog_column_headers() {
    let recommender = fitted_recommender();
    let query = UserQuery::new("technology", "python", "engineer", 45_000.0, 1.0);

    let ranked = recommender.recommend(&query).unwrap();
    let value = serde_json::to_value(&ranked[0]).expect("serializable");

    assert_eq!(value["Job Title"], "Software Engineer");
    assert_eq!(value["Company"], "TechCo");
    assert_eq!(value["Salary Category"], "Low");
    assert_eq!(value["Experience Level"], "Entry Level");
    assert!(value["combinedScore"].is_number());
    assert!(value["textSimilarityScore"].is_number());
}

#[test]
fn catalog_cleaning_feeds_the_pipeline() {
    let mut rows = sample_rows();
    // プレースホルダ・重複・欠損行はクリーニングで除外される
    rows.push(raw_row(
        "make",
        "Acme",
        "Software",
        "misc",
        "Entry Level",
        "45000",
    ));
    rows.push(raw_row(
        "Software Engineer",
        "OtherCo",
        "Software",
        "python",
        "Entry Level",
        "52000",
    ));
    rows.push(RawJobRow::default());

    let catalog = prepare_catalog(&rows);
    assert_eq!(catalog.len(), 3);

    let recommender = Recommender::fit(
        catalog,
        create_embedder("hash", EmbedderConfig::default()),
        RecommenderConfig::default(),
    )
    .unwrap();
    let query = UserQuery::new("technology", "python", "engineer", 45_000.0, 1.0);
    assert!(!recommender.recommend(&query).unwrap().is_empty());
}
