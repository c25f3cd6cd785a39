use crate::{JobRecord, UserQuery};

/// 自由テキストを小文字の英数字トークン列に分解する。
/// 区切りは非英数字文字。空トークンは出さない。
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// 求人1件分の埋め込み対象テキスト（タイトル + 業界 + 必須スキル、空白連結）
pub fn job_text(job: &JobRecord) -> String {
    format!("{} {} {}", job.title, job.industry, job.required_skills)
}

/// クエリの埋め込み対象テキスト（興味 + スキル + 職種、空白連結）
pub fn query_text(query: &UserQuery) -> String {
    format!("{} {} {}", query.interests, query.skills, query.profession)
}
