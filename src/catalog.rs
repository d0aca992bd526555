//! Question model and the read-only question catalog interface.

use futures::{FutureExt, future::BoxFuture};
use serde::{Deserialize, Serialize};

use crate::store::StoreResult;

/// Theme sentinel meaning "no topic filter, draw from the full approved pool".
pub const MIX_THEME: &str = "Mix";

/// One selectable answer of a question.
///
/// Correctness travels with the option itself, so client-side option
/// shuffling never affects scoring.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuestionOption {
    /// Display text of the option.
    pub text: String,
    /// Whether picking this option scores the question.
    pub is_correct: bool,
}

/// A catalog question record.
///
/// Immutable once snapshotted into a room: the host freezes content and
/// order at game start so every participant sees identical questions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Stable catalog identifier.
    pub id: String,
    /// Question text shown to players.
    pub text: String,
    /// Optional illustration reference.
    pub image_url: Option<String>,
    /// Two or more answer options.
    pub options: Vec<QuestionOption>,
    /// Content category, `None` for uncategorized questions.
    pub topic: Option<String>,
    /// Moderation flag; only approved questions are served.
    pub approved: bool,
    /// Position assigned when the question is frozen into a game.
    #[serde(default)]
    pub index: usize,
}

impl Question {
    /// Indices of the correct options.
    pub fn correct_options(&self) -> Vec<usize> {
        self.options
            .iter()
            .enumerate()
            .filter(|(_, option)| option.is_correct)
            .map(|(position, _)| position)
            .collect()
    }
}

/// Filter applied to a catalog query. Only approved questions are ever
/// returned; `topic` narrows the pool to an exact category match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuestionFilter {
    /// Exact topic to match, or `None` for the full approved pool.
    pub topic: Option<String>,
}

impl QuestionFilter {
    /// Build a filter from a lobby theme selection, resolving the
    /// [`MIX_THEME`] sentinel (case-insensitive) to "no filter".
    pub fn for_theme(theme: &str) -> Self {
        let topic = if theme.eq_ignore_ascii_case(MIX_THEME) {
            None
        } else {
            Some(theme.to_owned())
        };
        Self { topic }
    }
}

/// Read-only question catalog.
pub trait QuestionSource: Send + Sync {
    /// Query approved questions, optionally narrowed to one topic.
    fn query(&self, filter: QuestionFilter) -> BoxFuture<'static, StoreResult<Vec<Question>>>;
}

/// Fixed in-memory catalog used by tests and the demo binary.
pub struct MemoryQuestionSource {
    questions: Vec<Question>,
}

impl MemoryQuestionSource {
    /// Build a catalog over a fixed question list.
    pub fn new(questions: Vec<Question>) -> Self {
        Self { questions }
    }
}

impl QuestionSource for MemoryQuestionSource {
    fn query(&self, filter: QuestionFilter) -> BoxFuture<'static, StoreResult<Vec<Question>>> {
        let matches: Vec<Question> = self
            .questions
            .iter()
            .filter(|question| question.approved)
            .filter(|question| match &filter.topic {
                Some(topic) => question.topic.as_deref() == Some(topic.as_str()),
                None => true,
            })
            .cloned()
            .collect();
        async move { Ok(matches) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, topic: Option<&str>, approved: bool) -> Question {
        Question {
            id: id.into(),
            text: format!("question {id}"),
            image_url: None,
            options: vec![
                QuestionOption {
                    text: "right".into(),
                    is_correct: true,
                },
                QuestionOption {
                    text: "wrong".into(),
                    is_correct: false,
                },
            ],
            topic: topic.map(Into::into),
            approved,
            index: 0,
        }
    }

    fn catalog() -> MemoryQuestionSource {
        MemoryQuestionSource::new(vec![
            question("q1", Some("Science"), true),
            question("q2", Some("History"), true),
            question("q3", Some("Science"), false),
            question("q4", None, true),
        ])
    }

    #[tokio::test]
    async fn mix_theme_returns_full_approved_pool() {
        let source = catalog();
        let all = source.query(QuestionFilter::for_theme("mix")).await.unwrap();
        let ids: Vec<&str> = all.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q1", "q2", "q4"]);
    }

    #[tokio::test]
    async fn topic_filter_matches_exactly() {
        let source = catalog();
        let science = source
            .query(QuestionFilter::for_theme("Science"))
            .await
            .unwrap();
        let ids: Vec<&str> = science.iter().map(|q| q.id.as_str()).collect();
        // q3 is unapproved and stays out even though the topic matches.
        assert_eq!(ids, vec!["q1"]);
    }

    #[test]
    fn correct_options_follow_the_flag() {
        let q = question("q1", None, true);
        assert_eq!(q.correct_options(), vec![0]);
    }
}
