//! Topic and answer generation.
//!
//! [`TopicGenerator`] glues the prompt store to the generation backend. Both
//! entry points swallow backend failures into fixed fallback strings rather
//! than returning errors: a partial delivery cycle (topic posted, answer
//! generation failed) beats no topic at all, so generation errors must never
//! abort the caller.

use crate::gemini::GenerateText;
use crate::templates::PromptStore;
use tracing::error;

/// Instruction filled into the `{instruction}` slot of every topic template.
pub const TOPIC_INSTRUCTION: &str =
    "テキストだけで回答できる、面白い大喜利のお題を1つ考えてください。お題のテキストのみを返してください。余計な前置きや説明は不要です。";

/// User-facing text posted when topic generation fails.
pub const TOPIC_FALLBACK: &str = "申し訳ありません。お題の生成中にエラーが発生しました。";

/// User-facing text stashed when answer generation fails.
pub const ANSWER_FALLBACK: &str = "申し訳ありません。回答例の生成中にエラーが発生しました。";

/// Recorded as the prompt source when no template could be selected.
const UNKNOWN_SOURCE: &str = "unknown";

pub struct TopicGenerator<G: GenerateText> {
    backend: G,
    store: PromptStore,
}

impl<G: GenerateText> TopicGenerator<G> {
    pub fn new(backend: G, store: PromptStore) -> Self {
        Self { backend, store }
    }

    /// Generate one topic from a randomly chosen topic template.
    ///
    /// Returns `(text, template_name)`. Backend failures produce the
    /// [`TOPIC_FALLBACK`] text paired with the template that was attempted;
    /// if not even a template could be selected, the source is `"unknown"`.
    pub async fn generate_topic(&self) -> (String, String) {
        let template = match self.store.pick_topic_template() {
            Ok(t) => t,
            Err(e) => {
                error!("Topic template selection failed: {e}");
                return (TOPIC_FALLBACK.to_string(), UNKNOWN_SOURCE.to_string());
            }
        };
        let prompt = template.fill("instruction", TOPIC_INSTRUCTION);
        match self.backend.generate(&prompt).await {
            Ok(text) => (text.trim().to_string(), template.name),
            Err(e) => {
                error!("Topic generation failed ({}): {e}", template.name);
                (TOPIC_FALLBACK.to_string(), template.name)
            }
        }
    }

    /// Generate an example answer for an already-generated topic, via the
    /// dedicated answer template. Failures produce [`ANSWER_FALLBACK`].
    pub async fn generate_answer(&self, topic: &str) -> String {
        let template = match self.store.answer_template() {
            Ok(t) => t,
            Err(e) => {
                error!("Answer template load failed: {e}");
                return ANSWER_FALLBACK.to_string();
            }
        };
        let prompt = template.fill("topic", topic);
        match self.backend.generate(&prompt).await {
            Ok(text) => text.trim().to_string(),
            Err(e) => {
                error!("Answer generation failed: {e}");
                ANSWER_FALLBACK.to_string()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GenerateFuture;
    use tempfile::tempdir;

    /// Backend that echoes the prompt back, padded with whitespace.
    struct EchoBackend;

    impl GenerateText for EchoBackend {
        fn generate(&self, prompt: &str) -> GenerateFuture<'_> {
            let prompt = prompt.to_string();
            Box::pin(async move { Ok(format!("  echo: {prompt}\n")) })
        }
    }

    /// Backend that always fails, standing in for network/vendor errors.
    struct FailingBackend;

    impl GenerateText for FailingBackend {
        fn generate(&self, _prompt: &str) -> GenerateFuture<'_> {
            Box::pin(async move { Err("backend unavailable".to_string()) })
        }
    }

    fn store_with_templates(dir: &tempfile::TempDir) -> PromptStore {
        std::fs::write(dir.path().join("circle.txt"), "前置き {instruction} 後書き").unwrap();
        std::fs::write(dir.path().join("answer.txt"), "お題: {topic} に回答").unwrap();
        PromptStore::new(dir.path())
    }

    #[tokio::test]
    async fn topic_uses_template_and_trims_response() {
        let dir = tempdir().unwrap();
        let generator = TopicGenerator::new(EchoBackend, store_with_templates(&dir));

        let (topic, source) = generator.generate_topic().await;
        assert_eq!(source, "circle.txt");
        assert_eq!(
            topic,
            format!("echo: 前置き {TOPIC_INSTRUCTION} 後書き")
        );
    }

    #[tokio::test]
    async fn topic_backend_failure_yields_fallback_with_attempted_source() {
        let dir = tempdir().unwrap();
        let generator = TopicGenerator::new(FailingBackend, store_with_templates(&dir));

        let (topic, source) = generator.generate_topic().await;
        assert_eq!(topic, TOPIC_FALLBACK);
        assert_eq!(source, "circle.txt");
    }

    #[tokio::test]
    async fn topic_with_no_templates_yields_fallback_and_unknown_source() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("answer.txt"), "{topic}").unwrap();
        let generator = TopicGenerator::new(EchoBackend, PromptStore::new(dir.path()));

        let (topic, source) = generator.generate_topic().await;
        assert_eq!(topic, TOPIC_FALLBACK);
        assert_eq!(source, "unknown");
    }

    #[tokio::test]
    async fn answer_substitutes_topic_into_template() {
        let dir = tempdir().unwrap();
        let generator = TopicGenerator::new(EchoBackend, store_with_templates(&dir));

        let answer = generator.generate_answer("T1").await;
        assert_eq!(answer, "echo: お題: T1 に回答");
    }

    #[tokio::test]
    async fn answer_backend_failure_yields_fallback() {
        let dir = tempdir().unwrap();
        let generator = TopicGenerator::new(FailingBackend, store_with_templates(&dir));

        assert_eq!(generator.generate_answer("T1").await, ANSWER_FALLBACK);
    }

    #[tokio::test]
    async fn answer_without_answer_template_yields_fallback() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("circle.txt"), "{instruction}").unwrap();
        let generator = TopicGenerator::new(EchoBackend, PromptStore::new(dir.path()));

        assert_eq!(generator.generate_answer("T1").await, ANSWER_FALLBACK);
    }
}
