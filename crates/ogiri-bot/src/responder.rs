//! Mention responder: on-demand topic generation, no ledger involvement.
//!
//! Each mention gets an immediate acknowledgment, then a freshly generated
//! topic, both posted to the channel the mention arrived in. Generation
//! never fails visibly (the generator substitutes fallback text), so only
//! delivery errors can occur here and those are logged — a mention never
//! crashes the listener.

use crate::TOPIC_HEADER;
use crate::gemini::GenerateText;
use crate::generator::TopicGenerator;
use crate::slack::ChannelPost;
use crate::slack::socket::MentionEvent;
use tracing::{info, warn};

/// Acknowledgment posted while the generation call is in flight.
pub const MENTION_ACK: &str = "大喜利のお題を考えています...少々お待ちください！";

pub struct MentionResponder<'a, G: GenerateText, P: ChannelPost> {
    generator: &'a TopicGenerator<G>,
    slack: &'a P,
}

impl<'a, G: GenerateText, P: ChannelPost> MentionResponder<'a, G, P> {
    pub fn new(generator: &'a TopicGenerator<G>, slack: &'a P) -> Self {
        Self { generator, slack }
    }

    /// Handle one mention: ack, generate, reply in the same channel.
    pub async fn handle(&self, event: &MentionEvent) {
        info!("Mention in {}: {}", event.channel, event.text);
        if let Err(e) = self.slack.post_to(&event.channel, MENTION_ACK).await {
            warn!("Failed to post mention ack: {e}");
        }

        let (topic, _source) = self.generator.generate_topic().await;
        let reply = format!("{TOPIC_HEADER}\n{topic}");
        if let Err(e) = self.slack.post_to(&event.channel, &reply).await {
            warn!("Failed to post mention reply: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gemini::GenerateFuture;
    use crate::generator::TOPIC_FALLBACK;
    use crate::slack::PostFuture;
    use crate::templates::PromptStore;
    use std::sync::Mutex;
    use tempfile::tempdir;

    struct StubBackend;

    impl GenerateText for StubBackend {
        fn generate(&self, _prompt: &str) -> GenerateFuture<'_> {
            Box::pin(async move { Ok("T-generated".to_string()) })
        }
    }

    struct FailingBackend;

    impl GenerateText for FailingBackend {
        fn generate(&self, _prompt: &str) -> GenerateFuture<'_> {
            Box::pin(async move { Err("backend unavailable".to_string()) })
        }
    }

    /// Records `(channel, text)` pairs in posting order.
    #[derive(Default)]
    struct RecordingPoster {
        posts: Mutex<Vec<(String, String)>>,
    }

    impl ChannelPost for RecordingPoster {
        fn post_to(&self, channel: &str, text: &str) -> PostFuture<'_> {
            self.posts
                .lock()
                .unwrap()
                .push((channel.to_string(), text.to_string()));
            Box::pin(async move { Ok(()) })
        }
    }

    fn generator_with<G: GenerateText>(
        dir: &tempfile::TempDir,
        backend: G,
    ) -> TopicGenerator<G> {
        std::fs::write(dir.path().join("circle.txt"), "{instruction}").unwrap();
        std::fs::write(dir.path().join("answer.txt"), "{topic}").unwrap();
        TopicGenerator::new(backend, PromptStore::new(dir.path()))
    }

    #[tokio::test]
    async fn posts_ack_then_topic_to_the_events_channel() {
        let dir = tempdir().unwrap();
        let generator = generator_with(&dir, StubBackend);
        let poster = RecordingPoster::default();
        let responder = MentionResponder::new(&generator, &poster);

        responder
            .handle(&MentionEvent {
                channel: "C123".to_string(),
                text: "<@U999> お題".to_string(),
            })
            .await;

        let posts = poster.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[0], ("C123".to_string(), MENTION_ACK.to_string()));
        assert_eq!(
            posts[1],
            ("C123".to_string(), format!("{TOPIC_HEADER}\nT-generated"))
        );
    }

    #[tokio::test]
    async fn backend_failure_replies_with_fallback_text() {
        let dir = tempdir().unwrap();
        let generator = generator_with(&dir, FailingBackend);
        let poster = RecordingPoster::default();
        let responder = MentionResponder::new(&generator, &poster);

        responder
            .handle(&MentionEvent {
                channel: "C123".to_string(),
                text: String::new(),
            })
            .await;

        let posts = poster.posts.lock().unwrap().clone();
        assert_eq!(posts.len(), 2);
        assert_eq!(posts[1].1, format!("{TOPIC_HEADER}\n{TOPIC_FALLBACK}"));
    }
}
