//! The daily delivery cycle.
//!
//! One invocation does three things, strictly in order:
//!
//! 1. **Drain** — if the ledger holds a generated-but-unsent answer, deliver
//!    the oldest one and mark it sent. A delivery failure is logged and the
//!    cycle continues; the record stays pending and tomorrow's drain picks it
//!    up again. That natural recurrence is the system's only retry mechanism.
//! 2. **Publish** — generate a new topic, persist it, post it.
//! 3. **Stash** — generate the answer for today's topic and attach it to the
//!    record *without* delivering it. It becomes tomorrow's pending answer.
//!
//! Storage errors propagate out of [`DeliveryCycle::run_once`] and end that
//! invocation; the scheduler logs them and waits for the next day. Nothing
//! crashes the process.

use crate::gemini::GenerateText;
use crate::generator::TopicGenerator;
use crate::ledger::TopicLedger;
use crate::slack::MessageSink;
use crate::{ANSWER_HEADER, TOPIC_HEADER};
use chrono::{DateTime, Local, NaiveDate, NaiveTime};
use std::time::Duration;
use tracing::{error, info, warn};

/// What a single cycle run did, for logging and the `send` subcommand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleOutcome {
    /// Id of the record whose answer was drained, if any.
    pub drained: Option<i64>,
    /// Id of the newly created topic record.
    pub topic_id: i64,
}

/// One scheduled run of the bot. Collaborators are passed in explicitly; the
/// cycle holds no in-process state between runs — everything that must
/// survive to tomorrow lives in the ledger.
pub struct DeliveryCycle<'a, G: GenerateText, S: MessageSink> {
    generator: &'a TopicGenerator<G>,
    ledger: &'a TopicLedger,
    sink: &'a S,
}

impl<'a, G: GenerateText, S: MessageSink> DeliveryCycle<'a, G, S> {
    pub fn new(generator: &'a TopicGenerator<G>, ledger: &'a TopicLedger, sink: &'a S) -> Self {
        Self {
            generator,
            ledger,
            sink,
        }
    }

    /// Run one delivery cycle. Only storage errors surface as `Err`.
    pub async fn run_once(&self) -> Result<CycleOutcome, String> {
        // 1. Drain yesterday's stashed answer, if one exists.
        let mut drained = None;
        if let Some(pending) = self.ledger.oldest_pending_answer()? {
            info!("Draining pending answer for topic {}", pending.id);
            let message = format!("{ANSWER_HEADER}\n{}", pending.answer);
            match self.sink.post(&message).await {
                Ok(()) => {
                    self.ledger.mark_answer_sent(pending.id)?;
                    drained = Some(pending.id);
                }
                // Still pending; the next cycle retries it.
                Err(e) => warn!("Failed to deliver pending answer {}: {e}", pending.id),
            }
        }

        // 2. Generate and publish today's topic. Generation cannot fail
        //    (fallback text at worst), so the record always gets created
        //    before the send attempt.
        let (topic, source) = self.generator.generate_topic().await;
        let topic_id = self.ledger.create_topic(&topic, &source)?;
        info!("Created topic {topic_id} from template {source}");
        if let Err(e) = self.sink.post(&format!("{TOPIC_HEADER}\n{topic}")).await {
            warn!("Failed to deliver topic {topic_id}: {e}");
        }

        // 3. Generate today's answer and stash it for tomorrow's drain.
        let answer = self.generator.generate_answer(&topic).await;
        self.ledger.attach_answer(topic_id, &answer)?;
        info!("Stashed answer for topic {topic_id}");

        Ok(CycleOutcome { drained, topic_id })
    }

    /// Poll once per second and run the cycle when local time passes `at`,
    /// at most once per calendar day. Never returns.
    ///
    /// A process started after today's slot waits for tomorrow rather than
    /// firing immediately.
    pub async fn run_daily(&self, at: NaiveTime) {
        let now = Local::now();
        let mut last_run = if now.time() >= at {
            Some(now.date_naive())
        } else {
            None
        };
        info!("Scheduler armed for {at} local time");

        loop {
            let now = Local::now();
            if is_due(now, at, last_run) {
                last_run = Some(now.date_naive());
                match self.run_once().await {
                    Ok(outcome) => info!(
                        "Cycle complete: new topic {}, drained {:?}",
                        outcome.topic_id, outcome.drained
                    ),
                    Err(e) => error!("Delivery cycle failed: {e}"),
                }
            }
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
    }
}

/// Whether the daily run is due: the target time has passed and the cycle
/// has not yet run today.
pub fn is_due(now: DateTime<Local>, at: NaiveTime, last_run: Option<NaiveDate>) -> bool {
    now.time() >= at && last_run != Some(now.date_naive())
}
