//! Daily Ogiri topic bot for Slack.
//!
//! Once a day the bot asks Gemini for a fresh Ogiri topic, posts it to the
//! configured channel, and stashes a generated example answer in a SQLite
//! ledger so it can go out with the *next* day's post. Mentioning the bot in
//! a channel generates a topic on demand, bypassing the ledger entirely.
//!
//! # Where to find things
//!
//! - **Topic persistence:** [`ledger::TopicLedger`] — one `topics` table,
//!   short-lived connections, the deferred-answer handshake lives in
//!   [`ledger::TopicLedger::oldest_pending_answer`] /
//!   [`ledger::TopicLedger::mark_answer_sent`].
//! - **Prompt templates:** [`templates::PromptStore`] — a directory of text
//!   files, `answer.txt` is special, everything else is a topic template.
//! - **Generation:** [`gemini::GeminiClient`] behind the
//!   [`gemini::GenerateText`] seam; [`generator::TopicGenerator`] turns
//!   templates + backend into topic/answer text and swallows backend errors
//!   into fixed fallback strings.
//! - **Delivery:** [`slack::SlackClient`] for `chat.postMessage`,
//!   [`slack::socket::SocketModeListener`] for inbound mentions.
//! - **Orchestration:** [`cycle::DeliveryCycle`] runs the daily
//!   drain → publish → stash sequence; [`responder::MentionResponder`]
//!   handles mentions synchronously.
//!
//! # Design principles
//!
//! 1. **Explicit collaborators.** The Gemini client, the Slack client, and
//!    the ledger are constructed once in `main` and passed into the cycle and
//!    the responder. No module-level singletons.
//!
//! 2. **Failures never crash the process.** Backend errors become fallback
//!    text, delivery errors are logged and the cycle moves on, storage errors
//!    end the current cycle invocation only.
//!
//! 3. **The ledger is the only shared state.** The scheduler and the mention
//!    listener run concurrently but share nothing in-process; every ledger
//!    operation opens its own connection.

pub mod config;
pub mod cycle;
pub mod gemini;
pub mod generator;
pub mod ledger;
pub mod responder;
pub mod slack;
pub mod templates;

// ── Constants ──────────────────────────────────────────────────────

/// Default Gemini model for all generation calls.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Header line prepended to every posted topic.
pub const TOPIC_HEADER: &str = "【大喜利お題】";

/// Header line prepended to every drained answer.
pub const ANSWER_HEADER: &str = "【昨日のお題の回答例】";
