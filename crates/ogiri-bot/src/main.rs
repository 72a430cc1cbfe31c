//! Daily Ogiri topic bot for Slack.
//!
//! Once a day the bot posts a Gemini-generated Ogiri topic to the configured
//! channel, delivers the *previous* day's example answer first, and stashes
//! today's answer for tomorrow. Mentioning the bot generates a topic on
//! demand.
//!
//! Credentials come from the environment: `SLACK_BOT_TOKEN`,
//! `SLACK_APP_TOKEN` (mention listener), `SLACK_CHANNEL_ID` (daily
//! delivery), `GEMINI_API_KEY`.
//!
//! # Examples
//!
//! ```sh
//! # Run the scheduler and the mention listener
//! ogiri-bot
//!
//! # Run one delivery cycle right now
//! ogiri-bot send
//!
//! # Print a generated topic without posting it
//! ogiri-bot topic
//!
//! # Dump the ledger, newest first
//! ogiri-bot history
//! ```

use chrono::NaiveTime;
use clap::{Parser, Subcommand};
use std::process;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info};

use ogiri_bot::config::{
    BotConfig, ENV_APP_TOKEN, ENV_BOT_TOKEN, ENV_CHANNEL_ID, ENV_GEMINI_KEY,
};
use ogiri_bot::cycle::DeliveryCycle;
use ogiri_bot::gemini::GeminiClient;
use ogiri_bot::generator::TopicGenerator;
use ogiri_bot::ledger::TopicLedger;
use ogiri_bot::responder::MentionResponder;
use ogiri_bot::slack::socket::{MentionEvent, SocketModeListener};
use ogiri_bot::slack::{ChannelSink, SlackClient};
use ogiri_bot::templates::PromptStore;

/// Daily Ogiri topic bot for Slack, powered by Gemini.
#[derive(Parser)]
#[command(name = "ogiri-bot")]
struct Cli {
    /// Directory of prompt templates (`answer.txt` plus topic templates)
    #[arg(long, default_value = "templates")]
    templates_dir: String,

    /// SQLite file holding the topic ledger
    #[arg(long, default_value = "data/ogiri.db")]
    db: String,

    /// Gemini model used for all generation calls
    #[arg(long, default_value = ogiri_bot::DEFAULT_MODEL)]
    model: String,

    /// Local time of the daily run, HH:MM
    #[arg(long, default_value = "11:00")]
    at: String,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the daily scheduler and the mention listener (default)
    Run,
    /// Execute one delivery cycle now and exit
    Send,
    /// Generate a topic and print it to stdout
    Topic,
    /// Print all recorded topics, newest first
    History,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = BotConfig::from_env();

    let result = match cli.command {
        Some(Command::Send) => send(&cli, &config).await,
        Some(Command::Topic) => topic(&cli, &config).await,
        Some(Command::History) => history(&cli),
        Some(Command::Run) | None => run_bot(&cli, &config).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn build_generator(cli: &Cli, config: &BotConfig) -> Result<TopicGenerator<GeminiClient>, String> {
    let api_key = config
        .gemini_api_key
        .clone()
        .ok_or_else(|| format!("{ENV_GEMINI_KEY} is not set"))?;
    let backend = GeminiClient::new(api_key, &cli.model)?;
    Ok(TopicGenerator::new(
        backend,
        PromptStore::new(&cli.templates_dir),
    ))
}

fn build_slack(config: &BotConfig) -> Result<Arc<SlackClient>, String> {
    let bot_token = config
        .bot_token
        .clone()
        .ok_or_else(|| format!("{ENV_BOT_TOKEN} is not set"))?;
    Ok(Arc::new(SlackClient::new(bot_token)?))
}

fn parse_time(at: &str) -> Result<NaiveTime, String> {
    NaiveTime::parse_from_str(at, "%H:%M")
        .map_err(|e| format!("invalid --at value {at:?} (expected HH:MM): {e}"))
}

/// `send`: one delivery cycle, right now.
async fn send(cli: &Cli, config: &BotConfig) -> Result<(), String> {
    let generator = build_generator(cli, config)?;
    let slack = build_slack(config)?;
    let channel_id = config
        .channel_id
        .clone()
        .ok_or_else(|| format!("{ENV_CHANNEL_ID} is not set"))?;
    let ledger = TopicLedger::open(&cli.db)?;
    let sink = ChannelSink::new(slack, channel_id);

    let outcome = DeliveryCycle::new(&generator, &ledger, &sink)
        .run_once()
        .await?;
    info!(
        "Cycle complete: new topic {}, drained {:?}",
        outcome.topic_id, outcome.drained
    );
    Ok(())
}

/// `topic`: generate and print, nothing posted, nothing persisted.
async fn topic(cli: &Cli, config: &BotConfig) -> Result<(), String> {
    let generator = build_generator(cli, config)?;
    let (topic, source) = generator.generate_topic().await;
    println!("[{source}]");
    println!("{topic}");
    Ok(())
}

/// `history`: dump the ledger, newest first.
fn history(cli: &Cli) -> Result<(), String> {
    let ledger = TopicLedger::open(&cli.db)?;
    for record in ledger.all_topics()? {
        println!(
            "#{} [{}] source={} sent={}",
            record.id, record.created_at, record.prompt_source, record.answer_sent
        );
        println!("  topic:  {}", record.topic);
        match record.answer {
            Some(answer) => println!("  answer: {answer}"),
            None => println!("  answer: (none)"),
        }
    }
    Ok(())
}

/// `run`: the scheduler and the mention listener, concurrently. Each
/// component that is missing its credential is disabled with a console
/// warning; the other keeps running.
async fn run_bot(cli: &Cli, config: &BotConfig) -> Result<(), String> {
    let at = parse_time(&cli.at)?;
    let generator = build_generator(cli, config)?;
    let slack = build_slack(config)?;

    let scheduler = async {
        let Some(channel_id) = &config.channel_id else {
            eprintln!("Warning: {ENV_CHANNEL_ID} is not set; daily topic delivery is disabled.");
            return;
        };
        let ledger = match TopicLedger::open(&cli.db) {
            Ok(l) => l,
            Err(e) => {
                error!("Daily topic delivery disabled: {e}");
                return;
            }
        };
        let sink = ChannelSink::new(slack.clone(), channel_id.clone());
        DeliveryCycle::new(&generator, &ledger, &sink)
            .run_daily(at)
            .await;
    };

    let listener = async {
        let Some(app_token) = &config.app_token else {
            eprintln!("Warning: {ENV_APP_TOKEN} is not set; the mention listener is disabled.");
            return;
        };
        let socket = match SocketModeListener::new(app_token.clone()) {
            Ok(s) => s,
            Err(e) => {
                error!("Mention listener disabled: {e}");
                return;
            }
        };
        let (tx, mut rx) = mpsc::channel::<MentionEvent>(16);
        let responder = MentionResponder::new(&generator, slack.as_ref());

        let consume = async {
            while let Some(event) = rx.recv().await {
                responder.handle(&event).await;
            }
        };
        let listen = async {
            if let Err(e) = socket.run(tx).await {
                error!("Mention listener stopped: {e}");
            }
        };
        tokio::join!(consume, listen);
    };

    info!("⚡️ Ogiri Bot started!");
    tokio::join!(scheduler, listener);
    Ok(())
}
