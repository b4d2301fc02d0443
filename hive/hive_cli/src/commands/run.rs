//! The `run` command: drive a batch of actors and report the outcome.

use anyhow::{bail, Context};
use chrono::{DateTime, Utc};
use clap::Args;
use log::{debug, info, warn};
use serde::Serialize;
use std::time::{Duration, Instant};

use hive_actor::actor::{Actor, ActorOptions, ActorSystem, Behavior, Message, Reply};
use hive_actor::SystemConfig;

/// How long to wait for any single reply before counting it as failed
const REPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of actors to create
    #[clap(long, default_value_t = 4)]
    pub actors: usize,

    /// Messages sent to each actor
    #[clap(long, default_value_t = 100)]
    pub messages: usize,

    /// Messages per drain pass (defaults to the configured value)
    #[clap(long)]
    pub batch_quota: Option<usize>,

    /// Bound each mailbox to this many queued messages
    #[clap(long)]
    pub capacity: Option<usize>,

    /// Make every K-th message an actor receives fail
    #[clap(long)]
    pub fail_every: Option<usize>,

    /// Print the report as JSON
    #[clap(long)]
    pub json: bool,
}

/// Outcome of a run
#[derive(Debug, Serialize)]
pub struct RunReport {
    /// When the run started
    pub started_at: DateTime<Utc>,
    /// Actors created
    pub actors: usize,
    /// Messages sent to each actor
    pub messages: usize,
    /// Replies carrying a value
    pub succeeded: usize,
    /// Replies carrying an error
    pub failed: usize,
    /// Sends refused by a full mailbox
    pub rejected: usize,
    /// Wall-clock duration of the run
    pub elapsed_ms: u128,
}

/// Replies with the length of each payload, failing on schedule when asked.
struct Measure {
    fail_every: Option<usize>,
    seen: usize,
}

impl Behavior<String, usize> for Measure {
    fn on_message(&mut self, message: Message<String>) -> anyhow::Result<usize> {
        self.seen += 1;
        if let Some(k) = self.fail_every {
            if self.seen % k == 0 {
                bail!("message {} failed on purpose", self.seen);
            }
        }
        Ok(message.payload().len())
    }

    fn on_exception(&mut self, fault: &anyhow::Error) {
        debug!("Handler fault: {}", fault);
    }
}

/// Execute the run command
pub fn execute(args: &RunArgs, config: SystemConfig) -> anyhow::Result<()> {
    if args.fail_every == Some(0) {
        bail!("--fail-every must be greater than 0");
    }

    let report = drive(args, config)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Run started at {}", report.started_at.to_rfc3339());
        println!("Actors:    {}", report.actors);
        println!("Messages:  {} per actor", report.messages);
        println!("Succeeded: {}", report.succeeded);
        println!("Failed:    {}", report.failed);
        println!("Rejected:  {}", report.rejected);
        println!("Elapsed:   {} ms", report.elapsed_ms);
    }

    Ok(())
}

fn drive(args: &RunArgs, config: SystemConfig) -> anyhow::Result<RunReport> {
    let started_at = Utc::now();
    let clock = Instant::now();

    let system = ActorSystem::with_config(config).context("invalid system configuration")?;

    let actors = (0..args.actors)
        .map(|i| {
            let mut options = ActorOptions::new().with_id(format!("worker-{}", i));
            if let Some(quota) = args.batch_quota {
                options = options.with_batch_quota(quota);
            }
            if let Some(capacity) = args.capacity {
                options = options.with_mailbox_capacity(capacity);
            }

            let behavior = Measure {
                fail_every: args.fail_every,
                seen: 0,
            };
            system.create(behavior, options)
        })
        .collect::<Result<Vec<Actor<String, usize>>, _>>()
        .context("failed to create actors")?;

    info!(
        "Sending {} messages to each of {} actors",
        args.messages,
        actors.len()
    );

    let mut replies: Vec<Reply<usize>> = Vec::with_capacity(args.actors * args.messages);
    let mut rejected = 0;
    for round in 0..args.messages {
        for actor in &actors {
            match actor.ask(format!("{}:{}", actor.id(), round)) {
                Ok(reply) => replies.push(reply),
                Err(e) => {
                    debug!("Send to {} refused: {}", actor.id(), e);
                    rejected += 1;
                }
            }
        }
    }

    let mut succeeded = 0;
    let mut failed = 0;
    for reply in replies {
        match reply.wait_timeout(REPLY_TIMEOUT) {
            Ok(_) => succeeded += 1,
            Err(e) => {
                debug!("Message {} failed: {}", reply.message_id(), e);
                failed += 1;
            }
        }
    }

    if rejected > 0 {
        warn!("{} messages were refused by full mailboxes", rejected);
    }

    system.shutdown();

    Ok(RunReport {
        started_at,
        actors: args.actors,
        messages: args.messages,
        succeeded,
        failed,
        rejected,
        elapsed_ms: clock.elapsed().as_millis(),
    })
}
