//! `lattix`: command-line client for the Lattix progression service.
//!
//! # Usage
//!
//! ```
//! lattix --url http://localhost:8080 signup --email ada@example.com
//! lattix --user <uuid> roadmap
//! lattix --config ~/.config/lattix/config.toml complete
//! ```

mod app;
mod client;

use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use app::Session;
use clap::{Parser, Subcommand};
use client::{ApiClient, ApiConfig};
use lattix_core::{
  roadmap::{NewRoadmap, RoadmapView, StepPlan, StepStatus},
  testimonial::TestimonialState,
  user::{NewUser, ReminderSettings, User},
};
use serde::Deserialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "lattix", about = "Command-line client for the Lattix progression service")]
struct Args {
  /// Path to a TOML config file (url, user).
  #[arg(short, long, value_name = "FILE")]
  config: Option<PathBuf>,

  /// Base URL of the lattix server (default: http://localhost:8080).
  #[arg(long, env = "LATTIX_URL")]
  url: Option<String>,

  /// The user to act as.
  #[arg(long, env = "LATTIX_USER")]
  user: Option<Uuid>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Create a user and print its id.
  Signup {
    #[arg(long)]
    email: String,
    #[arg(long)]
    name:  Option<String>,
  },
  /// Show the current user.
  Whoami,
  /// Delete the current user and everything attached to it.
  DeleteAccount,
  /// Set the daily reminder.
  Reminders {
    /// Local time, HH:MM.
    #[arg(long)]
    time:     Option<String>,
    /// IANA timezone, e.g. Europe/Berlin.
    #[arg(long)]
    timezone: Option<String>,
    /// Turn reminders off.
    #[arg(long)]
    off:      bool,
  },
  /// Move the testimonial prompt state, e.g. `asked_first`.
  Testimonial { state: String },
  /// Show the current roadmap.
  Roadmap,
  /// List all roadmaps, newest first.
  Roadmaps,
  /// Start a new roadmap; the previous one is archived.
  Start {
    #[arg(long)]
    title:       String,
    /// Content ids in step order.
    #[arg(required = true)]
    content_ids: Vec<String>,
  },
  /// Complete a step (default: the current one) and unlock the next.
  Complete { step: Option<Uuid> },
  /// Commit the plan for a step (default: the current one).
  Plan {
    #[arg(long)]
    step:      Option<Uuid>,
    #[arg(long)]
    situation: String,
    #[arg(long)]
    trigger:   String,
    #[arg(long)]
    action:    String,
  },
  /// Show reminder delivery history.
  History {
    #[arg(long)]
    limit: Option<usize>,
  },
  /// Run the reminder check once, as the scheduler would.
  CheckReminders {
    #[arg(long, env = "LATTIX_CRON_SECRET")]
    secret: String,
  },
}

// ─── Config file ─────────────────────────────────────────────────────────────

/// Shape of the optional TOML config file.
#[derive(Deserialize, Default)]
struct ConfigFile {
  #[serde(default)]
  url:  Option<String>,
  #[serde(default)]
  user: Option<Uuid>,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();

  let file_cfg: ConfigFile = if let Some(path) = &args.config {
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading config file {}", path.display()))?;
    toml::from_str(&raw).context("parsing config file")?
  } else {
    ConfigFile::default()
  };

  // CLI flags and env override the config file, which overrides defaults.
  let base_url = args
    .url
    .or(file_cfg.url)
    .unwrap_or_else(|| "http://localhost:8080".to_string());
  let user = args.user.or(file_cfg.user);

  let mut session = Session::new(ApiClient::new(ApiConfig { base_url })?);
  run(&mut session, user, args.command).await
}

fn require_user(user: Option<Uuid>) -> Result<Uuid> {
  user.ok_or_else(|| anyhow!("no user given; pass --user or set LATTIX_USER"))
}

async fn run(session: &mut Session, user: Option<Uuid>, command: Command) -> Result<()> {
  match command {
    Command::Signup { email, name } => {
      let user = session
        .client
        .create_user(&NewUser { email, display_name: name })
        .await?;
      println!("{}", user.user_id);
    }
    Command::Whoami => {
      let user = session.client.get_user(require_user(user)?).await?;
      print_user(&user);
    }
    Command::DeleteAccount => {
      let user_id = require_user(user)?;
      session.delete_user(user_id).await?;
      println!("deleted {user_id}");
    }
    Command::Reminders { time, timezone, off } => {
      let settings = ReminderSettings { enabled: !off && time.is_some(), time, timezone };
      let user = session
        .client
        .update_reminders(require_user(user)?, &settings)
        .await?;
      print_user(&user);
    }
    Command::Testimonial { state } => {
      let state: TestimonialState = state
        .parse()
        .map_err(|_| anyhow!("unknown testimonial state {state:?}"))?;
      let user = session
        .client
        .transition_testimonial(require_user(user)?, state)
        .await?;
      println!("testimonial: {}", user.testimonial_state);
    }
    Command::Roadmap => match session.current_roadmap(require_user(user)?).await? {
      Some(view) => print_roadmap(&view),
      None => println!("no roadmap yet; start one with `lattix start`"),
    },
    Command::Roadmaps => {
      for roadmap in session.client.list_roadmaps(require_user(user)?).await? {
        println!(
          "{}  {:<9}  {}  {}",
          roadmap.roadmap_id,
          roadmap.status,
          roadmap.created_at.format("%Y-%m-%d"),
          roadmap.title
        );
      }
    }
    Command::Start { title, content_ids } => {
      let view = session
        .create_roadmap(&NewRoadmap { user_id: require_user(user)?, title, content_ids })
        .await?;
      print_roadmap(&view);
    }
    Command::Complete { step } => {
      let user_id = require_user(user)?;
      let completion = session.complete_step(user_id, step).await?;
      println!("completed step {}", completion.completed.order);
      match &completion.unlocked {
        Some(next) => println!("unlocked step {} ({})", next.order, next.content_id),
        None if completion.roadmap_finished => println!("roadmap finished"),
        None => {}
      }
      if let Some(view) = session.current_roadmap(user_id).await? {
        let progress = view.progress();
        println!("progress: {}/{}", progress.completed, progress.total);
      }
    }
    Command::Plan { step, situation, trigger, action } => {
      let plan = StepPlan { situation, trigger, action };
      let step = session
        .commit_plan(require_user(user)?, step, &plan)
        .await?;
      println!("plan saved for step {} ({})", step.order, step.content_id);
    }
    Command::History { limit } => {
      for log in session.client.notifications(require_user(user)?, limit).await? {
        println!(
          "{}  {:<7}  {}",
          log.created_at.format("%Y-%m-%d %H:%M"),
          log.status,
          log.detail.as_deref().unwrap_or("")
        );
      }
    }
    Command::CheckReminders { secret } => {
      let summary = session.client.check_reminders(&secret).await?;
      println!(
        "checked {} · due {} · sent {} · skipped {} · failed {}",
        summary.checked, summary.due, summary.sent, summary.skipped, summary.failed
      );
    }
  }
  Ok(())
}

// ─── Output ──────────────────────────────────────────────────────────────────

fn print_user(user: &User) {
  println!("{}  {}", user.user_id, user.email);
  if let Some(name) = &user.display_name {
    println!("name:        {name}");
  }
  let reminders = &user.reminders;
  match (&reminders.time, reminders.enabled) {
    (Some(time), true) => println!("reminders:   {time} {}", reminders.timezone),
    _ => println!("reminders:   off"),
  }
  println!("testimonial: {}", user.testimonial_state);
}

fn print_roadmap(view: &RoadmapView) {
  let progress = view.progress();
  println!(
    "{} [{}] {}/{}",
    view.roadmap.title, view.roadmap.status, progress.completed, progress.total
  );
  for step in &view.steps {
    let marker = match step.status {
      StepStatus::Completed => "✓",
      StepStatus::Unlocked => "▶",
      StepStatus::Locked => "·",
    };
    println!("  {marker} {:>2}. {}  {}", step.order, step.content_id, step.step_id);
    if let Some(plan) = &step.plan {
      println!(
        "       in {}, when {}, {}",
        plan.situation, plan.trigger, plan.action
      );
    }
  }
}
