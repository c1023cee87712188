//! SymptomBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use chrono::Utc;
use clap::Parser;
use colored::Colorize;
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::Path;
use symptombuddy::{
    cli::{Args, Commands, Verdict},
    config::Config,
    gating::{Gated, NeedsMoreDataMessage},
    memory::{
        types::{ConfidenceLevel, FeedbackEvent, MemorySummary, Observation},
        MemoryQuery, MemoryRecord,
    },
    recommend::{InMemoryLogRepository, ProtocolDefinition, RankedRecommendation, RecommendationRequest, UsageLog},
    session::{LearningConfig, LearningSystem},
    telemetry,
};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    telemetry::init(&config.logging.level, args.verbose);

    let system = LearningSystem::new(LearningConfig::from_config(&config))
        .context("Failed to open memory storage")?;

    run(&args, &system).await
}

async fn run(args: &Args, system: &LearningSystem) -> Result<()> {
    let user = args.user.as_str();

    match &args.command {
        Commands::Observe {
            memory_type,
            symptom,
            trigger,
            resolution,
            resolution_time,
            environment,
            time_of_day,
            at,
        } => {
            let observation = Observation {
                memory_type: (*memory_type).into(),
                symptom: symptom.clone(),
                trigger: trigger.clone(),
                resolution: resolution.clone(),
                resolution_time_descriptor: resolution_time.clone(),
                timestamp: at.unwrap_or_else(Utc::now),
                environmental_factor: environment.clone(),
                time_of_day: time_of_day.clone(),
            };

            let record = system.observe(user, observation).await?;
            if args.json {
                print_json(&record)?;
            } else {
                print_record(&record);
            }
        }

        Commands::Feedback { id, verdict } => {
            let event = match Verdict::from(*verdict) {
                Verdict::Outcome(outcome) => FeedbackEvent::Outcome {
                    memory_record_id: *id,
                    outcome,
                },
                Verdict::Judgment(user_judgment) => FeedbackEvent::Judgment {
                    memory_record_id: *id,
                    user_judgment,
                },
            };

            let record = system.feedback(user, event, Utc::now()).await?;
            if args.json {
                print_json(&record)?;
            } else {
                print_record(&record);
            }
        }

        Commands::Insights {
            symptom,
            trigger,
            memory_type,
            all,
        } => {
            let query = MemoryQuery {
                symptom: symptom.clone(),
                trigger: trigger.clone(),
                memory_type: memory_type.map(Into::into),
            };
            let now = Utc::now();

            let gated = if *all {
                Gated::Ready(system.summaries(user, &query, now).await?)
            } else {
                system.insights(user, &query, now).await?
            };

            if args.json {
                print_json(&gated)?;
            } else {
                match &gated {
                    Gated::Ready(summaries) if summaries.is_empty() => {
                        println!("{}", "Nothing learned yet.".dimmed());
                    }
                    Gated::Ready(summaries) => summaries.iter().for_each(print_summary),
                    Gated::NeedsMoreData(message) => print_needs_more_data(message),
                }
            }
        }

        Commands::Recommend {
            symptoms,
            protocols,
            logs,
        } => {
            let candidate_protocols: Vec<ProtocolDefinition> = read_json(protocols)?;
            let repository = match logs {
                Some(path) => {
                    let logs: HashMap<String, Vec<UsageLog>> = read_json(path)?;
                    InMemoryLogRepository::from(logs)
                }
                None => InMemoryLogRepository::new(),
            };

            let request = RecommendationRequest {
                target_symptoms: symptoms
                    .iter()
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect::<BTreeSet<String>>(),
                candidate_protocols,
            };

            let gated = system.recommend(&request, &repository).await;
            if args.json {
                print_json(&gated)?;
            } else {
                match &gated {
                    Gated::Ready(ranked) => print_ranking(ranked),
                    Gated::NeedsMoreData(message) => print_needs_more_data(message),
                }
            }
        }

        Commands::Reset { yes } => {
            if !*yes && !confirm(&format!("Forget everything learned for '{}'?", user))? {
                println!("Nothing changed.");
                return Ok(());
            }

            let affected = system.reset(user).await?;
            if args.json {
                print_json(&serde_json::json!({ "deactivated": affected }))?;
            } else {
                println!("{} {} learned associations set aside.", "✓".green(), affected);
            }
        }
    }

    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("Failed to parse {}", path.display()))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    io::stdout().flush()?;

    let mut answer = String::new();
    io::stdin().lock().read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

fn describe(symptom: Option<&str>, trigger: Option<&str>, resolution: Option<&str>) -> String {
    let mut parts = Vec::new();
    if let Some(trigger) = trigger {
        parts.push(format!("{} →", trigger));
    }
    if let Some(symptom) = symptom {
        parts.push(symptom.to_string());
    }
    if let Some(resolution) = resolution {
        parts.push(format!("⟶ {}", resolution));
    }
    parts.join(" ")
}

fn level_label(level: ConfidenceLevel) -> colored::ColoredString {
    match level {
        ConfidenceLevel::High => "high".green().bold(),
        ConfidenceLevel::Medium => "medium".yellow(),
        ConfidenceLevel::Low => "low".dimmed(),
    }
}

fn print_record(record: &MemoryRecord) {
    println!(
        "{} {} {}",
        "✓".green(),
        record.memory_type.to_string().cyan(),
        describe(
            record.symptom.as_deref(),
            record.trigger.as_deref(),
            record.resolution.as_deref()
        )
    );
    println!(
        "  id {}  seen {}×  confidence {:.2}",
        record.id.to_string().dimmed(),
        record.occurrence_count,
        record.confidence
    );
}

fn print_summary(summary: &MemorySummary) {
    let stale = if summary.is_stale { " (stale)".dimmed().to_string() } else { String::new() };
    println!(
        "{} {}{}",
        summary.memory_type.to_string().cyan(),
        describe(
            summary.symptom.as_deref(),
            summary.trigger.as_deref(),
            summary.resolution.as_deref()
        ),
        stale
    );
    println!(
        "  {} confidence ({:.2}, {:.2} now)  seen {}×  worked {}%  id {}",
        level_label(summary.confidence_level),
        summary.confidence,
        summary.decayed_confidence,
        summary.occurrence_count,
        summary.effectiveness_percentage,
        summary.record_id.to_string().dimmed()
    );
}

fn print_ranking(ranked: &[RankedRecommendation]) {
    for (position, recommendation) in ranked.iter().enumerate() {
        println!(
            "{}. {}  score {:.2}  (match {:.2}, effectiveness {:.2})",
            position + 1,
            recommendation.protocol_id.bold(),
            recommendation.final_score,
            recommendation.match_score,
            recommendation.effectiveness_score
        );
    }
}

fn print_needs_more_data(message: &NeedsMoreDataMessage) {
    println!("{}", message.text.yellow());
    if let Some(progress) = &message.current_progress {
        println!("  {}", progress.dimmed());
    }
    for item in &message.data_needed {
        println!("  • {}", item);
    }
}
