//! Command-line argument parsing for SymptomBuddy
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::memory::types::{MemoryType, Outcome, UserJudgment};

/// SymptomBuddy - learn what triggers your symptoms and what relieves them
#[derive(Parser, Debug)]
#[command(name = "symptombuddy")]
#[command(version)]
#[command(about = "Learn what triggers your symptoms and what relieves them", long_about = None)]
pub struct Args {
    /// Whose memory to use
    #[arg(short, long, default_value = "default", global = true)]
    pub user: String,

    /// Configuration file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbosity level: -v (info), -vv (debug), -vvv (trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Log an observation (symptom, trigger, what helped)
    Observe {
        /// Kind of association
        #[arg(short = 't', long = "type", value_enum)]
        memory_type: MemoryTypeArg,

        #[arg(long)]
        symptom: Option<String>,

        #[arg(long)]
        trigger: Option<String>,

        #[arg(long)]
        resolution: Option<String>,

        /// Free-text bucket such as "within 2 hours"
        #[arg(long)]
        resolution_time: Option<String>,

        #[arg(long)]
        environment: Option<String>,

        #[arg(long)]
        time_of_day: Option<String>,

        /// When it happened (RFC 3339), defaults to now
        #[arg(long)]
        at: Option<DateTime<Utc>>,
    },

    /// Report how a remedy went, or confirm/deny a learned association
    Feedback {
        /// Memory record id
        id: uuid::Uuid,

        #[arg(value_enum)]
        verdict: VerdictArg,
    },

    /// Show what has been learned
    Insights {
        #[arg(long)]
        symptom: Option<String>,

        #[arg(long)]
        trigger: Option<String>,

        #[arg(short = 't', long = "type", value_enum)]
        memory_type: Option<MemoryTypeArg>,

        /// Skip the "still learning" gate and list every match
        #[arg(long)]
        all: bool,
    },

    /// Rank protocols for the symptoms you have right now
    Recommend {
        /// Current symptom (repeatable)
        #[arg(short, long = "symptom")]
        symptoms: Vec<String>,

        /// JSON file with protocol definitions: [{"id", "symptoms"}]
        #[arg(long)]
        protocols: PathBuf,

        /// JSON file mapping protocol id to usage logs
        #[arg(long)]
        logs: Option<PathBuf>,
    },

    /// Forget everything learned (records are kept, but deactivated)
    Reset {
        /// Do not ask for confirmation
        #[arg(long)]
        yes: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MemoryTypeArg {
    WhatWorked,
    WhatDidntWork,
    Trigger,
    Pattern,
    Correlation,
    Preference,
}

impl From<MemoryTypeArg> for MemoryType {
    fn from(arg: MemoryTypeArg) -> Self {
        match arg {
            MemoryTypeArg::WhatWorked => MemoryType::WhatWorked,
            MemoryTypeArg::WhatDidntWork => MemoryType::WhatDidntWork,
            MemoryTypeArg::Trigger => MemoryType::Trigger,
            MemoryTypeArg::Pattern => MemoryType::Pattern,
            MemoryTypeArg::Correlation => MemoryType::Correlation,
            MemoryTypeArg::Preference => MemoryType::Preference,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum VerdictArg {
    Success,
    Failure,
    Confirm,
    Deny,
}

/// Feedback kind a verdict maps to
pub enum Verdict {
    Outcome(Outcome),
    Judgment(UserJudgment),
}

impl From<VerdictArg> for Verdict {
    fn from(arg: VerdictArg) -> Self {
        match arg {
            VerdictArg::Success => Verdict::Outcome(Outcome::Success),
            VerdictArg::Failure => Verdict::Outcome(Outcome::Failure),
            VerdictArg::Confirm => Verdict::Judgment(UserJudgment::Confirm),
            VerdictArg::Deny => Verdict::Judgment(UserJudgment::Deny),
        }
    }
}
