//! PrizeForge batch draw simulator
//!
//! Runs a synthetic campaign (one calendar prize, two weighted prizes,
//! an explicit no-win share) through the drawing engine and reports
//! outcome frequencies, so a campaign configuration can be sanity-checked
//! before it goes live.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use clap::Parser;
use serde::Serialize;
use uuid::Uuid;

use pf_core::{PrizeId, Timestamp};
use pf_engine::{
    Campaign, DrawContext, DrawEngine, FraudPolicy, MemoryAuditSink, MemoryStore, OsRandomSource,
    Prize, PrizeKind, RandomSource, SeededRandomSource, TimeSlot,
};

#[derive(Parser, Debug)]
#[command(name = "pf-sim", about = "PrizeForge batch draw simulator")]
struct Args {
    /// Number of simulated participations
    #[arg(long, default_value_t = 10_000)]
    draws: u32,

    /// Seed for a deterministic run; omit to draw from the OS CSPRNG
    #[arg(long)]
    seed: Option<u64>,

    /// Weight of prize A
    #[arg(long, default_value_t = 30.0)]
    weight_a: f64,

    /// Weight of prize B
    #[arg(long, default_value_t = 10.0)]
    weight_b: f64,

    /// Explicit losing share of the probability mass
    #[arg(long, default_value_t = 60.0)]
    no_win_weight: f64,

    /// Stock of the calendar prize (one slot per unit)
    #[arg(long, default_value_t = 3)]
    calendar_stock: u32,

    /// Emit the summary as JSON instead of a table
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Default, Serialize)]
struct Summary {
    draws: u32,
    calendar_wins: u32,
    wins: BTreeMap<String, u32>,
    losses: u32,
    audit_records: usize,
}

fn demo_campaign(args: &Args, now: Timestamp) -> Campaign {
    let mut campaign = Campaign::new("sim")
        .with_no_win_weight(args.no_win_weight)
        .with_fraud_policy(FraudPolicy {
            cooldown_secs: 0,
            max_participations: u32::MAX,
        });

    // Calendar prize: one currently-open slot per stock unit, so the
    // first draws of the run land calendar wins.
    let slots: Vec<TimeSlot> = (0..args.calendar_stock)
        .map(|i| TimeSlot::new(format!("slot-{i}"), now, now + Duration::minutes(5)))
        .collect();
    campaign.push_prize(Prize {
        id: "golden-hour".into(),
        campaign_id: "sim".into(),
        label: "Golden hour".into(),
        kind: PrizeKind::Calendar { slots },
        total_stock: args.calendar_stock,
        remaining_stock: args.calendar_stock,
    });

    for (id, label, weight) in [
        ("prize-a", "Prize A", args.weight_a),
        ("prize-b", "Prize B", args.weight_b),
    ] {
        campaign.push_prize(Prize {
            id: id.into(),
            campaign_id: "sim".into(),
            label: label.into(),
            kind: PrizeKind::Probability { weight },
            total_stock: args.draws,
            remaining_stock: args.draws,
        });
    }
    campaign
}

fn main() {
    env_logger::init();
    let args = Args::parse();
    log::info!("simulating {} draws", args.draws);

    let now = Utc::now();
    let store = Arc::new(MemoryStore::new());
    store.insert_campaign(demo_campaign(&args, now));
    let audit = Arc::new(MemoryAuditSink::new());

    let rng: Box<dyn RandomSource> = match args.seed {
        Some(seed) => Box::new(SeededRandomSource::new(seed)),
        None => Box::new(OsRandomSource),
    };
    let engine = DrawEngine::new(Arc::clone(&store), Arc::clone(&audit), rng);

    let mut summary = Summary {
        draws: args.draws,
        ..Summary::default()
    };
    let calendar_id = PrizeId::new("golden-hour");

    for _ in 0..args.draws {
        let ctx = DrawContext {
            participation_id: Uuid::new_v4().to_string().into(),
            campaign_id: "sim".into(),
            server_time: now,
            identity_fingerprint: Uuid::new_v4().to_string(),
            trace_id: Uuid::new_v4().to_string().into(),
        };
        match engine.draw(&ctx) {
            Ok(outcome) => match outcome.result.prize_id() {
                Some(prize_id) => {
                    if prize_id == &calendar_id {
                        summary.calendar_wins += 1;
                    }
                    *summary.wins.entry(prize_id.to_string()).or_default() += 1;
                }
                None => summary.losses += 1,
            },
            Err(error) => {
                log::error!("draw failed: {error}");
                std::process::exit(1);
            }
        }
    }
    summary.audit_records = audit.len();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&summary).unwrap());
        return;
    }

    let n = summary.draws.max(1) as f64;
    println!("draws          {:>8}", summary.draws);
    for (prize, wins) in &summary.wins {
        println!(
            "win {prize:<11}{wins:>8}  ({:5.2}%)",
            *wins as f64 / n * 100.0
        );
    }
    println!(
        "losses         {:>8}  ({:5.2}%)",
        summary.losses,
        summary.losses as f64 / n * 100.0
    );
    println!("audit records  {:>8}", summary.audit_records);
}
