//! A stopwatch driven entirely by the runtime loop: an interval
//! subscription ticks while running, a compute effect formats a lap
//! summary off-thread, and the final state is verified against its own
//! replay.
//!
//! Run with: `cargo run --example stopwatch`

use clockwork::{
    Effect, EffectError, Engine, Program, Subscription, TokioEffectService, UpdateContext,
    UpdateResult,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Stopwatch {
    running: bool,
    ticks: u64,
    laps: Vec<u64>,
    summary: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum Msg {
    Tick,
    Lap,
    Stop,
    Summarized(String),
    SummaryFailed(String),
}

struct App;

impl Program for App {
    type Model = Stopwatch;
    type Msg = Msg;

    fn update(
        &self,
        model: &Stopwatch,
        msg: &Msg,
        _ctx: &mut UpdateContext<'_>,
    ) -> UpdateResult<Stopwatch, Msg> {
        let mut next = model.clone();
        match msg {
            Msg::Tick => {
                next.ticks += 1;
                UpdateResult::new(next)
            }
            Msg::Lap => {
                next.laps.push(next.ticks);
                UpdateResult::new(next)
            }
            Msg::Stop => {
                next.running = false;
                let laps = next.laps.clone();
                UpdateResult::new(next).with_effect(Effect::compute(
                    "summarize",
                    json!(laps),
                    |value| Msg::Summarized(value.as_str().unwrap_or_default().to_string()),
                    |err: EffectError| Msg::SummaryFailed(err.to_string()),
                ))
            }
            Msg::Summarized(text) => {
                next.summary = Some(text.clone());
                UpdateResult::new(next)
            }
            Msg::SummaryFailed(reason) => {
                next.summary = Some(format!("summary unavailable: {reason}"));
                UpdateResult::new(next)
            }
        }
    }

    fn subscriptions(&self, model: &Stopwatch) -> Vec<Subscription<Msg>> {
        if model.running {
            vec![Subscription::every(
                "tick",
                Duration::from_millis(20),
                || Msg::Tick,
            )]
        } else {
            Vec::new()
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let service = TokioEffectService::new().expect("started inside the tokio runtime");
    service.register_target("summarize", |laps| {
        let laps: Vec<u64> = serde_json::from_value(laps).map_err(|e| e.to_string())?;
        Ok(json!(format!("{} laps recorded: {:?}", laps.len(), laps)))
    });

    let engine = Engine::builder(
        App,
        Stopwatch {
            running: true,
            ticks: 0,
            laps: Vec::new(),
            summary: None,
        },
        service.clone(),
    )
    .subscription_runner(service)
    .on_commit(|snapshot| {
        tracing::info!(ticks = snapshot.ticks, running = snapshot.running, "committed");
    })
    .consistency_checks(true)
    .build();

    // Let it tick, take a couple of laps, then stop.
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.dispatch(Msg::Lap).expect("dispatch lap");
    tokio::time::sleep(Duration::from_millis(100)).await;
    engine.dispatch(Msg::Lap).expect("dispatch lap");
    engine.dispatch(Msg::Stop).expect("dispatch stop");

    // Give the summary computation time to land.
    tokio::time::sleep(Duration::from_millis(200)).await;

    let snapshot = engine.snapshot();
    println!("ticks: {}", snapshot.ticks);
    println!("laps:  {:?}", snapshot.laps);
    println!("summary: {}", snapshot.summary.as_deref().unwrap_or("<none>"));

    let determinism = engine.verify_determinism().expect("serializable state");
    println!(
        "replayed {} log entries, determinism match: {}",
        determinism.entries_checked, determinism.matched
    );

    engine.shutdown();
}
