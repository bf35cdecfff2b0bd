//! `stormbot-cli` – the robot's ignition switch.
//!
//! Starts the whole stack:
//!
//! 1. Loads (or creates) `~/.stormbot/config.toml` and applies `STORMBOT_*`
//!    environment overrides.
//! 2. Wires the HAL, sensor cache, busy gate, request budget, oracle client,
//!    executor, and decision engine.
//! 3. Spawns the four loops: obstacle watchdog, autonomous scheduler,
//!    command-queue processor, and button dispatcher, plus the stdin reader
//!    that feeds the command queue.
//! 4. Intercepts **Ctrl-C** (and the `exit`/`quit` terminal commands) to stop
//!    every loop and force the motors idle exactly once on the way out.

mod config;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use colored::Colorize;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tracing::{info, warn};

use stormbot_hal::sim::{SimActuators, SimColor, SimGyro, SimProximity, SimTouch};
use stormbot_hal::{Actuators, ConsoleLights, EspeakSpeech, SpeechOutput, StatusColor, StatusLights};
use stormbot_kernel::{BusyGate, RequestBudget};
use stormbot_perception::SensorCache;
use stormbot_runtime::producers::{
    run_autonomous_scheduler, run_button_dispatcher, run_command_queue,
};
use stormbot_runtime::{ActionHistory, DecisionEngine, Executor, ObstacleMonitor, OracleClient};
use stormbot_types::Color;

#[tokio::main]
async fn main() {
    // ── Structured logging ────────────────────────────────────────────────
    // Initialise tracing-subscriber using RUST_LOG (defaults to "info").
    // Set STORMBOT_LOG_FORMAT=json to emit newline-delimited JSON logs for
    // log aggregators. User-facing output still uses println! for UX.
    let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&log_level));

    if std::env::var("STORMBOT_LOG_FORMAT").as_deref() == Ok("json") {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .compact()
            .init();
    }

    print_banner();

    // ── Configuration ─────────────────────────────────────────────────────
    let cfg = match config::load() {
        Ok(Some(cfg)) => {
            println!(
                "  Config loaded from {}",
                config::config_path().display().to_string().bold()
            );
            cfg
        }
        Ok(None) => {
            let cfg = config::Config::default();
            match config::save(&cfg) {
                Ok(()) => println!(
                    "  No config found; wrote defaults to {}",
                    config::config_path().display().to_string().bold()
                ),
                Err(e) => println!("{}: {}", "Could not write default config".yellow(), e),
            }
            cfg
        }
        Err(e) => {
            println!("{}: {}", "Config error".red(), e);
            println!("  Using default configuration.");
            config::Config::default()
        }
    };
    let limits = cfg.limits.clone();

    // ── Hardware wiring ───────────────────────────────────────────────────
    // The physical motor/sensor drivers are an external collaborator; this
    // binary runs against the in-process sim bank so the full stack can be
    // exercised on a workstation.
    let actuators: Arc<dyn Actuators> = Arc::new(SimActuators::new());
    let speech: Arc<dyn SpeechOutput> = Arc::new(EspeakSpeech::new(cfg.voice.clone()));
    let lights: Arc<dyn StatusLights> = Arc::new(ConsoleLights);

    let mut cache = SensorCache::new(&limits)
        .with_proximity(Arc::new(SimProximity::fixed(100)))
        .with_color(Arc::new(SimColor::fixed(Color::NoColor)))
        .with_touch(Arc::new(SimTouch::new()));
    if cfg.use_gyro {
        cache = cache.with_gyro(Arc::new(SimGyro::fixed(0)));
    }
    let cache = Arc::new(cache);

    print_startup_report(&cfg, cache.has_gyro());

    // ── Shared state ──────────────────────────────────────────────────────
    let shutdown = Arc::new(AtomicBool::new(false));
    let gate = Arc::new(BusyGate::new());
    let budget = Arc::new(RequestBudget::new(
        limits.daily_request_limit,
        limits.enable_request_limit,
    ));
    let history = Arc::new(ActionHistory::new());
    let oracle = Arc::new(OracleClient::new(
        cfg.oracle_url.clone(),
        cfg.oracle_model.clone(),
        cfg.oracle_api_key.clone(),
    ));

    let executor = Arc::new(Executor::new(
        Arc::clone(&actuators),
        Arc::clone(&speech),
        Arc::clone(&lights),
        Arc::clone(&cache),
        limits.clone(),
        Arc::clone(&shutdown),
    ));
    let engine = Arc::new(DecisionEngine::new(
        oracle,
        budget,
        history,
        Arc::clone(&cache),
        gate,
        Arc::clone(&executor),
        limits,
    ));
    let monitor = Arc::new(ObstacleMonitor::new(Arc::clone(&engine)));

    // ── Ctrl-C handler ────────────────────────────────────────────────────
    let ctrlc_shutdown = Arc::clone(&shutdown);
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – shutting down …".yellow().bold());
        ctrlc_shutdown.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "failed to install Ctrl-C handler; use 'exit' to stop");
    }

    // ── Task spawn ────────────────────────────────────────────────────────
    executor.set_lights(StatusColor::Amber);
    executor.announce("Systems online. Sensors checked. Ready to roll!");

    let (command_tx, command_rx) = mpsc::unbounded_channel();

    let mut handles = Vec::new();
    handles.push(tokio::spawn(
        Arc::clone(&monitor).run(Arc::clone(&shutdown)),
    ));
    handles.push(tokio::spawn(run_autonomous_scheduler(
        Arc::clone(&engine),
        Arc::clone(&monitor),
        Arc::clone(&shutdown),
    )));
    handles.push(tokio::spawn(run_command_queue(
        Arc::clone(&engine),
        Arc::clone(&monitor),
        command_rx,
        Arc::clone(&shutdown),
    )));
    handles.push(tokio::spawn(run_button_dispatcher(
        Arc::clone(&engine),
        Arc::clone(&monitor),
        Arc::clone(&shutdown),
    )));

    // Stdin reader feeding the command queue. `exit`/`quit` stop the robot
    // the same way Ctrl-C does.
    let reader_shutdown = Arc::clone(&shutdown);
    tokio::spawn(async move {
        let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
        loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim().to_string();
                    if line.is_empty() {
                        continue;
                    }
                    if line.eq_ignore_ascii_case("exit") || line.eq_ignore_ascii_case("quit") {
                        reader_shutdown.store(true, Ordering::SeqCst);
                        break;
                    }
                    println!("  [terminal] command queued: {}", line.bold());
                    if command_tx.send(line).is_err() {
                        break;
                    }
                }
                Ok(None) => break,
                Err(e) => {
                    warn!(error = %e, "stdin read failed");
                    break;
                }
            }
        }
    });

    println!();
    println!("  Type a command and press Enter, e.g. {}", "\"drive forward\"".bold());
    println!("  Type {} or press Ctrl-C to stop.\n", "exit".bold().cyan());

    // ── Wait for shutdown ─────────────────────────────────────────────────
    while !shutdown.load(Ordering::SeqCst) {
        tokio::time::sleep(Duration::from_millis(200)).await;
    }

    // Give the loops a moment to wind down, then force the motors idle
    // exactly once regardless of which loop held the gate.
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(2), handle).await;
    }
    executor.all_stop();
    executor.announce("Shutting down. See you soon!");
    executor.set_lights(StatusColor::Green);
    info!("robot stopped");
    println!("{}", "  ✓ Motors idle. Goodbye.".green());
}

// ─────────────────────────────────────────────────────────────────────────────
// Banner and startup report
// ─────────────────────────────────────────────────────────────────────────────

fn print_banner() {
    println!();
    println!("{}", r#"   ______________  ___  __  ______  ____  ______"#.bold().cyan());
    println!("{}", r#"  / __/_  __/ __ \/ _ \/  |/  / _ )/ __ \/_  __/"#.bold().cyan());
    println!("{}", r#" _\ \  / / / /_/ / , _/ /|_/ / _  / /_/ / / /   "#.bold().cyan());
    println!("{}", r#"/___/ /_/  \____/_/|_/_/  /_/____/\____/ /_/    "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "Stormbot".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Oracle-advised robot with hard safety bounds");
    println!();
}

fn print_startup_report(cfg: &config::Config, gyro_available: bool) {
    println!();
    println!("  Sensor check:");
    println!("    • touch sensor    {}", "OK".green());
    println!("    • IR sensor       {}", "OK".green());
    println!("    • color sensor    {}", "OK".green());
    if cfg.use_gyro {
        println!(
            "    • gyro            {}",
            if gyro_available { "OK".green() } else { "absent".yellow() }
        );
    }
    println!();
    println!("  Oracle model: {}", cfg.oracle_model.bold());
    println!(
        "  Daily request limit: {}",
        if cfg.limits.enable_request_limit {
            cfg.limits.daily_request_limit.to_string()
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  Autonomous interval: {}–{} s",
        cfg.limits.autonomous_interval_min, cfg.limits.autonomous_interval_max
    );
    println!("  Obstacle distance: {} units", cfg.limits.obstacle_distance);
    println!(
        "  Max actions per sequence: {}",
        cfg.limits.max_sequence_actions
    );
}
