//! [`DecisionEngine`] – the shared request→validate→execute cycle.
//!
//! All three producers (autonomous scheduler, command queue, button
//! dispatcher) and the obstacle watchdog drive their decisions through this
//! one type, so the budget, history, gate, and validation rules are applied
//! identically no matter who asked.

use std::sync::Arc;

use tracing::{debug, info, warn};

use stormbot_kernel::{BusyGate, RequestBudget};
use stormbot_perception::SensorCache;
use stormbot_types::{
    ActionCommand, ActionKind, ActionSequence, DecisionContext, Limits, SensorSnapshot,
};

use crate::executor::Executor;
use crate::history::ActionHistory;
use crate::json_extract::extract_json;
use crate::obstacle::ObstacleMonitor;
use crate::oracle::{DecisionOracle, GenerationSettings, OracleError};
use crate::{prompt, validator};

/// How many history entries are fed back into prompts.
const PROMPT_HISTORY: usize = 3;

/// How one producer cycle ended. Used for logging and tests; producers do
/// not branch on most of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// A decision was validated and executed.
    Executed,
    /// Another producer holds the actuators.
    SkippedBusy,
    /// The daily request budget is exhausted.
    SkippedBudget,
    /// An obstacle was inside the safety distance; the obstacle path ran
    /// instead of a normal decision.
    Redirected,
    /// The oracle yielded nothing usable; the cycle was dropped.
    NoDecision,
}

/// Owns one oracle round-trip end to end: prompt, budget, validation,
/// history, gated execution.
pub struct DecisionEngine {
    oracle: Arc<dyn DecisionOracle>,
    budget: Arc<RequestBudget>,
    history: Arc<ActionHistory>,
    cache: Arc<SensorCache>,
    gate: Arc<BusyGate>,
    executor: Arc<Executor>,
    limits: Limits,
}

impl DecisionEngine {
    pub fn new(
        oracle: Arc<dyn DecisionOracle>,
        budget: Arc<RequestBudget>,
        history: Arc<ActionHistory>,
        cache: Arc<SensorCache>,
        gate: Arc<BusyGate>,
        executor: Arc<Executor>,
        limits: Limits,
    ) -> Self {
        Self {
            oracle,
            budget,
            history,
            cache,
            gate,
            executor,
            limits,
        }
    }

    pub fn cache(&self) -> &Arc<SensorCache> {
        &self.cache
    }

    pub fn gate(&self) -> &Arc<BusyGate> {
        &self.gate
    }

    pub fn executor(&self) -> &Arc<Executor> {
        &self.executor
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// One full producer cycle: skip if busy or out of budget, snapshot,
    /// redirect to the obstacle path when something is already close,
    /// otherwise decide and execute under the gate.
    pub async fn run_cycle(
        &self,
        monitor: &ObstacleMonitor,
        context: DecisionContext,
        user_prompt: &str,
    ) -> CycleOutcome {
        if self.gate.is_held() {
            return CycleOutcome::SkippedBusy;
        }
        if !self.budget.allow() {
            debug!("request budget exhausted, skipping cycle");
            return CycleOutcome::SkippedBudget;
        }

        let snapshot = self.cache.snapshot().await;
        if snapshot.ir_distance < self.limits.safety_distance {
            info!(
                distance = snapshot.ir_distance,
                "obstacle inside safety distance, redirecting to reaction path"
            );
            monitor.try_react().await;
            return CycleOutcome::Redirected;
        }

        let Some(sequence) = self.decide(context, user_prompt, &snapshot).await else {
            return CycleOutcome::NoDecision;
        };

        let Some(_guard) = self.gate.acquire_guard() else {
            return CycleOutcome::SkippedBusy;
        };
        self.executor.execute(&sequence).await;
        CycleOutcome::Executed
    }

    /// Request and validate a general-path decision. `None` means "skip this
    /// cycle": the oracle was unavailable, rate-limited, or returned nothing
    /// extractable. The budget is only consumed on a successful call.
    async fn decide(
        &self,
        context: DecisionContext,
        user_prompt: &str,
        snapshot: &SensorSnapshot,
    ) -> Option<ActionSequence> {
        let recent = self.history.recent(PROMPT_HISTORY);
        let text = prompt::build_decision_prompt(context, user_prompt, snapshot, &recent, &self.limits);

        let reply = match self.oracle.complete(&text, &GenerationSettings::GENERAL).await {
            Ok(reply) => reply,
            Err(OracleError::RateLimited) => {
                info!("oracle rate-limited, skipping cycle");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "oracle request failed");
                return None;
            }
        };
        self.budget.consume();
        debug!(remaining = %self.budget.remaining(), "oracle call succeeded");

        let Some(payload) = extract_json(&reply) else {
            warn!("no JSON found in oracle reply");
            return None;
        };

        let sequence = validator::validate(&payload, context, &self.limits);
        for command in &sequence {
            self.history.record(command);
        }
        Some(sequence)
    }

    /// Obstacle-path decision. Never empty: if the oracle or extraction
    /// fails, the built-in back-away reaction is substituted, because leaving
    /// an obstacle unaddressed is not an option.
    pub async fn obstacle_decision(&self, distance: u8) -> ActionSequence {
        if !self.budget.allow() {
            return fallback_reaction();
        }

        let text = prompt::build_obstacle_prompt(distance);
        let reply = match self.oracle.complete(&text, &GenerationSettings::OBSTACLE).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "obstacle oracle request failed, using default reaction");
                return fallback_reaction();
            }
        };
        self.budget.consume();
        debug!(remaining = %self.budget.remaining(), "obstacle oracle call succeeded");

        let Some(payload) = extract_json(&reply) else {
            warn!("no JSON in obstacle reply, using default reaction");
            return fallback_reaction();
        };

        let sequence = validator::validate(&payload, DecisionContext::Obstacle, &self.limits);
        if sequence.is_empty() {
            return fallback_reaction();
        }
        sequence
    }
}

/// Built-in obstacle reaction: announce and back away.
pub fn fallback_reaction() -> ActionSequence {
    vec![ActionCommand {
        kind: ActionKind::MoveBackward,
        speed: 40,
        duration: 1.5,
        angle: 0,
        speech: "Obstacle ahead! Backing away.".to_string(),
    }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oracle::OracleError;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::AtomicBool;
    use stormbot_hal::sim::{RecordingLights, RecordingSpeech, SimActuators, SimProximity};
    use stormbot_kernel::Remaining;

    /// Oracle stub replaying canned outcomes.
    struct StubOracle {
        replies: Mutex<Vec<Result<String, OracleError>>>,
    }

    impl StubOracle {
        fn replying(replies: Vec<Result<String, OracleError>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies),
            })
        }

        fn always(reply: &str) -> Arc<Self> {
            Self::replying(vec![Ok(reply.to_string())])
        }
    }

    fn clone_outcome(outcome: &Result<String, OracleError>) -> Result<String, OracleError> {
        match outcome {
            Ok(s) => Ok(s.clone()),
            Err(OracleError::RateLimited) => Err(OracleError::RateLimited),
            Err(OracleError::BadResponse(m)) => Err(OracleError::BadResponse(m.clone())),
            Err(OracleError::Http(_)) => Err(OracleError::BadResponse("http".into())),
        }
    }

    #[async_trait]
    impl DecisionOracle for StubOracle {
        async fn complete(
            &self,
            _prompt: &str,
            _settings: &GenerationSettings,
        ) -> Result<String, OracleError> {
            let mut replies = self.replies.lock().unwrap();
            if replies.len() > 1 {
                replies.remove(0)
            } else {
                replies
                    .first()
                    .map(clone_outcome)
                    .unwrap_or(Err(OracleError::BadResponse("empty".into())))
            }
        }
    }

    struct Rig {
        engine: Arc<DecisionEngine>,
        monitor: Arc<ObstacleMonitor>,
        bank: Arc<SimActuators>,
        speech: Arc<RecordingSpeech>,
        budget: Arc<RequestBudget>,
        history: Arc<ActionHistory>,
        gate: Arc<BusyGate>,
    }

    fn rig_with(oracle: Arc<dyn DecisionOracle>, distance: i32) -> Rig {
        let limits = Limits::default();
        let bank = Arc::new(SimActuators::new());
        let speech = Arc::new(RecordingSpeech::new());
        let cache = Arc::new(
            SensorCache::new(&limits).with_proximity(Arc::new(SimProximity::fixed(distance))),
        );
        let gate = Arc::new(BusyGate::new());
        let budget = Arc::new(RequestBudget::new(10, true));
        let history = Arc::new(ActionHistory::new());
        let shutdown = Arc::new(AtomicBool::new(false));
        let executor = Arc::new(Executor::new(
            bank.clone(),
            speech.clone(),
            Arc::new(RecordingLights::new()),
            Arc::clone(&cache),
            limits.clone(),
            shutdown,
        ));
        let engine = Arc::new(DecisionEngine::new(
            oracle,
            Arc::clone(&budget),
            Arc::clone(&history),
            cache,
            Arc::clone(&gate),
            executor,
            limits,
        ));
        let monitor = Arc::new(ObstacleMonitor::new(Arc::clone(&engine)));
        Rig {
            engine,
            monitor,
            bank,
            speech,
            budget,
            history,
            gate,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn run_cycle_executes_a_validated_decision() {
        let r = rig_with(
            StubOracle::always(r#"{"action": "speak", "speech": "hello"}"#),
            80,
        );
        let outcome = r
            .engine
            .run_cycle(&r.monitor, DecisionContext::Terminal, "say hi")
            .await;
        assert_eq!(outcome, CycleOutcome::Executed);
        assert_eq!(r.speech.phrases(), vec!["hello".to_string()]);
        assert_eq!(r.history.recent(1), vec!["hello".to_string()]);
        assert!(!r.gate.is_held());
    }

    #[tokio::test(start_paused = true)]
    async fn run_cycle_skips_when_gate_is_held() {
        let r = rig_with(StubOracle::always(r#"{"action": "stop"}"#), 80);
        assert!(r.gate.try_acquire());
        let outcome = r
            .engine
            .run_cycle(&r.monitor, DecisionContext::Autonomous, "anything")
            .await;
        assert_eq!(outcome, CycleOutcome::SkippedBusy);
        assert!(r.bank.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn run_cycle_skips_when_budget_is_exhausted() {
        let r = rig_with(StubOracle::always(r#"{"action": "stop"}"#), 80);
        for _ in 0..10 {
            r.budget.consume();
        }
        let outcome = r
            .engine
            .run_cycle(&r.monitor, DecisionContext::Autonomous, "anything")
            .await;
        assert_eq!(outcome, CycleOutcome::SkippedBudget);
    }

    #[tokio::test(start_paused = true)]
    async fn run_cycle_redirects_inside_safety_distance() {
        // 25 is inside the 30-unit safety distance.
        let r = rig_with(
            StubOracle::always(r#"{"action": "move_backward", "duration": 0.5}"#),
            25,
        );
        let outcome = r
            .engine
            .run_cycle(&r.monitor, DecisionContext::Terminal, "forward please")
            .await;
        assert_eq!(outcome, CycleOutcome::Redirected);
        // The obstacle path ran the reaction.
        assert!(
            r.bank
                .events()
                .iter()
                .any(|e| matches!(e, stormbot_hal::sim::MotorEvent::Drive(_, s) if *s < 0))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn rate_limited_call_yields_no_decision_and_no_budget_use() {
        let r = rig_with(StubOracle::replying(vec![Err(OracleError::RateLimited)]), 80);
        let outcome = r
            .engine
            .run_cycle(&r.monitor, DecisionContext::Autonomous, "anything")
            .await;
        assert_eq!(outcome, CycleOutcome::NoDecision);
        assert_eq!(r.budget.remaining(), Remaining::Count(10));
    }

    #[tokio::test(start_paused = true)]
    async fn successful_call_consumes_budget() {
        let r = rig_with(StubOracle::always(r#"{"action": "stop"}"#), 80);
        r.engine
            .run_cycle(&r.monitor, DecisionContext::Autonomous, "anything")
            .await;
        assert_eq!(r.budget.remaining(), Remaining::Count(9));
    }

    #[tokio::test(start_paused = true)]
    async fn prose_reply_yields_no_decision_on_the_general_path() {
        let r = rig_with(StubOracle::always("I would rather sit still."), 80);
        let outcome = r
            .engine
            .run_cycle(&r.monitor, DecisionContext::Terminal, "do a flip")
            .await;
        assert_eq!(outcome, CycleOutcome::NoDecision);
        assert!(r.bank.events().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn obstacle_decision_falls_back_when_oracle_fails() {
        let r = rig_with(
            StubOracle::replying(vec![Err(OracleError::BadResponse("boom".into()))]),
            15,
        );
        let seq = r.engine.obstacle_decision(15).await;
        assert_eq!(seq, fallback_reaction());
        assert_eq!(r.budget.remaining(), Remaining::Count(10));
    }

    #[tokio::test(start_paused = true)]
    async fn obstacle_decision_falls_back_on_prose_reply() {
        let r = rig_with(StubOracle::always("no json here"), 15);
        let seq = r.engine.obstacle_decision(15).await;
        assert_eq!(seq, fallback_reaction());
        // The call itself succeeded, so it does consume budget.
        assert_eq!(r.budget.remaining(), Remaining::Count(9));
    }

    #[tokio::test(start_paused = true)]
    async fn obstacle_decision_validates_with_obstacle_defaults() {
        let r = rig_with(StubOracle::always(r#"{"action": "move_backward"}"#), 15);
        let seq = r.engine.obstacle_decision(15).await;
        assert_eq!(seq.len(), 1);
        assert_eq!(seq[0].speed, 40);
    }

    #[tokio::test(start_paused = true)]
    async fn obstacle_decision_replaces_empty_array_with_fallback() {
        let r = rig_with(StubOracle::always("[]"), 15);
        let seq = r.engine.obstacle_decision(15).await;
        assert_eq!(seq, fallback_reaction());
    }
}
