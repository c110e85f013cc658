use std::sync::Arc;

use cuepulse::application::{Outcome, RoundSource};
use cuepulse::domain::{
    LiveEvent, OverlayRef, RuleAction, RuleConditions, RuleId, SceneRef, TriggerRule,
};
use cuepulse::infrastructure::engine::{EngineOptions, TriggerEngine};
use cuepulse::infrastructure::fake_executor::FakeActionExecutor;
use cuepulse::infrastructure::round_source::SharedRoundSource;

fn rule(id: &str, event: &str, priority: i32, action: RuleAction) -> TriggerRule {
    TriggerRule {
        id: RuleId::new(id),
        event_type: event.into(),
        action,
        connection: None,
        priority,
        enabled: true,
        conditions: RuleConditions::default(),
    }
}

fn scene(name: &str) -> RuleAction {
    RuleAction::SceneChange {
        scene: SceneRef(name.into()),
    }
}

fn overlay(name: &str) -> RuleAction {
    RuleAction::OverlayShow {
        overlay: OverlayRef(name.into()),
    }
}

#[tokio::test]
async fn fires_in_priority_order_without_overlap() {
    let executor = FakeActionExecutor::new();
    let rounds = SharedRoundSource::new();
    let engine = TriggerEngine::spawn(
        Arc::new(executor.clone()),
        Arc::new(rounds) as Arc<dyn RoundSource>,
        EngineOptions {
            rules: vec![
                // registered low-priority first to prove ordering is by
                // priority, not registration
                rule("banner", "point", 2, overlay("Score Banner")),
                rule("cut", "point", 1, scene("Replay Cam")),
            ],
            ..Default::default()
        },
    )
    .unwrap();

    engine.submit_event(LiveEvent::new("point")).await.unwrap();
    engine.flush().await.unwrap();

    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].rule_id, RuleId::new("cut"));
    assert_eq!(calls[1].rule_id, RuleId::new("banner"));
    // strictly sequential: the second call must not start before the first
    // one returned
    assert!(calls[1].started >= calls[0].finished);
    assert!(!executor.saw_overlap());
}

#[tokio::test]
async fn priority_ties_break_by_creation_order() {
    let executor = FakeActionExecutor::new();
    let engine = TriggerEngine::spawn(
        Arc::new(executor.clone()),
        Arc::new(SharedRoundSource::new()) as Arc<dyn RoundSource>,
        EngineOptions {
            rules: vec![
                rule("first", "point", 1, scene("A")),
                rule("second", "point", 1, scene("B")),
            ],
            ..Default::default()
        },
    )
    .unwrap();

    engine.submit_event(LiveEvent::new("point")).await.unwrap();
    engine.flush().await.unwrap();

    let ids: Vec<_> = executor.calls().into_iter().map(|c| c.rule_id).collect();
    assert_eq!(ids, vec![RuleId::new("first"), RuleId::new("second")]);
}

#[tokio::test]
async fn failure_of_one_rule_does_not_block_siblings() {
    let executor = FakeActionExecutor::new();
    executor.fail_for(RuleId::new("cut"));

    let engine = TriggerEngine::spawn(
        Arc::new(executor.clone()),
        Arc::new(SharedRoundSource::new()) as Arc<dyn RoundSource>,
        EngineOptions {
            rules: vec![
                rule("cut", "point", 1, scene("Replay Cam")),
                rule("banner", "point", 2, overlay("Score Banner")),
            ],
            ..Default::default()
        },
    )
    .unwrap();

    engine.submit_event(LiveEvent::new("point")).await.unwrap();
    engine.flush().await.unwrap();

    assert_eq!(executor.call_count(), 2);

    // newest first: banner success, then cut failure
    let logs = engine.recent_logs(10);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].rule_id, RuleId::new("banner"));
    assert_eq!(logs[0].outcome, Outcome::Success);
    assert_eq!(logs[1].rule_id, RuleId::new("cut"));
    assert!(matches!(logs[1].outcome, Outcome::Failure { .. }));
}

#[tokio::test]
async fn disabled_rules_are_skipped_silently() {
    let executor = FakeActionExecutor::new();
    let mut off = rule("off", "point", 1, scene("A"));
    off.enabled = false;

    let engine = TriggerEngine::spawn(
        Arc::new(executor.clone()),
        Arc::new(SharedRoundSource::new()) as Arc<dyn RoundSource>,
        EngineOptions {
            rules: vec![off, rule("on", "point", 2, scene("B"))],
            ..Default::default()
        },
    )
    .unwrap();

    engine.submit_event(LiveEvent::new("point")).await.unwrap();
    engine.flush().await.unwrap();

    assert_eq!(executor.call_count(), 1);
    // not even a suppressed entry for the disabled rule
    let logs = engine.recent_logs(10);
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0].rule_id, RuleId::new("on"));
}

#[tokio::test(start_paused = true)]
async fn delay_row_suspends_the_pipeline_between_actions() {
    let executor = FakeActionExecutor::new();
    let engine = TriggerEngine::spawn(
        Arc::new(executor.clone()),
        Arc::new(SharedRoundSource::new()) as Arc<dyn RoundSource>,
        EngineOptions {
            rules: vec![
                rule("cut", "goal", 1, scene("Replay Cam")),
                rule(
                    "wait",
                    "goal",
                    2,
                    RuleAction::Delay { wait_ms: 800 },
                ),
                rule("rec", "goal", 3, RuleAction::RecordingStart),
            ],
            ..Default::default()
        },
    )
    .unwrap();

    engine.submit_event(LiveEvent::new("goal")).await.unwrap();
    engine.flush().await.unwrap();

    let calls = executor.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].rule_id, RuleId::new("cut"));
    assert_eq!(calls[1].rule_id, RuleId::new("rec"));
    // the delay row held the pipeline for its full duration
    let gap = calls[1].started - calls[0].finished;
    assert!(gap >= std::time::Duration::from_millis(800), "gap {gap:?}");
    // delay rows never reach the executor or the log
    assert!(engine
        .recent_logs(10)
        .iter()
        .all(|e| e.rule_id != RuleId::new("wait")));
}
