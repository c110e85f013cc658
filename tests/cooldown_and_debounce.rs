use std::sync::Arc;
use std::time::Duration;

use cuepulse::application::{Outcome, RoundSource};
use cuepulse::domain::{
    LiveEvent, OverlayRef, RuleAction, RuleConditions, RuleId, SceneRef, SuppressReason,
    TriggerRule,
};
use cuepulse::infrastructure::engine::{EngineHandle, EngineOptions, TriggerEngine};
use cuepulse::infrastructure::fake_executor::FakeActionExecutor;
use cuepulse::infrastructure::round_source::SharedRoundSource;

fn rule(id: &str, priority: i32, action: RuleAction, conditions: RuleConditions) -> TriggerRule {
    TriggerRule {
        id: RuleId::new(id),
        event_type: "point".into(),
        action,
        connection: None,
        priority,
        enabled: true,
        conditions,
    }
}

fn spawn(executor: &FakeActionExecutor, rules: Vec<TriggerRule>) -> EngineHandle {
    TriggerEngine::spawn(
        Arc::new(executor.clone()),
        Arc::new(SharedRoundSource::new()) as Arc<dyn RoundSource>,
        EngineOptions {
            rules,
            ..Default::default()
        },
    )
    .unwrap()
}

async fn point(engine: &EngineHandle) {
    engine.submit_event(LiveEvent::new("point")).await.unwrap();
    engine.flush().await.unwrap();
}

/// The two-rule scenario: A (scene change, priority 1, unconditioned) and
/// B (overlay, priority 2, cooldown 5000ms).
#[tokio::test(start_paused = true)]
async fn cooldown_suppresses_b_but_not_a() {
    let executor = FakeActionExecutor::new();
    let engine = spawn(
        &executor,
        vec![
            rule(
                "a",
                1,
                RuleAction::SceneChange {
                    scene: SceneRef("Replay Cam".into()),
                },
                RuleConditions::default(),
            ),
            rule(
                "b",
                2,
                RuleAction::OverlayShow {
                    overlay: OverlayRef("Score Banner".into()),
                },
                RuleConditions {
                    cooldown_ms: Some(5000),
                    ..Default::default()
                },
            ),
        ],
    );

    // t=0: both fire, in priority order
    point(&engine).await;
    let logs = engine.recent_logs(10);
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[1].rule_id, RuleId::new("a"));
    assert_eq!(logs[1].outcome, Outcome::Success);
    assert_eq!(logs[0].rule_id, RuleId::new("b"));
    assert_eq!(logs[0].outcome, Outcome::Success);

    // t=1000: A fires again, B is inside its cooldown
    tokio::time::advance(Duration::from_millis(1000)).await;
    point(&engine).await;
    let logs = engine.recent_logs(2);
    assert_eq!(logs[1].rule_id, RuleId::new("a"));
    assert_eq!(logs[1].outcome, Outcome::Success);
    assert_eq!(logs[0].rule_id, RuleId::new("b"));
    assert_eq!(
        logs[0].outcome,
        Outcome::Suppressed {
            reason: SuppressReason::Cooldown
        }
    );

    // t=5000: cooldown elapsed, B fires again
    tokio::time::advance(Duration::from_millis(4000)).await;
    point(&engine).await;
    let logs = engine.recent_logs(2);
    assert_eq!(logs[0].rule_id, RuleId::new("b"));
    assert_eq!(logs[0].outcome, Outcome::Success);

    // A fired 3 times, B twice
    assert_eq!(executor.call_count(), 5);
}

#[tokio::test(start_paused = true)]
async fn debounce_suppresses_rapid_repeats_even_after_failure() {
    let executor = FakeActionExecutor::new();
    executor.fail_for(RuleId::new("cut"));
    let engine = spawn(
        &executor,
        vec![rule(
            "cut",
            1,
            RuleAction::SceneChange {
                scene: SceneRef("Main".into()),
            },
            RuleConditions {
                debounce_ms: Some(1000),
                ..Default::default()
            },
        )],
    );

    // first attempt fails, but still arms the debounce window
    point(&engine).await;
    assert!(matches!(
        engine.recent_logs(1)[0].outcome,
        Outcome::Failure { .. }
    ));

    tokio::time::advance(Duration::from_millis(400)).await;
    point(&engine).await;
    assert_eq!(
        engine.recent_logs(1)[0].outcome,
        Outcome::Suppressed {
            reason: SuppressReason::Debounce
        }
    );
    assert_eq!(executor.call_count(), 1);

    tokio::time::advance(Duration::from_millis(600)).await;
    point(&engine).await;
    assert_eq!(executor.call_count(), 2);
}

#[tokio::test(start_paused = true)]
async fn cooldown_outlasts_an_elapsed_debounce() {
    let executor = FakeActionExecutor::new();
    let engine = spawn(
        &executor,
        vec![rule(
            "banner",
            1,
            RuleAction::OverlayShow {
                overlay: OverlayRef("Banner".into()),
            },
            RuleConditions {
                debounce_ms: Some(100),
                cooldown_ms: Some(5000),
                ..Default::default()
            },
        )],
    );

    point(&engine).await;
    assert_eq!(executor.call_count(), 1);

    // debounce window long gone, cooldown still holding
    tokio::time::advance(Duration::from_millis(1000)).await;
    point(&engine).await;
    assert_eq!(executor.call_count(), 1);
    assert_eq!(
        engine.recent_logs(1)[0].outcome,
        Outcome::Suppressed {
            reason: SuppressReason::Cooldown
        }
    );

    tokio::time::advance(Duration::from_millis(4000)).await;
    point(&engine).await;
    assert_eq!(executor.call_count(), 2);
}

/// A failed attempt must not arm the cooldown: retry via a later identical
/// event is allowed as soon as debounce permits.
#[tokio::test(start_paused = true)]
async fn failure_does_not_start_cooldown() {
    let executor = FakeActionExecutor::new();
    executor.fail_for(RuleId::new("banner"));
    let engine = spawn(
        &executor,
        vec![rule(
            "banner",
            1,
            RuleAction::OverlayShow {
                overlay: OverlayRef("Banner".into()),
            },
            RuleConditions {
                cooldown_ms: Some(5000),
                ..Default::default()
            },
        )],
    );

    point(&engine).await;
    assert!(matches!(
        engine.recent_logs(1)[0].outcome,
        Outcome::Failure { .. }
    ));

    tokio::time::advance(Duration::from_millis(10)).await;
    point(&engine).await;
    // dispatched again right away: no success happened, so no cooldown
    assert_eq!(executor.call_count(), 2);
}
