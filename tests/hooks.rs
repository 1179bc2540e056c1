use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use futures::{future, FutureExt as _};
use stepwise::{
    error::HookFailureCause, Engine, HookCall, HookOptions, HookPhase,
    Implementation, Scenario, ScenarioStatus, Step, StepCall, StepMetadata,
    StepStatus,
};

type Log = Arc<Mutex<Vec<String>>>;

/// Hook appending `$entry` to the `$log`.
macro_rules! record {
    ($log:expr, $entry:expr) => {{
        let log = Arc::clone(&$log);
        move |_: HookCall<'_>| {
            let log = Arc::clone(&log);
            async move {
                log.lock().unwrap().push($entry.to_owned());
                anyhow::Ok(())
            }
            .boxed_local()
        }
    }};
}

/// Hook failing with `$msg`.
macro_rules! failing {
    ($msg:expr) => {
        |_: HookCall<'_>| async { Err::<(), _>(anyhow::anyhow!($msg)) }.boxed_local()
    };
}

fn engine_with_step(log: &Log) -> Engine {
    let mut engine = Engine::default();
    let sink = Arc::clone(log);
    _ = engine
        .register_step(
            "a step",
            Implementation::free(move |_: StepCall<'_>| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push("step".to_owned());
                    anyhow::Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();
    engine
}

fn scenario() -> Scenario {
    Scenario::new("hooked").step(Step::given("a step"))
}

#[tokio::test]
async fn hooks_run_by_order_then_registration() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine
        .register_hook(HookPhase::Before, record!(log, "before 5"), HookOptions::new().order(5))
        .register_hook(HookPhase::Before, record!(log, "before 1"), HookOptions::new().order(1))
        .register_hook(HookPhase::Before, record!(log, "before 1 again"), HookOptions::new().order(1))
        .register_hook(HookPhase::BeforeStep, record!(log, "before step"), HookOptions::new())
        .register_hook(HookPhase::AfterStep, record!(log, "after step"), HookOptions::new())
        .register_hook(HookPhase::After, record!(log, "after"), HookOptions::new());

    let result = engine.run_scenario(&scenario()).await;

    assert!(result.is_passed());
    assert_eq!(
        *log.lock().unwrap(),
        [
            "before 1",
            "before 1 again",
            "before 5",
            "before step",
            "step",
            "after step",
            "after",
        ],
    );
}

#[tokio::test]
async fn failed_before_hook_skips_steps_but_runs_after_hooks() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine
        .register_hook(HookPhase::Before, failing!("no database"), HookOptions::new().name("db"))
        .register_hook(HookPhase::Before, record!(log, "never"), HookOptions::new().order(10))
        .register_hook(HookPhase::After, record!(log, "after"), HookOptions::new());

    let result = engine.run_scenario(&scenario()).await;

    assert_eq!(result.status, ScenarioStatus::Failed);
    assert_eq!(result.steps[0].status, StepStatus::Skipped);
    assert_eq!(*log.lock().unwrap(), ["after"]);
    assert_eq!(result.hook_errors.len(), 1);
    assert_eq!(result.hook_errors[0].hook, "db");
    assert_eq!(
        result.hook_errors[0].cause,
        HookFailureCause::Failed("no database".into()),
    );
}

#[tokio::test]
async fn failed_before_step_hook_fails_step_without_body() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine.register_hook(HookPhase::BeforeStep, failing!("no browser"), HookOptions::new());

    let result = engine.run_scenario(&scenario()).await;

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(
        result.steps[0].error.as_ref().map(|e| e.kind),
        Some("HookFailureError"),
    );
    assert!(result.is_failed());
}

#[tokio::test]
async fn failed_after_hooks_do_not_overturn_status() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine
        .register_hook(HookPhase::AfterStep, failing!("screenshot failed"), HookOptions::new())
        .register_hook(HookPhase::After, failing!("cleanup failed"), HookOptions::new())
        .register_hook(HookPhase::After, record!(log, "after"), HookOptions::new().order(1));

    let result = engine.run_scenario(&scenario()).await;

    assert_eq!(result.status, ScenarioStatus::Passed);
    assert_eq!(result.steps[0].status, StepStatus::Passed);
    assert_eq!(result.hook_errors.len(), 2);
    assert_eq!(*log.lock().unwrap(), ["step", "after"]);
}

#[tokio::test(start_paused = true)]
async fn stuck_before_hook_times_out() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine
        .register_hook(
            HookPhase::Before,
            |_: HookCall<'_>| future::pending::<anyhow::Result<()>>().boxed_local(),
            HookOptions::new().name("login").timeout(Duration::from_millis(50)),
        )
        .register_hook(HookPhase::After, record!(log, "after"), HookOptions::new());

    let result = engine.run_scenario(&scenario()).await;

    assert_eq!(result.status, ScenarioStatus::Failed);
    assert_eq!(result.steps[0].status, StepStatus::Skipped);
    assert_eq!(*log.lock().unwrap(), ["after"]);
    assert_eq!(result.hook_errors.len(), 1);
    assert_eq!(result.hook_errors[0].hook, "login");
    assert!(matches!(result.hook_errors[0].cause, HookFailureCause::TimedOut(_)));
}

#[tokio::test(start_paused = true)]
async fn stuck_after_step_hook_keeps_step_status() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine.register_hook(
        HookPhase::AfterStep,
        |_: HookCall<'_>| future::pending::<anyhow::Result<()>>().boxed_local(),
        HookOptions::new().timeout(Duration::from_millis(50)),
    );

    let result = engine.run_scenario(&scenario()).await;

    assert_eq!(result.status, ScenarioStatus::Passed);
    assert_eq!(result.steps[0].status, StepStatus::Passed);
    assert_eq!(*log.lock().unwrap(), ["step"]);
    assert_eq!(result.hook_errors.len(), 1);
    assert_eq!(result.hook_errors[0].phase, HookPhase::AfterStep);
    assert!(matches!(result.hook_errors[0].cause, HookFailureCause::TimedOut(_)));
}

#[tokio::test]
async fn filters_select_hooks() {
    let log = Log::default();
    let mut engine = engine_with_step(&log);
    _ = engine
        .register_hook(
            HookPhase::Before,
            record!(log, "smoke"),
            HookOptions::new().tags("@smoke or @critical").unwrap(),
        )
        .register_hook(HookPhase::Before, record!(log, "disabled"), HookOptions::new().when(false))
        .register_hook(HookPhase::Before, record!(log, "enabled"), HookOptions::new().when(true));

    _ = engine.run_scenario(&scenario().tag("@critical")).await;
    _ = engine.run_scenario(&scenario().tag("@slow")).await;

    assert_eq!(*log.lock().unwrap(), ["smoke", "enabled", "step", "enabled", "step"]);
}

#[tokio::test]
async fn hooks_see_step_context() {
    let mut engine = Engine::default();
    _ = engine
        .register_step(
            "a step",
            Implementation::free(|_: StepCall<'_>| async { anyhow::Ok(()) }.boxed_local()),
            StepMetadata::new(),
        )
        .unwrap()
        .register_hook(
            HookPhase::AfterStep,
            |call: HookCall<'_>| {
                async move {
                    if let Some(step) = call.step {
                        let status = step.status();
                        step.log(format!("finished as {status}"));
                        step.set_metadata("checked", true);
                    }
                    anyhow::Ok(())
                }
                .boxed_local()
            },
            HookOptions::new(),
        );

    let result = engine.run_scenario(&scenario()).await;

    assert_eq!(result.steps[0].logs, 1);
    assert_eq!(result.steps[0].metadata.get("checked"), Some(&serde_json::json!(true)));
}
