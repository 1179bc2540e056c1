use std::{
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use futures::{future, FutureExt as _};
use serde_json::json;
use stepwise::{
    context::ScenarioStatus, Config, Engine, Feature, HookCall, HookOptions,
    HookPhase, Implementation, Scenario, Scope, Step, StepCall, StepMetadata,
    StepStatus,
};

fn passing() -> Implementation {
    Implementation::free(|_: StepCall<'_>| async { anyhow::Ok(()) }.boxed_local())
}

#[tokio::test]
async fn resolves_and_coerces_arguments() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::default();

    let sink = Arc::clone(&seen);
    _ = engine
        .register_step(
            "user enters {string} and {int}",
            Implementation::free(move |call: StepCall<'_>| {
                let sink = Arc::clone(&sink);
                async move {
                    let name = call.arg::<String>(0)?;
                    let age = call.arg::<i64>(1)?;
                    sink.lock().unwrap().push((name, age));
                    anyhow::Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();

    let scenario = Scenario::new("sign up").step(Step::when(r#"user enters "abc" and 42"#));
    let result = engine.run_scenario(&scenario).await;

    assert_eq!(result.status, ScenarioStatus::Passed);
    assert_eq!(*seen.lock().unwrap(), vec![("abc".to_owned(), 42)]);
}

#[tokio::test]
async fn first_registered_pattern_wins() {
    let hits = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::default();

    for (pattern, label) in [("I open {word}", "generic"), ("I open settings", "specific")] {
        let hits = Arc::clone(&hits);
        _ = engine
            .register_step(
                pattern,
                Implementation::free(move |_: StepCall<'_>| {
                    let hits = Arc::clone(&hits);
                    async move {
                        hits.lock().unwrap().push(label);
                        anyhow::Ok(())
                    }
                    .boxed_local()
                }),
                StepMetadata::new(),
            )
            .unwrap();
    }

    let scenario = Scenario::new("open").step(Step::given("I open settings"));
    _ = engine.run_scenario(&scenario).await;

    assert_eq!(*hits.lock().unwrap(), vec!["generic"]);
    assert_eq!(engine.steps().shadowed("I open settings").len(), 1);
}

#[tokio::test(start_paused = true)]
async fn timed_out_step_fails_and_next_step_runs() {
    let mut engine = Engine::default();
    _ = engine
        .register_step(
            "I hang",
            Implementation::free(|_: StepCall<'_>| {
                future::pending::<anyhow::Result<()>>().boxed_local()
            }),
            StepMetadata::new().timeout(Duration::from_millis(50)),
        )
        .unwrap()
        .register_step("I continue", passing(), StepMetadata::new())
        .unwrap();

    let scenario = Scenario::new("hang")
        .step(Step::given("I hang"))
        .step(Step::then("I continue"));
    let result = engine.run_scenario(&scenario).await;

    assert_eq!(result.status, ScenarioStatus::Failed);
    assert_eq!(result.steps[0].status, StepStatus::Failed);
    assert_eq!(
        result.steps[0].error.as_ref().map(|e| e.kind),
        Some("TimeoutError"),
    );
    assert_eq!(result.steps[1].status, StepStatus::Passed);
}

#[tokio::test]
async fn unmatched_step_fails_with_snippet() {
    let mut engine = Engine::default();
    let scenario = Scenario::new("nothing").step(Step::given("I have 5 apples"));

    let result = engine.run_scenario(&scenario).await;

    let error = result.steps[0].error.as_ref().unwrap();
    assert_eq!(error.kind, "NoMatchingStepError");
    assert!(error.message.contains("I have {int} apples"), "{}", error.message);
    assert!(result.is_failed());
}

#[tokio::test]
async fn soft_assertions_fail_scenario() {
    let mut engine = Engine::default();
    _ = engine
        .register_step(
            "the total is {int}",
            Implementation::free(|mut call: StepCall<'_>| {
                async move {
                    let total = call.arg::<i64>(0)?;
                    call.soft_assert(total == 10, format!("expected 10, got {total}"));
                    anyhow::Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();

    let scenario = Scenario::new("soft").step(Step::then("the total is 7"));
    let result = engine.run_scenario(&scenario).await;

    assert_eq!(result.steps[0].status, StepStatus::Passed);
    assert_eq!(result.soft_failures, vec!["expected 10, got 7".to_owned()]);
    assert_eq!(result.status, ScenarioStatus::Failed);
}

#[tokio::test]
async fn skipped_and_panicking_steps() {
    let mut engine = Engine::default();
    _ = engine
        .register_step(
            "not on this platform",
            Implementation::free(|_: StepCall<'_>| {
                async { Err::<(), _>(stepwise::skip()) }.boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap()
        .register_step(
            "it explodes",
            Implementation::free(|_: StepCall<'_>| {
                async {
                    if true {
                        panic!("kaboom");
                    }
                    anyhow::Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();

    let skipped = engine
        .run_scenario(&Scenario::new("skip").step(Step::given("not on this platform")))
        .await;
    assert_eq!(skipped.status, ScenarioStatus::Skipped);

    let panicked = engine
        .run_scenario(&Scenario::new("boom").step(Step::given("it explodes")))
        .await;
    let error = panicked.steps[0].error.as_ref().unwrap();
    assert_eq!(error.kind, "Panic");
    assert!(error.message.contains("kaboom"), "{}", error.message);
}

#[tokio::test]
async fn failed_steps_are_retried() {
    let tries = Arc::new(AtomicUsize::new(0));
    let mut engine = Engine::default();

    let counter = Arc::clone(&tries);
    _ = engine
        .register_step(
            "a flaky service",
            Implementation::free(move |_: StepCall<'_>| {
                let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if attempt < 3 {
                        anyhow::bail!("attempt {attempt} failed");
                    }
                    Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new().retry(2),
        )
        .unwrap();

    let result = engine
        .run_scenario(&Scenario::new("flaky").step(Step::given("a flaky service")))
        .await;

    assert!(result.is_passed());
    assert_eq!(tries.load(Ordering::SeqCst), 3);
    assert_eq!(result.steps[0].metadata.get("attempts"), Some(&json!(3)));
}

#[tokio::test]
async fn fail_fast_skips_remaining_steps() {
    let config = Config { fail_scenario_fast: true, ..Config::default() };
    let mut engine = Engine::new(config);
    _ = engine
        .register_step(
            "it fails",
            Implementation::free(|_: StepCall<'_>| {
                async { Err::<(), _>(anyhow::anyhow!("nope")) }.boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap()
        .register_step("it passes", passing(), StepMetadata::new())
        .unwrap();

    let scenario = Scenario::new("fast")
        .step(Step::given("it fails"))
        .step(Step::then("it passes"));
    let result = engine.run_scenario(&scenario).await;

    let statuses = result.steps.iter().map(|s| s.status).collect::<Vec<_>>();
    assert_eq!(statuses, vec![StepStatus::Failed, StepStatus::Skipped]);
}

#[derive(Debug, Default)]
struct Cart {
    items: Vec<String>,
}

#[tokio::test]
async fn bound_steps_use_registered_owner() {
    let mut engine = Engine::default();
    _ = engine
        .register_owner_instance("cart", Cart::default())
        .unwrap()
        .register_step(
            "I add {string} to the cart",
            Implementation::bound::<Cart, _>("cart", |cart, call| {
                let item = call.arg::<String>(0);
                async move {
                    cart.items.push(item?);
                    anyhow::Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap()
        .register_step(
            "I add {string} to the wishlist",
            Implementation::bound::<Cart, _>("wishlist", |_, _| {
                async { anyhow::Ok(()) }.boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();

    let scenario = Scenario::new("shopping")
        .step(Step::when(r#"I add "apple" to the cart"#))
        .step(Step::and(r#"I add "pear" to the cart"#))
        .step(Step::and(r#"I add "plum" to the wishlist"#));
    let result = engine.run_scenario(&scenario).await;

    let cart = engine.owner::<Cart>("cart").unwrap();
    assert_eq!(cart.items, vec!["apple", "pear"]);
    assert_eq!(
        result.steps[2].error.as_ref().map(|e| e.kind),
        Some("UnknownOwnerError"),
    );
}

#[tokio::test]
async fn scenario_scope_is_cleared_and_global_kept() {
    let mut engine = Engine::default();
    _ = engine
        .register_step(
            "I log in",
            Implementation::free(|mut call: StepCall<'_>| {
                async move {
                    call.store("response", json!({"data": {"token": "t-1"}}));
                    let token = call.chain_value("response", "$.data.token", "token")?;
                    call.store_global("last token", token);
                    anyhow::Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap()
        .register_step(
            "the token is {string}",
            Implementation::free(|call: StepCall<'_>| {
                async move {
                    let expected = call.arg::<String>(0)?;
                    let token = call.retrieve::<String>("token")?;
                    anyhow::ensure!(token == expected, "got {token}");
                    Ok(())
                }
                .boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();

    let scenario = Scenario::new("login")
        .with_id("login-1")
        .step(Step::given("I log in"))
        .step(Step::then(r#"the token is "t-1""#));
    let result = engine.run_scenario(&scenario).await;
    assert!(result.is_passed(), "{result:#?}");

    assert!(!engine.store().has("token", &Scope::scenario("login-1")));
    assert_eq!(
        engine.store().retrieve_as::<String>("last token", &Scope::Global).unwrap(),
        "t-1",
    );

    let missing = engine
        .run_scenario(&Scenario::new("again").step(Step::then(r#"the token is "t-1""#)))
        .await;
    assert_eq!(
        missing.steps[0].error.as_ref().map(|e| e.kind),
        Some("NotFoundError"),
    );
}

#[tokio::test]
async fn feature_background_and_tags() {
    let tags = Arc::new(Mutex::new(Vec::new()));
    let mut engine = Engine::default();

    let seen = Arc::clone(&tags);
    _ = engine
        .register_step("a browser", passing(), StepMetadata::new())
        .unwrap()
        .register_step("I search", passing(), StepMetadata::new())
        .unwrap()
        .register_hook(
            HookPhase::Before,
            move |call: HookCall<'_>| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().unwrap().push(call.scenario.name().to_owned());
                    anyhow::Ok(())
                }
                .boxed_local()
            },
            HookOptions::new().tags("@web and not @wip").unwrap(),
        );

    let feature = Feature::new("search")
        .tag("@web")
        .background(Step::given("a browser"))
        .scenario(Scenario::new("done").step(Step::when("I search")))
        .scenario(Scenario::new("unfinished").tag("@wip").step(Step::when("I search")));
    let result = engine.run_feature(&feature).await;

    assert_eq!(result.status, ScenarioStatus::Passed);
    assert_eq!(result.scenarios[0].steps[0].text, "a browser");
    assert_eq!(result.scenarios[0].steps.len(), 2);
    assert_eq!(*tags.lock().unwrap(), vec!["done".to_owned()]);
    assert_eq!(result.snapshot.outcomes.len(), 2);
}

#[tokio::test(start_paused = true)]
async fn cancellation_interrupts_in_flight_step() {
    let config = Config { grace_period: Duration::from_millis(100), ..Config::default() };
    let mut engine = Engine::new(config);
    _ = engine
        .register_step("it passes", passing(), StepMetadata::new())
        .unwrap()
        .register_step(
            "I hang",
            Implementation::free(|_: StepCall<'_>| {
                future::pending::<anyhow::Result<()>>().boxed_local()
            }),
            StepMetadata::new(),
        )
        .unwrap();

    let token = engine.cancellation_token();
    let canceller = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let scenario = Scenario::new("stuck")
        .step(Step::given("it passes"))
        .step(Step::when("I hang"))
        .step(Step::then("it passes"));
    let result = engine.run_scenario(&scenario).await;
    canceller.await.unwrap();

    assert!(result.interrupted);
    assert_eq!(result.steps.len(), 2);
    assert_eq!(result.steps[1].error.as_ref().map(|e| e.kind), Some("Cancelled"));
    assert_eq!(result.status, ScenarioStatus::Failed);

    let next = engine
        .run_scenario(&Scenario::new("later").step(Step::given("it passes")))
        .await;
    assert_eq!(next.status, ScenarioStatus::Pending);
    assert!(next.steps.is_empty());
}
