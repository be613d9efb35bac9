//! Wait-for-dependency scenarios.

mod common;

use common::{service, MemoryEngine};
use convoy_converge::{ConvergeError, ConvergeOptions, Convergence, EventStatus};
use convoy_engine::{ContainerState, Engine, HealthStatus};
use convoy_project::{Condition, Project, ServiceDependency};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

fn convergence(engine: &Arc<MemoryEngine>, project: &Project) -> Arc<Convergence> {
    let snapshot = engine.snapshot();
    let port: Arc<dyn Engine> = Arc::clone(engine) as Arc<dyn Engine>;
    Arc::new(Convergence::new(port, project, snapshot))
}

fn depends(condition: Condition, required: bool) -> ServiceDependency {
    ServiceDependency {
        condition,
        required,
        restart: false,
    }
}

#[tokio::test(start_paused = true)]
async fn healthy_wait_succeeds_after_polling() {
    let engine = Arc::new(MemoryEngine::new());
    engine.script_health(
        "db",
        vec![
            HealthStatus::Starting,
            HealthStatus::Starting,
            HealthStatus::Healthy,
        ],
    );

    let db = service("db");
    let mut web = service("web");
    web.depends_on
        .insert("db".to_string(), depends(Condition::Healthy, true));
    let project = Arc::new(Project::new("shop", [db, web]));

    let convergence = convergence(&engine, &project);
    let mut events = convergence.progress().subscribe();
    convergence
        .up(&project, &ConvergeOptions::default())
        .await
        .unwrap();

    assert_eq!(
        engine.container_by_name("shop-web-1").unwrap().state,
        ContainerState::Running
    );

    let mut saw_waiting = false;
    let mut saw_healthy = false;
    while let Ok(event) = events.try_recv() {
        if event.id == "Container shop-db-1" {
            match event.status {
                EventStatus::Waiting => saw_waiting = true,
                EventStatus::Healthy => saw_healthy = true,
                _ => {}
            }
        }
    }
    assert!(saw_waiting, "expected a Waiting event for the dependency");
    assert!(saw_healthy, "expected a Healthy event for the dependency");
}

#[tokio::test(start_paused = true)]
async fn completed_successfully_with_nonzero_exit_fails_required_dependant() {
    let engine = Arc::new(MemoryEngine::new());
    engine.exit_on_start("seed", 1);

    let seed = service("seed");
    let mut app = service("app");
    app.depends_on.insert(
        "seed".to_string(),
        depends(Condition::CompletedSuccessfully, true),
    );
    let project = Arc::new(Project::new("shop", [seed, app]));

    let convergence = convergence(&engine, &project);
    let mut events = convergence.progress().subscribe();
    let err = convergence
        .up(&project, &ConvergeOptions::default())
        .await
        .unwrap_err();

    assert!(matches!(err, ConvergeError::Engine(_)));
    assert!(err.to_string().contains("didn't complete successfully"));

    // The dependant was never started.
    assert!(!engine.ops().contains(&"start shop-app-1".to_string()));

    let mut saw_error = false;
    while let Ok(event) = events.try_recv() {
        if event.id == "Container shop-seed-1" && event.status == EventStatus::Error {
            saw_error = true;
        }
    }
    assert!(saw_error, "expected an Error event for the failed dependency");
}

#[tokio::test(start_paused = true)]
async fn completed_successfully_with_zero_exit_unblocks_dependant() {
    let engine = Arc::new(MemoryEngine::new());
    engine.exit_on_start("seed", 0);

    let seed = service("seed");
    let mut app = service("app");
    app.depends_on.insert(
        "seed".to_string(),
        depends(Condition::CompletedSuccessfully, true),
    );
    let project = Arc::new(Project::new("shop", [seed, app]));

    let convergence = convergence(&engine, &project);
    convergence
        .up(&project, &ConvergeOptions::default())
        .await
        .unwrap();

    assert_eq!(
        engine.container_by_name("shop-app-1").unwrap().state,
        ContainerState::Running
    );
}

#[tokio::test(start_paused = true)]
async fn optional_dependency_failure_downgrades_to_a_skip() {
    let engine = Arc::new(MemoryEngine::new());
    engine.exit_on_start("seed", 1);

    let seed = service("seed");
    let mut app = service("app");
    app.depends_on.insert(
        "seed".to_string(),
        depends(Condition::CompletedSuccessfully, false),
    );
    let project = Arc::new(Project::new("shop", [seed, app]));

    let convergence = convergence(&engine, &project);
    let mut events = convergence.progress().subscribe();
    convergence
        .up(&project, &ConvergeOptions::default())
        .await
        .unwrap();

    // The run succeeded and the dependant is up regardless.
    assert_eq!(
        engine.container_by_name("shop-app-1").unwrap().state,
        ContainerState::Running
    );

    let mut saw_skipped = false;
    while let Ok(event) = events.try_recv() {
        if event.id == "Container shop-seed-1" && event.status == EventStatus::Skipped {
            saw_skipped = true;
        }
    }
    assert!(saw_skipped, "expected a Skipped event for the optional dependency");
}

#[tokio::test(start_paused = true)]
async fn required_dependency_with_no_containers_is_missing() {
    let engine = Arc::new(MemoryEngine::new());
    let db = service("db");
    let mut app = service("app");
    app.depends_on
        .insert("db".to_string(), depends(Condition::Healthy, true));
    let project = Arc::new(Project::new("shop", [db, app.clone()]));

    let convergence = convergence(&engine, &project);
    let err = convergence
        .wait_dependencies(&project, "app", &app.depends_on, None)
        .await
        .unwrap_err();

    assert!(err.is_missing_dependency());
    assert!(err.to_string().contains("app is missing dependency db"));
}

#[tokio::test(start_paused = true)]
async fn optional_dependency_with_no_containers_is_skipped() {
    let engine = Arc::new(MemoryEngine::new());
    let db = service("db");
    let mut app = service("app");
    app.depends_on
        .insert("db".to_string(), depends(Condition::Healthy, false));
    let project = Arc::new(Project::new("shop", [db, app.clone()]));

    let convergence = convergence(&engine, &project);
    convergence
        .wait_dependencies(&project, "app", &app.depends_on, None)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn unknown_condition_warns_and_skips() {
    let engine = Arc::new(MemoryEngine::new());
    let db = service("db");
    let project = Arc::new(Project::new("shop", [db.clone()]));
    engine.seed(&project, &db, 1);

    let convergence = convergence(&engine, &project);
    let mut deps = BTreeMap::new();
    deps.insert(
        "db".to_string(),
        depends(Condition::Other("service_warped".to_string()), true),
    );
    convergence
        .wait_dependencies(&project, "app", &deps, None)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn wait_deadline_expires_as_a_timeout() {
    let engine = Arc::new(MemoryEngine::new());
    engine.script_health("db", vec![HealthStatus::Starting]);

    let db = service("db");
    let project = Arc::new(Project::new("shop", [db.clone()]));
    engine.seed(&project, &db, 1);

    let convergence = convergence(&engine, &project);
    let mut deps = BTreeMap::new();
    deps.insert("db".to_string(), depends(Condition::Healthy, true));
    let err = convergence
        .wait_dependencies(&project, "app", &deps, Some(Duration::from_secs(2)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("timeout waiting for dependencies"));
}

#[tokio::test(start_paused = true)]
async fn healthy_wait_without_healthcheck_is_a_config_error() {
    let engine = Arc::new(MemoryEngine::new());
    let db = service("db");
    let project = Arc::new(Project::new("shop", [db.clone()]));
    engine.seed(&project, &db, 1);

    let convergence = convergence(&engine, &project);
    let mut deps = BTreeMap::new();
    deps.insert("db".to_string(), depends(Condition::Healthy, true));
    let err = convergence
        .wait_dependencies(&project, "app", &deps, None)
        .await
        .unwrap_err();

    assert!(err.is_invalid_config());
    assert!(err.to_string().contains("no healthcheck"));
}

#[tokio::test(start_paused = true)]
async fn running_or_healthy_accepts_running_without_healthcheck() {
    let engine = Arc::new(MemoryEngine::new());
    let db = service("db");
    let project = Arc::new(Project::new("shop", [db.clone()]));
    engine.seed(&project, &db, 1);

    let convergence = convergence(&engine, &project);
    let mut deps = BTreeMap::new();
    deps.insert(
        "db".to_string(),
        depends(Condition::RunningOrHealthy, true),
    );
    convergence
        .wait_dependencies(&project, "app", &deps, None)
        .await
        .unwrap();
}

#[tokio::test(start_paused = true)]
async fn unhealthy_dependency_fails_the_wait() {
    let engine = Arc::new(MemoryEngine::new());
    engine.script_health(
        "db",
        vec![HealthStatus::Starting, HealthStatus::Unhealthy],
    );

    let db = service("db");
    let project = Arc::new(Project::new("shop", [db.clone()]));
    engine.seed(&project, &db, 1);

    let convergence = convergence(&engine, &project);
    let mut deps = BTreeMap::new();
    deps.insert("db".to_string(), depends(Condition::Healthy, true));
    let err = convergence
        .wait_dependencies(&project, "app", &deps, None)
        .await
        .unwrap_err();

    assert!(matches!(err, ConvergeError::Engine(_)));
    assert!(err.to_string().contains("unhealthy"));
}
