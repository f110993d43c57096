//! Tests for force-stopping a run in progress.

use std::collections::HashMap;
use std::time::Duration;

use dagflow::{Graph, Outcome, RunInstance, TaskRunState};

use crate::fixtures::{ok_task, CallLog};

/// `source -> slow -> after`, where slow blocks for `hold`.
fn slow_graph(log: &CallLog, hold: Duration) -> Graph<String> {
    let mut graph = Graph::new("slow");
    let source = ok_task(&mut graph, log, "source");
    let record = log.task("slow", Outcome::success());
    let slow = graph
        .add_task("slow", move |ctx: Option<&String>| {
            let outcome = record(ctx);
            std::thread::sleep(hold);
            outcome
        })
        .unwrap();
    let after = ok_task(&mut graph, log, "after");
    graph.add_edge(source, slow).unwrap();
    graph.add_edge(slow, after).unwrap();
    graph
}

async fn wait_for_call(log: &CallLog, id: &str) {
    for _ in 0..200 {
        if log.count(id) > 0 {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("{} never started", id);
}

/// Test: Force stop while a task is executing
/// Given source -> slow -> after with slow still running
/// When the run is force-stopped
/// Then slow and after are STOPPED and source keeps its state
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_force_stop_mid_run() {
    let log = CallLog::new();
    let graph = slow_graph(&log, Duration::from_millis(800));

    let instance = RunInstance::start(&graph, HashMap::new()).unwrap();
    wait_for_call(&log, "slow").await;
    instance.force_stop();
    let run = instance.wait().await.unwrap();

    assert!(run.stopped());
    assert_eq!(run.state("source"), Some(TaskRunState::Succeeded));
    assert_eq!(run.state("slow"), Some(TaskRunState::Stopped));
    assert_eq!(run.state("after"), Some(TaskRunState::Stopped));
    assert_eq!(log.count("after"), 0);
}

/// Test: Stop handle from another task
/// Given a running instance
/// When a spawned task stops it through a stop handle
/// Then wait returns promptly with stopped tasks
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_handle_from_spawned_task() {
    let log = CallLog::new();
    let graph = slow_graph(&log, Duration::from_millis(800));

    let instance = RunInstance::start(&graph, HashMap::new()).unwrap();
    let stop = instance.stop_handle();
    let watcher = log.clone();
    tokio::spawn(async move {
        wait_for_call(&watcher, "slow").await;
        stop.stop();
    });

    let run = tokio::time::timeout(Duration::from_secs(5), instance.wait())
        .await
        .expect("wait should return after stop")
        .unwrap();

    assert!(run.stopped());
    assert_eq!(run.state("after"), Some(TaskRunState::Stopped));
}

/// Test: Stop before any task runs downstream
/// Given a blocked root
/// When the run is stopped immediately
/// Then every waiting task is STOPPED
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_immediately() {
    let log = CallLog::new();
    let mut graph = Graph::new("blocked");
    let root = graph
        .add_task("root", |_: Option<&String>| {
            std::thread::sleep(Duration::from_millis(300));
            Outcome::success()
        })
        .unwrap();
    let mid = ok_task(&mut graph, &log, "mid");
    let leaf = ok_task(&mut graph, &log, "leaf");
    graph.add_edge(root, mid).unwrap();
    graph.add_edge(mid, leaf).unwrap();

    let instance = RunInstance::start(&graph, HashMap::new()).unwrap();
    instance.force_stop();
    let run = instance.wait().await.unwrap();

    assert_eq!(run.state("mid"), Some(TaskRunState::Stopped));
    assert_eq!(run.state("leaf"), Some(TaskRunState::Stopped));
    assert_eq!(log.total(), 0);
}

/// Test: Stop before the first poll
/// Given root -> leaf on a current-thread runtime
/// When the run is stopped before any runner is polled
/// Then neither capability is ever invoked
#[tokio::test]
async fn test_stop_before_start_runs_nothing() {
    let log = CallLog::new();
    let mut graph = Graph::new("unstarted");
    let root = ok_task(&mut graph, &log, "root");
    let leaf = ok_task(&mut graph, &log, "leaf");
    graph.add_edge(root, leaf).unwrap();

    let instance = RunInstance::start(&graph, HashMap::new()).unwrap();
    instance.force_stop();
    let run = instance.wait().await.unwrap();

    assert_eq!(run.state("root"), Some(TaskRunState::Stopped));
    assert_eq!(run.state("leaf"), Some(TaskRunState::Stopped));
    assert_eq!(log.count("root"), 0);
    assert_eq!(log.total(), 0);
}

/// Test: Stopping a finished run changes nothing
/// Given a run that completed normally
/// When its stop handle fires afterwards
/// Then the completed states are unaffected
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_stop_after_completion() {
    let log = CallLog::new();
    let mut graph = Graph::new("done");
    let a = ok_task(&mut graph, &log, "a");
    let b = ok_task(&mut graph, &log, "b");
    graph.add_edge(a, b).unwrap();

    let instance = RunInstance::start(&graph, HashMap::new()).unwrap();
    let stop = instance.stop_handle();
    let run = instance.wait().await.unwrap();
    stop.stop();

    assert!(stop.is_stopped());
    assert!(!run.stopped());
    assert_eq!(run.state("b"), Some(TaskRunState::Succeeded));
}
