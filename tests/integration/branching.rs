//! Tests for conditional branching.
//!
//! A task that returns a branch target sends its true state only along the
//! edge to that target. Every other successor receives SKIPPED.

use std::collections::HashMap;

use dagflow::{Graph, Outcome, TaskRunState};

use crate::fixtures::{id_contexts, ok_task, task_with, CallLog};

/// `source -> job_1 -> job_2` and `source -> sink`, with source branching to
/// `target`.
fn branch_graph(log: &CallLog, target: &str) -> Graph<String> {
    let mut graph = Graph::new("branch");
    let source = task_with(&mut graph, log, "source", Outcome::branch_to(target), false);
    let one = ok_task(&mut graph, log, "job_1");
    let two = ok_task(&mut graph, log, "job_2");
    let sink = ok_task(&mut graph, log, "sink");
    graph.add_edge(source, one).unwrap();
    graph.add_edge(one, two).unwrap();
    graph.add_edge(source, sink).unwrap();
    graph
}

/// Test: Branch pruning
/// Given source branching to sink
/// When the graph runs
/// Then the job_1 path is skipped and sink succeeds
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_branch_prunes_other_path() {
    let log = CallLog::new();
    let graph = branch_graph(&log, "sink");

    let run = dagflow::run(&graph, id_contexts(&graph)).await.unwrap();

    assert_eq!(run.state("source"), Some(TaskRunState::Succeeded));
    assert_eq!(run.state("job_1"), Some(TaskRunState::Skipped));
    assert_eq!(run.state("job_2"), Some(TaskRunState::Skipped));
    assert_eq!(run.state("sink"), Some(TaskRunState::Succeeded));
    assert_eq!(log.count("job_1"), 0);
    assert_eq!(log.count("job_2"), 0);
}

/// Test: Branch exclusivity
/// Given a source with four successors
/// When the source branches to each of them in turn
/// Then only the chosen successor executes
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_branch_exclusivity_for_every_target() {
    let targets = ["w", "x", "y", "z"];
    for chosen in targets {
        let log = CallLog::new();
        let mut graph = Graph::new("fan");
        let source = task_with(&mut graph, &log, "source", Outcome::branch_to(chosen), false);
        for id in targets {
            let t = ok_task(&mut graph, &log, id);
            graph.add_edge(source, t).unwrap();
        }

        let run = dagflow::run(&graph, HashMap::new()).await.unwrap();

        for id in targets {
            let expected = if id == chosen {
                TaskRunState::Succeeded
            } else {
                TaskRunState::Skipped
            };
            assert_eq!(run.state(id), Some(expected), "branch to {}", chosen);
        }
        assert_eq!(log.total(), 2);
    }
}

/// Test: A failed branch sends FAILED only to its target
/// Given a failing source that names a branch target
/// When the graph runs
/// Then the target resigns and the other successor is skipped
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_failed_branch() {
    let log = CallLog::new();
    let mut graph = Graph::new("failed-branch");
    let outcome = Outcome::failure("source broke").with_branch("left");
    let source = task_with(&mut graph, &log, "source", outcome, false);
    let left = ok_task(&mut graph, &log, "left");
    let right = ok_task(&mut graph, &log, "right");
    graph.add_edge(source, left).unwrap();
    graph.add_edge(source, right).unwrap();

    let run = dagflow::run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(run.state("source"), Some(TaskRunState::Failed));
    assert_eq!(run.state("left"), Some(TaskRunState::Resigned));
    assert_eq!(run.state("right"), Some(TaskRunState::Skipped));
}

/// Test: Skips converge at a join
/// Given a branch that skips both inputs of a join task
/// When the graph runs
/// Then the join is skipped as well
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_all_skipped_inputs_skip_join() {
    let log = CallLog::new();
    let mut graph = Graph::new("skip-join");
    let source = task_with(&mut graph, &log, "source", Outcome::branch_to("other"), false);
    let a = ok_task(&mut graph, &log, "a");
    let b = ok_task(&mut graph, &log, "b");
    let join = ok_task(&mut graph, &log, "join");
    let other = ok_task(&mut graph, &log, "other");
    graph.add_edge(source, a).unwrap();
    graph.add_edge(source, b).unwrap();
    graph.add_edge(a, join).unwrap();
    graph.add_edge(b, join).unwrap();
    graph.add_edge(source, other).unwrap();

    let run = dagflow::run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(run.state("join"), Some(TaskRunState::Skipped));
    assert_eq!(run.state("other"), Some(TaskRunState::Succeeded));
    assert_eq!(log.count("join"), 0);
}

/// Test: Mixed skip and success at a join
/// Given a join fed by one skipped and one succeeded predecessor
/// When the graph runs
/// Then the join executes
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_partial_skip_executes_join() {
    let log = CallLog::new();
    let mut graph = Graph::new("partial");
    let source = task_with(&mut graph, &log, "source", Outcome::branch_to("a"), false);
    let a = ok_task(&mut graph, &log, "a");
    let b = ok_task(&mut graph, &log, "b");
    let join = ok_task(&mut graph, &log, "join");
    graph.add_edge(source, a).unwrap();
    graph.add_edge(source, b).unwrap();
    graph.add_edge(a, join).unwrap();
    graph.add_edge(b, join).unwrap();

    let run = dagflow::run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(run.state("a"), Some(TaskRunState::Succeeded));
    assert_eq!(run.state("b"), Some(TaskRunState::Skipped));
    assert_eq!(run.state("join"), Some(TaskRunState::Succeeded));
    assert_eq!(log.count("join"), 1);
}

/// Test: Unknown branch target
/// Given a source that branches to an id it has no edge to
/// When the graph runs
/// Then every successor is skipped
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_unknown_branch_target_skips_all() {
    let log = CallLog::new();
    let mut graph = Graph::new("unknown");
    let source = task_with(&mut graph, &log, "source", Outcome::branch_to("ghost"), false);
    let a = ok_task(&mut graph, &log, "a");
    graph.add_edge(source, a).unwrap();

    let run = dagflow::run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(run.state("source"), Some(TaskRunState::Succeeded));
    assert_eq!(run.state("a"), Some(TaskRunState::Skipped));
}

/// Test: Branch on a sink
/// Given a sink that returns a branch target
/// When the graph runs
/// Then the sink's own state is still SUCCEEDED
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_sink_branch_reports_true_state() {
    let log = CallLog::new();
    let mut graph = Graph::new("sink-branch");
    task_with(&mut graph, &log, "only", Outcome::branch_to("nowhere"), false);

    let run = dagflow::run(&graph, HashMap::new()).await.unwrap();

    assert_eq!(run.state("only"), Some(TaskRunState::Succeeded));
}
