//! Built-in example graphs.
//!
//! Every task's context is its own id. Tasks announce themselves in the log
//! and succeed, except where a demo needs a branch or a failure.

use std::collections::HashMap;

use crate::core::{Graph, Outcome, TaskOptions};
use crate::{dlog, Result};

/// A named example graph.
pub struct Demo {
    pub name: &'static str,
    pub description: &'static str,
    build: fn() -> Result<Graph<String>>,
}

impl Demo {
    pub fn build(&self) -> Result<Graph<String>> {
        (self.build)()
    }
}

static DEMOS: &[Demo] = &[
    Demo {
        name: "linear",
        description: "source -> job_1",
        build: linear,
    },
    Demo {
        name: "parallel",
        description: "job_1 and job_2 with no edges",
        build: parallel,
    },
    Demo {
        name: "fan-in",
        description: "job_1, job_2 -> sink",
        build: fan_in,
    },
    Demo {
        name: "fanout",
        description: "source -> job_1, job_2; job_1 -> sink",
        build: fanout,
    },
    Demo {
        name: "diamond",
        description: "source -> a, b -> sink",
        build: diamond,
    },
    Demo {
        name: "branch",
        description: "source -> job_1 -> job_2 and source -> sink; source branches to sink",
        build: branch,
    },
    Demo {
        name: "best-effort",
        description: "source -> good, bad -> merge (best effort)",
        build: best_effort,
    },
];

pub fn all() -> &'static [Demo] {
    DEMOS
}

pub fn find(name: &str) -> Option<&'static Demo> {
    DEMOS.iter().find(|d| d.name == name)
}

/// Context map giving every task its own id.
pub fn contexts(graph: &Graph<String>) -> HashMap<String, String> {
    graph
        .tasks()
        .map(|t| (t.id().to_string(), t.id().to_string()))
        .collect()
}

fn announce(ctx: Option<&String>) -> Outcome {
    dlog!("My id is {}", ctx.map(String::as_str).unwrap_or("<none>"));
    Outcome::success()
}

fn linear() -> Result<Graph<String>> {
    let mut g = Graph::new("linear_example");
    let source = g.add_task("source", announce)?;
    let job = g.add_task("job_1", announce)?;
    g.set_downstream(source, job)?;
    Ok(g)
}

fn parallel() -> Result<Graph<String>> {
    let mut g = Graph::new("parallel_example");
    g.add_task("job_1", announce)?;
    g.add_task("job_2", announce)?;
    Ok(g)
}

fn fan_in() -> Result<Graph<String>> {
    let mut g = Graph::new("v_example");
    let one = g.add_task("job_1", announce)?;
    let two = g.add_task("job_2", announce)?;
    let sink = g.add_task("sink", announce)?;
    g.set_upstream(sink, one)?;
    g.set_upstream(sink, two)?;
    Ok(g)
}

fn fanout() -> Result<Graph<String>> {
    let mut g = Graph::new("fanout_example");
    let source = g.add_task("source", announce)?;
    let one = g.add_task("job_1", announce)?;
    let two = g.add_task("job_2", announce)?;
    let sink = g.add_task("sink", announce)?;
    g.set_upstream(two, source)?;
    g.set_upstream(one, source)?;
    g.set_downstream(one, sink)?;
    Ok(g)
}

fn diamond() -> Result<Graph<String>> {
    let mut g = Graph::new("diamond_example");
    let source = g.add_task("source", announce)?;
    let a = g.add_task("a", announce)?;
    let b = g.add_task("b", announce)?;
    let sink = g.add_task("sink", announce)?;
    g.add_edge(source, a)?;
    g.add_edge(source, b)?;
    g.add_edge(a, sink)?;
    g.add_edge(b, sink)?;
    Ok(g)
}

fn branch() -> Result<Graph<String>> {
    let mut g = Graph::new("branch_example");
    let source = g.add_task("source", |ctx: Option<&String>| {
        announce(ctx);
        Outcome::branch_to("sink")
    })?;
    let one = g.add_task("job_1", announce)?;
    let two = g.add_task("job_2", announce)?;
    let sink = g.add_task("sink", announce)?;
    g.set_upstream(two, one)?;
    g.set_upstream(one, source)?;
    g.set_upstream(sink, source)?;
    Ok(g)
}

fn best_effort() -> Result<Graph<String>> {
    let mut g = Graph::new("best_effort_example");
    let source = g.add_task("source", announce)?;
    let good = g.add_task("good", announce)?;
    let bad = g.add_task("bad", |ctx: Option<&String>| {
        announce(ctx);
        Outcome::failure("bad always fails")
    })?;
    let merge = g.add_task_with("merge", announce, TaskOptions::best_effort())?;
    g.add_edge(source, good)?;
    g.add_edge(source, bad)?;
    g.add_edge(good, merge)?;
    g.add_edge(bad, merge)?;
    Ok(g)
}
