use std::time::Duration;

use clap::{Parser, Subcommand};

use dagflow::config::Config;
use dagflow::{demo, dlog, Error, Graph, Result, RunInstance};

/// dagflow - run a dependency graph of tasks
#[derive(Parser, Debug)]
#[command(name = "dagflow")]
#[command(version, about, long_about = None)]
#[command(
    after_help = "ENVIRONMENT:\n    DAGFLOW_DEBUG=1     Enable debug logging (alternative to --debug)"
)]
pub struct Cli {
    /// Enable debug logging (writes to ~/.dagflow/dagflow.log)
    #[arg(short = 'd', long)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// List the built-in example graphs
    List,

    /// Run a built-in example graph and print every task's final state
    Demo {
        /// Name of the example (see `dagflow list`)
        name: String,

        /// Print the completed run as JSON
        #[arg(long)]
        json: bool,

        /// Force-stop the run after this many seconds
        #[arg(long, value_name = "SECS")]
        timeout: Option<u64>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load()?;

    dagflow::log::init_with_debug(cli.debug || config.debug);

    match cli.command {
        Command::List => run_list(),
        Command::Demo {
            name,
            json,
            timeout,
        } => {
            let timeout = timeout.map(Duration::from_secs).or(config.run_timeout());
            run_demo(&name, json || config.json, timeout)
        }
    }
}

fn run_list() -> Result<()> {
    dlog!("List command");
    for demo in demo::all() {
        println!("{:<12} {}", demo.name, demo.description);
    }
    Ok(())
}

/// Build the named demo, run it, and print the outcome.
///
/// With a timeout, a watchdog force-stops the run once it elapses.
fn run_demo(name: &str, json: bool, timeout: Option<Duration>) -> Result<()> {
    dlog!("Demo command: name={}, json={}, timeout={:?}", name, json, timeout);

    let demo = demo::find(name).ok_or_else(|| {
        Error::Validation(format!("unknown demo {} (see `dagflow list`)", name))
    })?;
    let graph = demo.build()?;
    let contexts = demo::contexts(&graph);

    if !json {
        println!("Graph {}:", graph.name());
        print!("{}", graph.describe());
        println!("{}", order_line(&graph)?);
        println!();
    }

    let rt = tokio::runtime::Runtime::new()?;
    let completed = rt.block_on(async {
        let instance = RunInstance::start(&graph, contexts)?;
        if let Some(limit) = timeout {
            let stop = instance.stop_handle();
            tokio::spawn(async move {
                tokio::time::sleep(limit).await;
                stop.stop();
            });
        }
        instance.wait().await
    });
    rt.shutdown_background();
    let completed = completed?;

    if json {
        println!("{}", serde_json::to_string_pretty(&completed)?);
    } else {
        print!("{}", completed.status_report());
        if completed.stopped() {
            println!("\nRun was force-stopped");
        }
    }
    Ok(())
}

/// `order: a, b, c` in an order that respects every edge.
fn order_line<C>(graph: &Graph<C>) -> Result<String> {
    let ids: Vec<&str> = graph.topological_order()?.into_iter().map(|t| t.id()).collect();
    Ok(format!("order: {}", ids.join(", ")))
}
