// SPDX-License-Identifier: MIT

use clap::{Parser, Subcommand};
use dotenv::dotenv;
use stepflow_rs::flow::engine::{EngineConfig, ExecutionController};
use stepflow_rs::flow::graph::{NodeFilter, NodeId};
use stepflow_rs::wizard::nodes::register_builtins;
use stepflow_rs::wizard::workflow::builder::Builder;
use stepflow_rs::wizard::workflow::registry::NodeRegistry;
use stepflow_rs::wizard::{ConsolePresenter, WizardDriver};

use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args, Debug)]
struct EngineArgs {
    /// Maximum number of nodes executing at once
    #[arg(long)]
    max_parallel: Option<usize>,

    /// Seconds to wait for execution to settle
    #[arg(long)]
    timeout_secs: Option<u64>,
}

impl EngineArgs {
    fn config(&self) -> EngineConfig {
        let mut config = EngineConfig::from_env();
        if let Some(n) = self.max_parallel {
            config = config.with_max_parallel(n);
        }
        if let Some(secs) = self.timeout_secs {
            config = config.with_wait_timeout(Duration::from_secs(secs));
        }
        config
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Execute every node of a workflow
    Run {
        /// Path to the workflow file
        #[arg(short, long)]
        file: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Step through a workflow page by page, asking for inputs on the console
    Wizard {
        /// Path to the workflow file
        #[arg(short, long)]
        file: String,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// Step to the first interactive page and print it as JSON
    Page {
        /// Path to the workflow file
        #[arg(short, long)]
        file: String,

        /// Container to build the page for (defaults to the waiting one)
        #[arg(short, long)]
        container: Option<String>,

        #[command(flatten)]
        engine: EngineArgs,
    },
    /// List the registered node types
    Types,
}

async fn start(file: &str, config: EngineConfig) -> anyhow::Result<ExecutionController> {
    let registry = NodeRegistry::new();
    register_builtins(&registry).await;

    let builder = Builder::new(registry);
    let arena = builder.build_file(file).await?;
    let controller = ExecutionController::new(arena, config, Handle::current())?;
    log::info!(
        "Session {} started at {}",
        controller.session_id(),
        controller.started_at()
    );
    Ok(controller)
}

fn print_states(controller: &ExecutionController) {
    for snapshot in controller.snapshots() {
        let message = snapshot
            .message
            .map(|m| format!("  ({})", m))
            .unwrap_or_default();
        println!(
            "{:<12} {:<28} {}{}",
            snapshot.id.to_string(),
            snapshot.name,
            snapshot.state,
            message
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Commands::Run { file, engine } => {
            let config = engine.config();
            let timeout = config.wait_timeout;
            let controller = start(&file, config).await?;

            println!("Running workflow: {}", file);
            controller.execute_all();
            if !controller.wait_while_executing_async(timeout).await {
                log::warn!("Workflow still executing after {:?}", timeout);
            }

            print_states(&controller);
            for (id, output) in controller.sink_outputs() {
                match output {
                    Some(value) => println!("Output {}: {}", id, value),
                    None => println!("Output {}: <none>", id),
                }
            }
            println!("Session: {}", controller.session_state());
        }
        Commands::Wizard { file, engine } => {
            let controller = Arc::new(start(&file, engine.config()).await?);

            let driver_controller = Arc::clone(&controller);
            let report = tokio::task::spawn_blocking(move || {
                let presenter = ConsolePresenter::new(std::io::stdin().lock(), std::io::stdout());
                WizardDriver::new(&driver_controller, presenter).run()
            })
            .await??;

            print_states(&controller);
            println!(
                "Finished after {} pages, session: {}",
                report.pages, report.state
            );
        }
        Commands::Page {
            file,
            container,
            engine,
        } => {
            let config = engine.config();
            let timeout = config.wait_timeout;
            let controller = start(&file, config).await?;

            let filter = NodeFilter::interactive();
            controller.step_execution_up_to_node_type(filter);
            if !controller.wait_while_executing_async(timeout).await {
                log::warn!("Workflow still executing after {:?}", timeout);
            }

            let container: NodeId = match container {
                Some(raw) => raw.parse()?,
                None => controller
                    .find_next_waiting_scope(filter)
                    .map(|scope| scope.id().clone())
                    .unwrap_or_else(|| controller.root_id()),
            };
            let page = controller.get_page(&container)?;
            println!("{}", page.to_json()?);
        }
        Commands::Types => {
            let registry = NodeRegistry::new();
            register_builtins(&registry).await;
            for factory in registry.list().await {
                println!("{:<12} {}", factory.type_name(), factory.description());
                println!("{:<12} config: {}", "", factory.schema());
            }
        }
    }

    Ok(())
}
