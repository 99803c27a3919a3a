use std::error::Error;
use std::pin::pin;

use colored::Colorize;
use futures::TryStreamExt;
use graph_api::nodes::spec_for_edge;
use graph_api::{CrudNode, GraphApi, GraphApiError, ObjectSpec, Params, RequestMode};
use stripe_api::{RequestOptions, StripeClient};
use tracing::{Level, info};
use tracing_subscriber::{Layer, filter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const USAGE: &str = "usage:
  api-sdk graph <node_id> [edge] [field,field,...]
  api-sdk stripe readers|payment-intents";

/// Node of unknown type read by id.
static ANY_NODE: ObjectSpec = ObjectSpec::ANY;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // A missing .env is fine; a malformed one is not.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            return Err(e.into());
        }
    }
    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let result = match args.first().map(String::as_str) {
        Some("graph") => run_graph(&args[1..]).await,
        Some("stripe") => run_stripe(&args[1..]).await,
        _ => {
            eprintln!("{}", USAGE.yellow());
            std::process::exit(2);
        }
    };

    if let Err(e) = result {
        eprintln!("{} {e}", "error:".red().bold());
        std::process::exit(1);
    }
    Ok(())
}

fn init_tracing() {
    let mut env_filter = graph_api::telemetry::env_filter_with_level("info", Level::INFO);
    if let Ok(directive) = stripe_api::telemetry::level_directive(Level::INFO) {
        env_filter = env_filter.add_directive(directive);
    }
    let runner = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter::filter_fn(|meta| meta.target().starts_with("api_sdk")));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(runner)
        .with(graph_api::telemetry::layer())
        .with(stripe_api::telemetry::layer())
        .init();
}

/// Reads a node, or walks one of its edges, printing one JSON object per line.
async fn run_graph(args: &[String]) -> Result<(), Box<dyn Error>> {
    let Some(node_id) = args.first() else {
        return Err(USAGE.into());
    };
    let edge = args.get(1).map(String::as_str).filter(|e| !e.is_empty());
    let fields: Option<Vec<String>> = args.get(2).map(|list| {
        list.split(',')
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string)
            .collect()
    });

    let api = GraphApi::from_env()?;
    let mut node = CrudNode::new(api.clone(), &ANY_NODE, node_id.clone());

    let Some(edge) = edge else {
        node.api_get(fields.as_deref(), Params::new(), RequestMode::Execute)
            .await?;
        println!("{}", node.export_all_data());
        return Ok(());
    };

    let target = spec_for_edge(edge)
        .ok_or_else(|| GraphApiError::BadParameter(format!("unknown edge '{edge}'")))?;
    let cursor = node
        .iterate_edge(target, fields.as_deref(), Params::new(), true)
        .await?;
    let total = cursor.total().ok();

    let mut printed = 0usize;
    let mut stream = pin!(cursor.into_stream());
    while let Some(obj) = stream.try_next().await? {
        println!("{}", obj.export_all_data());
        printed += 1;
    }

    info!(
        edge,
        printed,
        total,
        requests = api.num_requests_succeeded(),
        "edge read complete"
    );
    Ok(())
}

/// Lists every terminal reader or payment intent through auto-pagination.
async fn run_stripe(args: &[String]) -> Result<(), Box<dyn Error>> {
    let client = StripeClient::from_env()?;
    let opts = RequestOptions::new();
    let params = serde_json::json!({ "limit": 100 });

    let printed = match args.first().map(String::as_str) {
        Some("readers") => {
            let list = client.terminal_readers().list(&params, &opts).await?;
            print_all(list.auto_paging()).await?
        }
        Some("payment-intents") => {
            let list = client.payment_intents().list(&params, &opts).await?;
            print_all(list.auto_paging()).await?
        }
        _ => return Err(USAGE.into()),
    };

    info!(printed, "stripe list complete");
    Ok(())
}

async fn print_all<T, S>(stream: S) -> Result<usize, Box<dyn Error>>
where
    T: serde::Serialize,
    S: futures::Stream<Item = stripe_api::StripeResult<T>>,
{
    let mut stream = pin!(stream);
    let mut printed = 0usize;
    while let Some(item) = stream.try_next().await? {
        println!("{}", serde_json::to_string(&item)?);
        printed += 1;
    }
    Ok(printed)
}
