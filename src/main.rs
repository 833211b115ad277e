use std::panic;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use snippet_runner::cli::Args;
use snippet_runner::core::pipeline::running::Runner;
use snippet_runner::native::executor::ShimExecutor;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // stdout carries the result document, logs go to stderr.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();
    set_panic_hook();

    let args = Args::parse();
    let config = args.config();
    config.validate()?;

    let runner = Runner::new(Arc::new(ShimExecutor::new(config)));
    let result = runner.run(args.request()).await;

    let document = if args.pretty {
        serde_json::to_string_pretty(&result)?
    } else {
        serde_json::to_string(&result)?
    };
    println!("{}", document);

    Ok(())
}

fn set_panic_hook() {
    panic::set_hook(Box::new(|panic_info| {
        tracing::error!(
            message = "panic occurred",
            panic = %panic_info
        );
    }));
}
