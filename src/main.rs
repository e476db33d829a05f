// src/main.rs

use replit::{cli, logging, run, EXIT_FAILURE};

#[tokio::main]
async fn main() {
    // Exit explicitly: the key reader lives on a blocking thread.
    match run_main().await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("replit error: {err:#}");
            std::process::exit(EXIT_FAILURE);
        }
    }
}

async fn run_main() -> anyhow::Result<i32> {
    let args = cli::parse();
    logging::init_logging(args.log_level)?;
    run(args).await
}
