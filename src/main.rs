// src/main.rs

use ibazel::{cli, logging, run};

#[tokio::main]
async fn main() {
    let args = cli::parse();

    if let Err(err) = logging::init_logging(args.log_level) {
        eprintln!("ibazel error: {err:?}");
        std::process::exit(ibazel::errors::EXIT_FAILURE);
    }

    if let Err(err) = run(args).await {
        eprintln!("ibazel error: {err}");
        std::process::exit(err.exit_code());
    }
}
