// src/main.rs

use e2e_harness::{cli, logging, run};

#[tokio::main]
async fn main() {
    let cli = cli::parse();
    if let Err(err) = logging::init_logging(cli.log_level) {
        eprintln!("e2e-harness error: {err:?}");
        std::process::exit(1);
    }

    match run(cli).await {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("e2e-harness error: {err}");
            std::process::exit(err.exit_code());
        }
    }
}
