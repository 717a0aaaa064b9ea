use localacct::args::{ArgsParam, Verb};
use localacct::manager::write_invalid_command;
use localacct::{logging, AccountManager, Config};
use std::process::ExitCode;
use tracing::error;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    logging::init_logging();
    localacct::init();

    let args = ArgsParam::parse(std::env::args().skip(1));
    let mut stdout = std::io::stdout().lock();

    if args.verb == Verb::None {
        return match write_invalid_command(&mut stdout) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        };
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let mut manager = match AccountManager::from_config(config) {
        Ok(manager) => manager,
        Err(e) => {
            error!("Cannot create account provider: {}", e);
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = manager.init().await {
        error!("Account provider not usable: {}", e);
        return ExitCode::FAILURE;
    }

    // Operation failures are logged, not reported through the exit code.
    let code = match manager.execute(&args, &mut stdout).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Cannot write output: {}", e);
            ExitCode::FAILURE
        }
    };

    if let Err(e) = manager.close().await {
        error!("Failed to close account provider: {}", e);
    }
    code
}
