use std::process::ExitCode;

use clap::Parser;
use log::{error, info};
use node::{Flags, TaskConfig, TaskType, TfConfig, roles};

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::init();

    let flags = Flags::parse();
    info!("Use the optimizer: {}", flags.optimizer);

    let config = match TaskConfig::try_from(flags) {
        Ok(config) => config,
        Err(e) => {
            error!("{e}, exit now");
            return ExitCode::FAILURE;
        }
    };

    let cluster = match TfConfig::from_env() {
        Ok(cluster) => cluster,
        Err(e) => {
            error!("{e}");
            return ExitCode::FAILURE;
        }
    };

    let Some(cluster) = cluster else {
        return match roles::run_standalone(&config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("{e}");
                ExitCode::FAILURE
            }
        };
    };

    match cluster.task.kind {
        TaskType::Ps => match roles::run_ps(&config, &cluster).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                error!("ps failed: {e}");
                ExitCode::FAILURE
            }
        },
        TaskType::Worker | TaskType::Master => {
            roles::run_trainer(&config, &cluster).await;
            ExitCode::SUCCESS
        }
    }
}
