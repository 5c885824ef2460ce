use std::{io, time::Instant};

use log::{error, info};
use parameter_server::ParameterServer;
use tokio::net::TcpListener;
use worker::{
    Exporter, LocalSession, SavedModelBuilder, SummaryWriter, Supervisor, SupervisorOpts,
    Trainer,
    trainer::{HPTUNING_METRIC_TAG, LOSS_TAG},
};

use crate::{cluster::TfConfig, flags::TaskConfig};

/// Trains in this process and exports the model for generic inference.
///
/// Export failures are logged and swallowed.
pub async fn run_standalone(config: &TaskConfig) -> worker::Result<()> {
    let start = Instant::now();
    let dataset = config.dataset();
    let mut session = LocalSession::new(config.optimizer);

    info!("Save tensorboard files into: {}", config.output_path.display());
    let mut writer = SummaryWriter::open(&config.output_path)?;

    let params = Trainer::new(config.max_epochs, config.checkpoint_period)
        .with_loss_tags(&[LOSS_TAG, HPTUNING_METRIC_TAG])
        .train(&mut session, &dataset, Some(&mut writer))
        .await?;
    writer.close()?;

    info!("[{:?}] End of standalone training.", start.elapsed());
    info!("Get the model, w: {}, b: {}", params[0], params[1]);

    let exporter = Exporter::new(&config.model_path, config.model_version);
    if let Err(e) = exporter.export(session.step(), &params) {
        error!("Fail to export model, exception: {e}");
    }

    Ok(())
}

/// Serves this task's share of the variables until every trainer is done.
pub async fn run_ps(config: &TaskConfig, cluster: &TfConfig) -> io::Result<()> {
    let addr = listen_addr(cluster.task_addr())?;
    let listener = TcpListener::bind(&addr).await?;
    info!("ps {} listening at {addr}", cluster.task.index);

    let server = ParameterServer::new(config.optimizer, cluster.trainers());
    server.serve(listener).await
}

/// Trains against the cluster's parameter servers, the master also exports.
///
/// Failures are logged and swallowed.
pub async fn run_trainer(config: &TaskConfig, cluster: &TfConfig) {
    if let Err(e) = train_distributed(config, cluster).await {
        error!("{e}");
    }
}

async fn train_distributed(config: &TaskConfig, cluster: &TfConfig) -> worker::Result<()> {
    let start = Instant::now();
    let is_chief = cluster.is_chief();
    let dataset = config.dataset();

    let mut opts = SupervisorOpts::new(is_chief, &config.checkpoint_path);
    opts.connect = config.connect;
    opts.recovery_wait = config.connect.backoff;

    let supervisor = Supervisor::new(opts, cluster.cluster.ps.clone());
    let mut managed = supervisor.managed_session().await?;

    info!("Save tensorboard files into: {}", config.output_path.display());
    let mut writer = if is_chief {
        Some(SummaryWriter::open(&config.output_path)?)
    } else {
        None
    };

    Trainer::new(config.max_epochs, config.checkpoint_period)
        .train(managed.session(), &dataset, writer.as_mut())
        .await?;

    if let Some(writer) = writer {
        writer.close()?;
    }

    info!("[{:?}] End of distributed training.", start.elapsed());
    let (step, params) = managed.finish().await?;

    if is_chief {
        let builder = SavedModelBuilder::new(&config.saved_model_path, config.model_version);
        if let Err(e) = builder.save(step, &params) {
            error!("Fail to export saved model, exception: {e}");
        }
    }

    Ok(())
}

/// Listens on every interface at the port of the task's address.
fn listen_addr(task_addr: &str) -> io::Result<String> {
    let port = task_addr
        .rsplit_once(':')
        .map(|(_, port)| port)
        .filter(|port| port.parse::<u16>().is_ok())
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("task address {task_addr} has no port"),
            )
        })?;

    Ok(format!("0.0.0.0:{port}"))
}
