use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::{net::TcpListener, sync::oneshot};
use tracing::{info, warn};

use channel_cache::{
    cache::Cache,
    cli::{Cli, Command, ServeArgs},
    client,
    refresh::Refresher,
    server::Server,
    store::{PgRecordStore, RecordStore},
};

fn init_tracing() {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = fmt().with_env_filter(filter).with_target(false).try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await?,
        Command::Sample(args) => client::run(args).await?,
    }

    Ok(())
}

async fn serve(args: ServeArgs) -> Result<()> {
    info!("cache service started");

    let store: Arc<dyn RecordStore> = Arc::new(
        PgRecordStore::connect_lazy(&args.database_url, args.query.clone())
            .context("invalid database url")?,
    );
    let cache = Arc::new(Cache::new());
    let refresher = Refresher::new(store, Arc::clone(&cache));

    // Nothing useful can be served until the first load succeeds.
    refresher
        .refresh()
        .await
        .context("initial cache load failed")?;

    let listener = TcpListener::bind(args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    let server = Server::new(listener, Arc::clone(&cache), args.server_config());
    info!("server listening on {}", server.local_addr()?);

    let (stop_refresh, refresh_stopped) = oneshot::channel::<()>();
    let refresh_task = tokio::spawn(refresher.run_until(args.refresh_interval(), async move {
        let _ = refresh_stopped.await;
    }));

    let result = server.run_until_ctrl_c().await;
    let _ = stop_refresh.send(());
    if let Err(err) = refresh_task.await {
        warn!(error = ?err, "refresh task ended abnormally");
    }

    if let Err(err) = &result {
        warn!("server exited with error: {err:?}");
    }
    result
}
