use crate::cli::ServeArgs;
use crate::infra::{seed_directory, seed_settings, AppState};
use crate::routes::with_workflow_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use queuedesk::clock::{Clock, SystemClock};
use queuedesk::config::AppConfig;
use queuedesk::error::AppError;
use queuedesk::notifications::{ChannelNotifier, LogTransport, NotificationDispatcher};
use queuedesk::telemetry;
use queuedesk::workflows::admissions::{
    AdmissionWorkflowEngine, MemoryAdmissionStore, PipelineCatalog,
};
use queuedesk::workflows::queue::{MemoryTicketStore, QueueTicketService};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let (notifier, notifications) = ChannelNotifier::new(config.notifications.channel_capacity);
    let dispatcher = NotificationDispatcher::spawn(notifications, Arc::new(LogTransport));
    let notifier = Arc::new(notifier);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let ticket_service = Arc::new(QueueTicketService::new(
        Arc::new(seed_directory()?),
        Arc::new(seed_settings(&config.queue)),
        Arc::new(MemoryTicketStore::default()),
        notifier.clone(),
        clock.clone(),
    ));

    let admission_store = Arc::new(MemoryAdmissionStore::default());
    let catalog = Arc::new(PipelineCatalog::new(admission_store.clone()));
    let admissions = Arc::new(AdmissionWorkflowEngine::new(
        admission_store,
        notifier,
        clock,
    ));

    let app = with_workflow_routes(ticket_service, catalog, admissions)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "queuedesk ready");

    axum::serve(listener, app).await?;

    match dispatcher.await {
        Ok(delivered) => info!(delivered, "notification dispatcher drained"),
        Err(err) => warn!(error = %err, "notification dispatcher aborted"),
    }
    Ok(())
}
