use {
    mp_sync::{
        AppState, DEFAULT_WEBHOOK_BUDGET,
        adapters::{
            fcm::{DisabledPush, FcmSender},
            mercadopago::{MercadoPagoClient, RestLookup, SearchLookup, SignatureVerifier},
            resend::ResendTransport,
        },
        config::Config,
        domain::{
            delivery::PushSender,
            repo::{EmailQueue, NotificationStore, UserDirectory},
        },
        infra::postgres::{
            PgCodeStore, PgEmailQueue, PgNotificationStore, PgPaymentStore, PgUserDirectory,
        },
        services::{
            dispatcher::NotificationDispatcher,
            fetcher::{DEFAULT_FETCH_BUDGET, PaymentFetcher},
            payment_pipeline::PaymentPipeline,
            worker,
        },
    },
    sqlx::postgres::PgPoolOptions,
    std::{sync::Arc, time::Duration},
    tokio::{signal, sync::watch},
    tracing_subscriber::EnvFilter,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("mp_sync=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env().expect("invalid configuration");

    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(&config.database_url)
        .await
        .expect("failed to connect to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("failed to run migrations");

    let payments = Arc::new(PgPaymentStore::new(pool.clone()));
    let users: Arc<dyn UserDirectory> = Arc::new(PgUserDirectory::new(pool.clone()));
    let notifications: Arc<dyn NotificationStore> =
        Arc::new(PgNotificationStore::new(pool.clone()));
    let emails: Arc<dyn EmailQueue> = Arc::new(PgEmailQueue::new(pool.clone()));

    let push: Arc<dyn PushSender> = match &config.fcm {
        Some(fcm) => Arc::new(
            FcmSender::new(&fcm.project_id, fcm.access_token.clone())
                .expect("failed to build FCM client"),
        ),
        None => {
            tracing::warn!("FCM not configured, push notifications will only be queued");
            Arc::new(DisabledPush)
        }
    };

    let mp = Arc::new(
        MercadoPagoClient::new(
            config.mp_api_base.clone(),
            config.mp_access_token.clone(),
            config.mp_notification_url.clone(),
        )
        .expect("failed to build Mercado Pago client"),
    );
    let fetcher = PaymentFetcher::mercado_pago(
        Arc::new(RestLookup(mp.clone())),
        Arc::new(SearchLookup(mp.clone())),
        DEFAULT_FETCH_BUDGET,
    );

    let dispatcher = Arc::new(NotificationDispatcher::new(
        users.clone(),
        push.clone(),
        notifications.clone(),
        config.admin_fanout,
    ));
    let pipeline = PaymentPipeline::new(
        payments.clone(),
        users.clone(),
        dispatcher,
        emails.clone(),
        chrono::Duration::minutes(config.pending_notify_after_minutes),
    );

    let state = AppState {
        verifier: SignatureVerifier::new(config.mp_webhook_secret.as_str()),
        fetcher: Arc::new(fetcher),
        pipeline: Arc::new(pipeline),
        gateway: mp,
        payments,
        codes: Arc::new(PgCodeStore::new(pool.clone())),
        emails: emails.clone(),
        webhook_budget: DEFAULT_WEBHOOK_BUDGET,
    };

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = Vec::new();

    workers.push(tokio::spawn(worker::run_notification_worker(
        notifications.clone(),
        users.clone(),
        push,
        shutdown_rx.clone(),
    )));
    match &config.resend_api_key {
        Some(key) => {
            let transport = ResendTransport::new(key.clone(), config.email_from.clone())
                .expect("failed to build Resend client");
            workers.push(tokio::spawn(worker::run_email_worker(
                emails.clone(),
                Arc::new(transport),
                shutdown_rx.clone(),
            )));
        }
        None => tracing::warn!("RESEND_API_KEY not set, queued emails will stay pending"),
    }
    workers.push(tokio::spawn(worker::run_reaper(
        notifications,
        emails,
        shutdown_rx,
    )));

    let app = mp_sync::app(state);

    let addr = config.addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind listener");
    tracing::info!("listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    let _ = shutdown_tx.send(true);
    for handle in workers {
        if let Err(e) = handle.await {
            tracing::error!(error = %e, "worker task panicked");
        }
    }
    pool.close().await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to listen for ctrl+c");
    };

    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to listen for SIGTERM")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl+c, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
