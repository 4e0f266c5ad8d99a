//! Process bootstrap: CLI parsing, settings, capability wiring, HTTP server, and
//! graceful shutdown (spec §5, §9 ambient stack).
//!
//! Mirrors the teacher's `Controller::create`/`Controller::init`/`Controller::run`
//! split, scaled down to the capabilities this service actually owns.

use std::net::Ipv6Addr;
use std::sync::Arc;
use std::time::Duration;

use actix_cors::Cors;
use actix_web::web::Data;
use actix_web::{web, App, HttpServer};
use clap::Parser;
use nestcall_call_core::{CallCoordinator, RecorderCoordinator, RecordingIngest, RecordingQueue, RecordingQueueConfig};
use nestcall_controller_service_facade::CallService;
use nestcall_controller_settings::SettingsProvider;
use nestcall_signaling_core::{CallStore, Clock, IceConfigProvider, RecorderBackend, SignalRelay, SystemClock};
use nestcall_types_api::error::json_error_handler;
use nestcall_types_common::MemberId;
use tokio::signal::ctrl_c;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::broadcast;
use tokio::time::sleep;
use tracing_actix_web::TracingLogger;
use utoipa::OpenApi as _;
use utoipa_swagger_ui::SwaggerUi;

use crate::api_doc::ApiDoc;
use crate::backend::CoordinatorBackend;
use crate::cli::Args;
use crate::metrics::{metrics_handler, Metrics};
use crate::reference_impls::{HttpRecorderBackend, InMemoryCallStore, LocalDiskAssetStore, LoggingNotifier, PassthroughTranscodeService, RolePolicy};
use crate::routes::{member_scope, queue_scope, recorder_scope};

/// Everything [`Controller::run`] needs to build the HTTP server and its background
/// tasks. Held behind `Arc`s so the `HttpServer::new` factory closure can cheaply
/// clone a handle per worker thread.
pub struct Controller {
    settings: SettingsProvider,
    args: Args,
    service: Arc<CallService>,
    relay: Arc<SignalRelay>,
    queue: Arc<RecordingQueue>,
    recorder_coordinator: Arc<RecorderCoordinator>,
    metrics: Arc<Metrics>,
    shutdown: broadcast::Sender<()>,
}

impl Controller {
    /// Parses CLI args, loads settings, installs the tracing subscriber, and wires
    /// every capability together. Does not bind a socket yet — call [`Controller::run`]
    /// for that.
    pub async fn create(program_name: &str) -> anyhow::Result<Self> {
        let args = Args::parse();
        let settings = SettingsProvider::load(&args.config)?;
        let loaded = settings.get();

        let log_format = nestcall_log::LogFormat::default();
        let _ = nestcall_log::init_subscriber(log_format, loaded.logging.default_directives.as_deref());

        tracing::info!("Starting {program_name}");

        let call_store: Arc<dyn CallStore> = Arc::new(InMemoryCallStore::new());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let ice: Arc<dyn IceConfigProvider> = Arc::new(nestcall_signaling_core::StaticIceConfigProvider::new(
            loaded.ice.stun_urls.clone(),
            loaded.ice.turn.clone().map(|turn| nestcall_signaling_core::TurnConfig {
                urls: turn.urls,
                username: turn.username,
                credential: turn.credential,
            }),
        ));
        let policy = Arc::new(RolePolicy);
        let notifier = Arc::new(LoggingNotifier);
        let relay = Arc::new(SignalRelay::with_ttl(Duration::from_millis(loaded.signaling.ttl_ms)));

        let alert_recipient = loaded
            .recording_queue
            .alert_recipient_member_id
            .map(MemberId::from)
            .unwrap_or_else(MemberId::nil);
        let queue_config = RecordingQueueConfig::new(loaded.recording_queue.max_concurrent, alert_recipient);
        let queue = Arc::new(RecordingQueue::new(queue_config, notifier.clone(), clock.clone()));

        let recorder_backend: Arc<dyn RecorderBackend> = Arc::new(HttpRecorderBackend::new(
            &loaded.recorder,
            loaded.api.public_base_url.clone(),
            loaded.auth.jwt_secret.clone(),
        ));
        let recorder_coordinator = Arc::new(RecorderCoordinator::new(
            recorder_backend.clone(),
            call_store.clone(),
            relay.clone(),
            queue.clone(),
        ));

        let coordinator = Arc::new(CallCoordinator::new(
            call_store.clone(),
            policy,
            notifier,
            relay.clone(),
            clock,
            ice,
            recorder_coordinator.clone(),
        ));

        let transcoder = Arc::new(PassthroughTranscodeService);
        let assets = Arc::new(LocalDiskAssetStore::new("./recordings", loaded.api.public_base_url.clone()));
        let ingest = Arc::new(RecordingIngest::new(
            call_store.clone(),
            transcoder,
            assets,
            queue.clone(),
            recorder_coordinator.clone(),
        ));

        let backend = CoordinatorBackend::new(coordinator, queue.clone(), ingest, call_store);
        let service = Arc::new(CallService::new(backend));

        // Reconcile local bookkeeping with whatever the recorder backend already has
        // running, in case this process restarted while sessions were in flight.
        if let Ok(count) = recorder_backend.active_sessions().await {
            queue.sync_active(count);
        }

        let (shutdown, _) = broadcast::channel::<()>(1);

        Ok(Self {
            settings,
            args,
            service,
            relay,
            queue,
            recorder_coordinator,
            metrics: Arc::new(Metrics::new()),
            shutdown,
        })
    }

    /// Binds the HTTP listener, spawns the background sweep tasks, and blocks until
    /// `SIGINT`/`SIGTERM` (via [`ctrl_c`]) is received, reloading settings on
    /// `SIGHUP` in the meantime.
    pub async fn run(self) -> anyhow::Result<()> {
        self.spawn_signal_sweep();
        self.spawn_queue_sweep();
        self.spawn_recorder_sweep();

        let settings = self.settings.get();
        let service = Data::from(self.service.clone());
        let metrics = Data::from(self.metrics.clone());
        let settings_provider_data = Data::new(self.settings.clone());

        let http_server = HttpServer::new(move || {
            let cors = setup_cors(&settings.http.allowed_origins);

            App::new()
                .wrap(cors)
                .wrap(TracingLogger::default())
                .app_data(web::JsonConfig::default().error_handler(json_error_handler))
                .app_data(service.clone())
                .app_data(metrics.clone())
                .app_data(settings_provider_data.clone())
                .service(metrics_handler)
                .service(SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-doc/openapi.json", ApiDoc::openapi()))
                .service(member_scope())
                .service(recorder_scope())
                .service(queue_scope())
        });

        let address = (Ipv6Addr::UNSPECIFIED, self.settings.get().http.port);

        let http_server = if let Some(tls) = &self.settings.get().http.tls {
            let config = setup_rustls(tls)?;
            http_server.bind_rustls(address, config)?
        } else {
            http_server.bind(address)?
        };

        tracing::info!("Startup finished, listening on [::]:{}", address.1);

        let http_server = http_server.disable_signals().run();
        let http_server_handle = http_server.handle();

        actix_web::rt::spawn(http_server);

        let mut reload_signal = signal(SignalKind::hangup())?;

        loop {
            tokio::select! {
                _ = ctrl_c() => {
                    tracing::info!("Got termination signal, exiting");
                    break;
                }
                _ = reload_signal.recv() => {
                    tracing::info!("Got reload signal, reloading");
                    if let Err(err) = self.settings.reload(&self.args.config) {
                        tracing::error!(?err, "failed to reload settings");
                    } else {
                        let _ = self.shutdown.send(());
                    }
                }
            }
        }

        let _ = self.shutdown.send(());
        http_server_handle.stop(true).await;

        for _ in 0..10 {
            if self.shutdown.receiver_count() == 0 {
                break;
            }
            sleep(Duration::from_secs(1)).await;
        }

        Ok(())
    }

    fn spawn_signal_sweep(&self) {
        let relay = self.relay.clone();
        let interval = Duration::from_millis(self.settings.get().signaling.sweep_interval_ms);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => relay.sweep(),
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    fn spawn_queue_sweep(&self) {
        let queue = self.queue.clone();
        let interval = queue.cleanup_interval();
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => queue.sweep(),
                    _ = shutdown.recv() => break,
                }
            }
        });
    }

    fn spawn_recorder_sweep(&self) {
        let recorder = self.recorder_coordinator.clone();
        let interval = Duration::from_millis(self.settings.get().recording_queue.cleanup_interval_ms);
        let mut shutdown = self.shutdown.subscribe();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = ticker.tick() => recorder.sweep_stale_processing().await,
                    _ = shutdown.recv() => break,
                }
            }
        });
    }
}

/// Runs `f`, logging the error and exiting the process with a non-zero status on
/// failure. Used by the `nestcall-controller` binary so a startup or runtime error
/// is reported before the process dies rather than only as an unwinding panic.
pub async fn try_or_exit<T, F>(f: F) -> T
where
    F: std::future::Future<Output = anyhow::Result<T>>,
{
    match f.await {
        Ok(ok) => ok,
        Err(err) => {
            if log::log_enabled!(log::Level::Error) {
                tracing::error!("Crashed with error: {err:?}");
            } else {
                eprintln!("Crashed with error: {err:?}");
            }
            std::process::exit(-1);
        }
    }
}

fn setup_cors(allowed_origins: &[String]) -> Cors {
    if allowed_origins.is_empty() {
        return Cors::permissive();
    }

    allowed_origins.iter().fold(Cors::default(), |cors, origin| cors.allowed_origin(origin)).allow_any_method().allow_any_header()
}

fn setup_rustls(tls: &nestcall_controller_settings::HttpTls) -> anyhow::Result<rustls::ServerConfig> {
    use std::fs::File;
    use std::io::BufReader;

    let cert_file = File::open(&tls.certificate)?;
    let certs = rustls_pemfile::certs(&mut BufReader::new(cert_file))
        .map_err(|_| anyhow::anyhow!("invalid certificate at {}", tls.certificate.display()))?;
    let certs = certs.into_iter().map(rustls::Certificate).collect();

    let key_file = File::open(&tls.private_key)?;
    let mut keys = rustls_pemfile::pkcs8_private_keys(&mut BufReader::new(key_file))
        .map_err(|_| anyhow::anyhow!("invalid pkcs8 private key at {}", tls.private_key.display()))?;
    if keys.is_empty() {
        anyhow::bail!("no pkcs8 private key found in {}", tls.private_key.display());
    }

    let config = rustls::ServerConfig::builder()
        .with_safe_defaults()
        .with_no_client_auth()
        .with_single_cert(certs, rustls::PrivateKey(keys.remove(0)))?;

    Ok(config)
}
