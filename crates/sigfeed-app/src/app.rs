//! Application wiring and main loop.

use crate::config::AppConfig;
use crate::error::AppResult;
use sigfeed_cache::{EnrichmentCache, LanguageSync, TranslationCache};
use sigfeed_client::ApiClient;
use sigfeed_core::{DynEnrichmentSource, DynSignalSource, DynTranslator, Language};
use sigfeed_dashboard::{run_server, DashboardState};
use sigfeed_inbox::NotificationInbox;
use sigfeed_sync::{ChangeStore, Clock, ExpiryClock, RefreshCoordinator, RefreshHandle, SystemClock};
use sigfeed_ws::{PushBus, PushChannel, PushConnection, Subscription};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// REST collaborators the core consumes.
#[derive(Clone)]
pub struct Sources {
    pub signals: DynSignalSource,
    pub enrichment: DynEnrichmentSource,
    pub translator: DynTranslator,
}

impl Sources {
    /// Use one API client for all three ports.
    pub fn from_client(client: ApiClient) -> Self {
        let client = Arc::new(client);
        Self {
            signals: client.clone(),
            enrichment: client.clone(),
            translator: client,
        }
    }
}

/// Every long-lived component, wired together.
pub struct Components {
    pub store: ChangeStore,
    pub refresh: RefreshHandle,
    pub enrichment: EnrichmentCache,
    pub translations: TranslationCache,
    pub inbox: Arc<NotificationInbox>,
    pub language: Arc<watch::Sender<Language>>,
    pub expiry: Arc<ExpiryClock>,
    pub dashboard: DashboardState,
    shutdown: CancellationToken,
    subscriptions: Vec<Subscription>,
    tasks: Vec<JoinHandle<()>>,
}

impl Components {
    /// Build and start the components.
    ///
    /// Tasks stop when `shutdown` (or `Components::shutdown`) fires. Push
    /// subscriptions live as long as the returned value.
    pub fn wire(
        sources: Sources,
        config: &AppConfig,
        push: &dyn PushChannel,
        clock: Arc<dyn Clock>,
        shutdown: &CancellationToken,
    ) -> Self {
        let shutdown = shutdown.child_token();
        let mut tasks = Vec::new();

        let store = ChangeStore::new(clock.clone());
        let (refresh, coordinator) = RefreshCoordinator::spawn(
            sources.signals,
            store.subscribe(),
            &config.sync,
            shutdown.clone(),
        );
        tasks.push(coordinator);

        let enrichment =
            EnrichmentCache::new(sources.enrichment, config.cache.enrichment_timeout());
        let translations =
            TranslationCache::new(sources.translator, config.cache.translation_timeout());

        let (language_tx, language_rx) = watch::channel(config.language.display.clone());
        let language = Arc::new(language_tx);
        tasks.push(
            LanguageSync::new(
                enrichment.clone(),
                translations.clone(),
                language_rx,
                shutdown.clone(),
            )
            .spawn(),
        );

        let inbox = Arc::new(NotificationInbox::new());
        let subscriptions = vec![refresh.attach_push(push), inbox.attach(push)];

        let expiry = Arc::new(ExpiryClock::new(clock, config.sync.expiry_tick()));
        tasks.push(expiry.clone().spawn(shutdown.clone()));

        let dashboard = DashboardState::new(
            refresh.clone(),
            enrichment.clone(),
            translations.clone(),
            inbox.clone(),
            language.clone(),
            expiry.subscribe(),
        );

        info!(
            language = %config.language.display,
            debounce_ms = config.sync.debounce_ms,
            "Components wired"
        );

        Self {
            store,
            refresh,
            enrichment,
            translations,
            inbox,
            language,
            expiry,
            dashboard,
            shutdown,
            subscriptions,
            tasks,
        }
    }

    /// Stop feeding from push, close the caches and join every task.
    ///
    /// Late collaborator responses are dropped once the caches are closed.
    pub async fn shutdown(self) {
        drop(self.subscriptions);
        self.enrichment.close();
        self.translations.close();
        self.refresh.shutdown();
        self.shutdown.cancel();

        for task in self.tasks {
            if let Err(e) = task.await {
                warn!(error = %e, "Component task ended abnormally");
            }
        }
        debug!("Components stopped");
    }
}

/// Main application.
pub struct Application {
    config: AppConfig,
    sources: Sources,
}

impl Application {
    pub fn new(config: AppConfig) -> AppResult<Self> {
        let client = ApiClient::new(config.api.client_config())?;
        Ok(Self {
            config,
            sources: Sources::from_client(client),
        })
    }

    /// Run until Ctrl-C.
    pub async fn run(self) -> AppResult<()> {
        info!(base_url = %self.config.api.base_url, "Starting application");

        let shutdown = CancellationToken::new();
        let bus = PushBus::new();
        let components = Components::wire(
            self.sources,
            &self.config,
            &bus,
            Arc::new(SystemClock),
            &shutdown,
        );

        let push = if self.config.push.enabled {
            let connection = Arc::new(PushConnection::new(
                self.config
                    .push
                    .connection_config(self.config.api.auth_token()),
                bus.clone(),
            ));
            let runner = connection.clone();
            let handle = tokio::spawn(async move {
                if let Err(e) = runner.run().await {
                    error!(error = %e, "Push connection failed");
                }
            });
            Some((connection, handle))
        } else {
            info!("Push channel disabled, list refreshes only on local changes");
            None
        };

        let server = if self.config.dashboard.enabled {
            let state = components.dashboard.clone();
            let config = self.config.dashboard.clone();
            let token = shutdown.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = run_server(state, config, token).await {
                    error!(error = %e, "Dashboard server failed");
                }
            }))
        } else {
            None
        };

        tokio::signal::ctrl_c().await?;
        info!("Shutdown signal received");

        shutdown.cancel();
        if let Some((connection, handle)) = push {
            connection.shutdown();
            if let Err(e) = handle.await {
                warn!(error = %e, "Push task ended abnormally");
            }
        }
        components.shutdown().await;
        if let Some(handle) = server {
            if let Err(e) = handle.await {
                warn!(error = %e, "Dashboard task ended abnormally");
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}
