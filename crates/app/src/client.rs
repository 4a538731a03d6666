//! Client assembly.

use std::sync::Arc;

use tessera_application::ports::{
    Clock, CookieStore, CredentialService, CurrentUserCache, HttpClient, Navigator,
    ProvisioningService, SessionStorage,
};
use tessera_application::{
    ConsistencyWatcher, EmployeeOnboarding, PendingAuthStore, RenewalScheduler, RequestPipeline,
    SessionConfig, SessionStore, TaskHandle, TokenPersistence,
};
use tessera_domain::LogoutReason;
use tessera_infrastructure::{
    AppConfig, ChannelNavigator, FileCookieStore, HttpCredentialService, HttpProvisioningService,
    InMemoryUserCache, MemoryCookieStore, MemorySessionStorage, ReqwestHttpClient, SystemClock,
};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::AppError;

/// External collaborators of the session core.
pub struct Ports {
    /// Authentication API.
    pub credentials: Arc<dyn CredentialService>,
    /// Transport for application requests.
    pub http: Arc<dyn HttpClient>,
    /// Durable token storage.
    pub cookies: Arc<dyn CookieStore>,
    /// Storage for the in-progress login.
    pub storage: Arc<dyn SessionStorage>,
    /// Where forced logouts are sent.
    pub navigator: Arc<dyn Navigator>,
    /// Time source.
    pub clock: Arc<dyn Clock>,
}

/// Handles of the background tasks; dropping it stops them all.
#[derive(Debug)]
pub struct Background {
    tasks: Vec<TaskHandle>,
}

impl Background {
    /// Names of the running tasks.
    #[must_use]
    pub fn task_names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(TaskHandle::name).collect()
    }
}

/// The assembled client.
pub struct Tessera {
    session: SessionStore,
    pipeline: RequestPipeline,
    watcher: ConsistencyWatcher,
    user_cache: Arc<InMemoryUserCache>,
    onboarding: EmployeeOnboarding,
}

impl Tessera {
    /// Build the client from configuration with the production adapters.
    ///
    /// Returns the client and the receiver of forced-logout redirects.
    ///
    /// # Errors
    ///
    /// Returns [`AppError`] if the configuration is invalid or the HTTP
    /// client cannot be built.
    pub fn from_config(
        config: &AppConfig,
    ) -> Result<(Self, mpsc::UnboundedReceiver<LogoutReason>), AppError> {
        let session_config = config.session_config()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let http = ReqwestHttpClient::new(config.request_timeout())?;
        let credentials = HttpCredentialService::new(http.client().clone(), &config.api_base_url);

        let cookies: Arc<dyn CookieStore> = match config.cookie_path() {
            Some(path) => {
                info!(path = %path.display(), "persisting cookies to file");
                Arc::new(FileCookieStore::new(path, clock.clone()))
            }
            None => {
                info!("keeping cookies in memory");
                Arc::new(MemoryCookieStore::new(clock.clone()))
            }
        };
        let (navigator, redirects) = ChannelNavigator::new();

        let ports = Ports {
            credentials: Arc::new(credentials),
            http: Arc::new(http),
            cookies,
            storage: Arc::new(MemorySessionStorage::new()),
            navigator: Arc::new(navigator),
            clock,
        };
        Ok((Self::assemble(ports, &config.api_base_url, session_config), redirects))
    }

    /// Build the client from explicit ports.
    #[must_use]
    pub fn assemble(ports: Ports, api_base_url: &str, config: SessionConfig) -> Self {
        let persistence = TokenPersistence::new(ports.cookies, ports.clock.clone(), &config);
        let user_cache = Arc::new(InMemoryUserCache::new());
        let cache: Arc<dyn CurrentUserCache> = user_cache.clone();
        let watcher = ConsistencyWatcher::new(persistence.clone(), cache, &config);

        let session = SessionStore::new(
            ports.credentials,
            persistence,
            PendingAuthStore::new(ports.storage),
            ports.navigator,
            ports.clock,
            config.clone(),
        );
        let pipeline = RequestPipeline::authenticated(ports.http, session.clone());
        let provisioning: Arc<dyn ProvisioningService> =
            Arc::new(HttpProvisioningService::new(pipeline.clone(), api_base_url));

        Self {
            onboarding: EmployeeOnboarding::new(provisioning, &config),
            session,
            pipeline,
            watcher,
            user_cache,
        }
    }

    /// The session store.
    #[must_use]
    pub const fn session(&self) -> &SessionStore {
        &self.session
    }

    /// The authenticated request pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &RequestPipeline {
        &self.pipeline
    }

    /// The consistency watcher.
    #[must_use]
    pub const fn watcher(&self) -> &ConsistencyWatcher {
        &self.watcher
    }

    /// The onboarding use case.
    #[must_use]
    pub const fn onboarding(&self) -> &EmployeeOnboarding {
        &self.onboarding
    }

    /// Start renewal, the watcher and the user cache mirror.
    #[must_use]
    pub fn start(&self) -> Background {
        let mut tasks = vec![
            self.spawn_user_mirror(),
            RenewalScheduler::new(self.session.clone()).spawn(),
        ];
        tasks.extend(self.watcher.spawn());
        debug!(count = tasks.len(), "background tasks started");
        Background { tasks }
    }

    /// Keep the current-user cache in step with the session.
    fn spawn_user_mirror(&self) -> TaskHandle {
        let mut changes = self.session.subscribe();
        let cache = self.user_cache.clone();
        TaskHandle::spawn("user-cache-mirror", async move {
            loop {
                let user = changes.borrow_and_update().user().cloned();
                cache.set(user);
                if changes.changed().await.is_err() {
                    break;
                }
            }
        })
    }
}

impl std::fmt::Debug for Tessera {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tessera")
            .field("session", &self.session.snapshot().phase())
            .field("pipeline", &self.pipeline)
            .finish_non_exhaustive()
    }
}
