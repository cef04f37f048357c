use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_port::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::server::RefreshPurger;
use crate::settings::Settings;
use crate::transport::{TransportAdapter, TransportConfig};
use anyhow::anyhow;
use sqlx::{MySql, Pool};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const DEV_SIGNING_KEY: &str = "tallyguard-dev-secret-key";

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pub guard: Arc<RequestGuard>,
    pub transport: Arc<TransportAdapter>,
    purge_handle: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        Self::with_clock(settings, Arc::new(SystemClock)).await
    }

    pub async fn with_clock(settings: &Settings, clock: Arc<dyn Clock>) -> anyhow::Result<Self> {
        let needs_mysql =
            settings.store.backend == "mysql" || settings.auth.identity_backend == "real";
        let pool = if needs_mysql {
            let dsn = settings
                .store
                .mysql_dsn
                .as_deref()
                .ok_or_else(|| anyhow!("store.mysql_dsn is required"))?;
            Some(Pool::<MySql>::connect(dsn).await?)
        } else {
            None
        };
        let mysql_pool = || pool.clone().ok_or_else(|| anyhow!("mysql pool not configured"));

        let key = match std::env::var("JWT_SIGNING_KEY") {
            Ok(key) if !key.is_empty() => key.into_bytes(),
            _ => {
                warn!("JWT_SIGNING_KEY not set, using the development key");
                DEV_SIGNING_KEY.as_bytes().to_vec()
            }
        };
        let token_codec: Arc<dyn TokenCodec> = Arc::new(JwtHs256Codec::new(
            JwtConfig {
                issuer: settings.auth.issuer.clone(),
                audience: settings.auth.audience.clone(),
                signing_key: key,
            },
            clock.clone(),
        ));

        let refresh_repo: Arc<dyn RefreshTokenRepo> = match settings.store.backend.as_str() {
            "memory" => Arc::new(MemoryRefreshTokenRepo::new()),
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_deref()
                    .ok_or_else(|| anyhow!("store.redis_dsn is required"))?;
                let redis_client = redis::Client::open(dsn)?;
                let redis_manager = redis_client.get_connection_manager().await?;
                Arc::new(RedisRefreshTokenRepo::new(
                    redis_manager,
                    settings.store.key_prefix.clone(),
                ))
            }
            "mysql" => Arc::new(MySqlRefreshTokenRepo::new(mysql_pool()?)),
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let refresh_store = Arc::new(RefreshStore::new(
            refresh_repo,
            clock.clone(),
            settings.auth.store_timeout(),
        ));
        let session_issuer = Arc::new(SessionIssuer::new(
            token_codec.clone(),
            refresh_store.clone(),
            SessionTtl {
                access: settings.auth.access_ttl(),
                refresh: settings.auth.refresh_ttl(),
            },
        ));

        let transport = Arc::new(TransportAdapter::new(TransportConfig {
            secure_cookies: settings.transport.secure_cookies,
            cookie_max_age: settings.auth.refresh_ttl(),
        }));
        let guard = Arc::new(RequestGuard::new(
            token_codec,
            session_issuer.clone(),
            transport.clone(),
        ));

        let identity_provider: Arc<dyn IdentityProvider> =
            match settings.auth.identity_backend.as_str() {
                "fake" => Arc::new(FakeIdentityProvider::new()),
                "real" => {
                    let credential_repo: Arc<dyn CredentialRepo> =
                        Arc::new(MySqlCredentialRepo::new(mysql_pool()?));
                    Arc::new(PasswordIdentityProvider::new(
                        credential_repo,
                        Arc::new(Argon2PasswordHasher),
                    ))
                }
                other => return Err(anyhow!("Unknown identity backend: {}", other)),
            };

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            identity_provider,
            session_issuer,
            refresh_store.clone(),
        ));

        // region runtime infra
        let cancel = CancellationToken::new();

        let purger = RefreshPurger::new(
            refresh_store,
            Duration::from_secs(settings.store.purge_interval_secs.max(1)),
            cancel.clone(),
        );
        let purge_handle = tokio::spawn(async move {
            let _ = purger.run().await;
        });

        // endregion

        info!(
            store = %settings.store.backend,
            identity = %settings.auth.identity_backend,
            "server started"
        );

        Ok(Self {
            auth_service,
            guard,
            transport,
            purge_handle: Mutex::new(Some(purge_handle)),
            cancel,
            pool,
        })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");

        self.cancel.cancel();

        let handle = self.purge_handle.lock().ok().and_then(|mut lock| lock.take());
        if let Some(handle) = handle {
            let r = handle.await;
            info!("purge handle dropped: {:?}", r);
        }

        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}
