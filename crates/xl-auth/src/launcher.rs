use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::config::LauncherConfig;
use crate::errors::{Result, XlAuthError};
use crate::models::{Identity, LoginOutcome, LoginState};
use crate::oauth::{Credentials, OauthTransport, WebOauthClient};
use crate::registrar::{PatchServerClient, SessionRegistrar};
use crate::store::IdentityCache;

/// Parameters for one login attempt
#[derive(Debug, Clone)]
pub struct LoginRequest {
    pub credentials: Credentials,
    pub is_steam_service_account: bool,
    pub use_cache: bool,
    pub game_path: PathBuf,
    pub force_base_version: bool,
}

/// Composes OAuth login, session registration and the identity cache into a
/// single classified login.
#[derive(Clone)]
pub struct Launcher {
    oauth: Arc<dyn OauthTransport>,
    registrar: Arc<dyn SessionRegistrar>,
    cache: Arc<dyn IdentityCache>,
    oauth_region: i32,
}

impl Launcher {
    pub fn new(
        oauth: Arc<dyn OauthTransport>,
        registrar: Arc<dyn SessionRegistrar>,
        cache: Arc<dyn IdentityCache>,
        oauth_region: i32,
    ) -> Self {
        Self {
            oauth,
            registrar,
            cache,
            oauth_region,
        }
    }

    /// Launcher backed by the web login pages and the patch servers in `config`
    pub fn from_config(config: LauncherConfig, cache: Arc<dyn IdentityCache>) -> Result<Self> {
        let oauth_region = config.oauth_region;
        let oauth = Arc::new(WebOauthClient::new(config.clone())?);
        let registrar = Arc::new(PatchServerClient::new(config)?);
        Ok(Self::new(oauth, registrar, cache, oauth_region))
    }

    /// Logs in and classifies the result.
    ///
    /// With caching enabled, a valid cached identity skips both network calls
    /// and is reported as [`LoginState::Ok`]; a cached registration is trusted
    /// for the whole cache lifetime. Every unique id the registrar issues is
    /// cached, including one issued with pending game patches; a failed cache
    /// write is logged and the outcome is still returned. Each network step
    /// races `cancel`.
    #[instrument(
        skip(self, request, cancel),
        fields(steam = request.is_steam_service_account, cache = request.use_cache)
    )]
    pub async fn login(
        &self,
        request: &LoginRequest,
        cancel: &CancellationToken,
    ) -> Result<LoginOutcome> {
        let user_key = request.credentials.user_name.as_str();

        if request.use_cache
            && let Some(cached) = self.cache.get(user_key).await
        {
            info!("Cached unique id found, skipping login");
            return Ok(LoginOutcome {
                state: LoginState::Ok,
                pending_patches: None,
                oauth: cached.to_oauth_result(),
                unique_id: Some(cached.session_unique_id),
            });
        }

        info!("Cache is invalid or disabled, logging in normally");

        let oauth = cancellable(
            cancel,
            self.oauth.login(
                &request.credentials,
                request.is_steam_service_account,
                self.oauth_region,
            ),
        )
        .await?;

        info!(
            "OAuth login successful - playable:{} terms:{} region:{} expack:{}",
            oauth.playable, oauth.terms_accepted, oauth.region, oauth.max_expansion
        );

        if !oauth.playable {
            return Ok(LoginOutcome {
                state: LoginState::NoService,
                pending_patches: None,
                oauth,
                unique_id: None,
            });
        }

        if !oauth.terms_accepted {
            return Ok(LoginOutcome {
                state: LoginState::NoTerms,
                pending_patches: None,
                oauth,
                unique_id: None,
            });
        }

        let registration = cancellable(
            cancel,
            self.registrar
                .register(&oauth, &request.game_path, request.force_base_version),
        )
        .await?;

        if request.use_cache
            && let Some(uid) = &registration.unique_id
        {
            let identity = Identity::new(user_key, uid.as_str(), oauth.region, oauth.max_expansion);
            if let Err(e) = self.cache.put(identity).await {
                warn!("Failed to cache unique id: {}", e);
            }
        }

        Ok(LoginOutcome {
            state: registration.state,
            pending_patches: registration.pending_patches,
            oauth,
            unique_id: registration.unique_id,
        })
    }
}

async fn cancellable<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(XlAuthError::Cancelled),
        result = operation => result,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OauthResult, Registration};
    use crate::patch_list::PatchListEntry;
    use crate::store::MemoryIdentityCache;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeOauth {
        result: OauthResult,
        calls: AtomicUsize,
    }

    impl FakeOauth {
        fn new(playable: bool, terms_accepted: bool) -> Arc<Self> {
            Arc::new(Self {
                result: OauthResult {
                    session_id: "sess".to_string(),
                    region: 3,
                    terms_accepted,
                    playable,
                    max_expansion: 4,
                },
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl OauthTransport for FakeOauth {
        async fn login(&self, _: &Credentials, _: bool, _: i32) -> Result<OauthResult> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.result.clone())
        }
    }

    struct FakeRegistrar {
        registration: Registration,
        calls: AtomicUsize,
    }

    impl FakeRegistrar {
        fn new(state: LoginState, uid: Option<&str>) -> Arc<Self> {
            let pending_patches = (state == LoginState::NeedsPatchGame).then(|| {
                vec![PatchListEntry {
                    version_id: "2024.06.01.0000.0000".to_string(),
                    length: 1,
                    hash_type: None,
                    hash_block_size: None,
                    hashes: vec![],
                    url: "http://patch/x.patch".to_string(),
                }]
            });
            Arc::new(Self {
                registration: Registration {
                    unique_id: uid.map(str::to_string),
                    state,
                    pending_patches,
                },
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait::async_trait]
    impl SessionRegistrar for FakeRegistrar {
        async fn register(&self, _: &OauthResult, _: &Path, _: bool) -> Result<Registration> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.registration.clone())
        }
    }

    /// Never completes; only cancellation can end it
    struct HangingOauth;

    #[async_trait::async_trait]
    impl OauthTransport for HangingOauth {
        async fn login(&self, _: &Credentials, _: bool, _: i32) -> Result<OauthResult> {
            std::future::pending().await
        }
    }

    /// Rejects every write
    struct ReadOnlyCache;

    #[async_trait::async_trait]
    impl IdentityCache for ReadOnlyCache {
        async fn has(&self, _: &str) -> bool {
            false
        }

        async fn get(&self, _: &str) -> Option<Identity> {
            None
        }

        async fn put(&self, _: Identity) -> Result<()> {
            Err(XlAuthError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "read-only cache",
            )))
        }

        async fn reset(&self) -> Result<()> {
            Ok(())
        }
    }

    fn request(use_cache: bool) -> LoginRequest {
        LoginRequest {
            credentials: Credentials::new("alice", "pw", ""),
            is_steam_service_account: false,
            use_cache,
            game_path: PathBuf::from("/games/xiv"),
            force_base_version: false,
        }
    }

    #[tokio::test]
    async fn test_cached_identity_skips_network() {
        let oauth = FakeOauth::new(true, true);
        let registrar = FakeRegistrar::new(LoginState::Ok, Some("fresh"));
        let cache = Arc::new(MemoryIdentityCache::new());
        cache.put(Identity::new("alice", "cached-uid", 2, 5)).await.unwrap();

        let launcher = Launcher::new(oauth.clone(), registrar.clone(), cache, 3);
        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::Ok);
        assert_eq!(outcome.unique_id.as_deref(), Some("cached-uid"));
        assert!(outcome.oauth.playable && outcome.oauth.terms_accepted);
        assert_eq!(outcome.oauth.region, 2);
        assert_eq!(outcome.oauth.max_expansion, 5);
        assert_eq!(oauth.calls.load(Ordering::SeqCst), 0);
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cache_disabled_ignores_cached_identity() {
        let oauth = FakeOauth::new(true, true);
        let registrar = FakeRegistrar::new(LoginState::Ok, Some("fresh"));
        let cache = Arc::new(MemoryIdentityCache::new());
        cache.put(Identity::new("alice", "cached-uid", 2, 5)).await.unwrap();

        let launcher = Launcher::new(oauth.clone(), registrar.clone(), cache, 3);
        let outcome = launcher
            .login(&request(false), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.unique_id.as_deref(), Some("fresh"));
        assert_eq!(oauth.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_not_playable_is_no_service() {
        let oauth = FakeOauth::new(false, true);
        let registrar = FakeRegistrar::new(LoginState::Ok, Some("uid"));
        let launcher = Launcher::new(
            oauth,
            registrar.clone(),
            Arc::new(MemoryIdentityCache::new()),
            3,
        );

        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::NoService);
        assert_eq!(outcome.unique_id, None);
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_terms_not_accepted() {
        let oauth = FakeOauth::new(true, false);
        let registrar = FakeRegistrar::new(LoginState::Ok, Some("uid"));
        let launcher = Launcher::new(
            oauth,
            registrar.clone(),
            Arc::new(MemoryIdentityCache::new()),
            3,
        );

        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::NoTerms);
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_successful_login_is_cached() {
        let cache = Arc::new(MemoryIdentityCache::new());
        let launcher = Launcher::new(
            FakeOauth::new(true, true),
            FakeRegistrar::new(LoginState::Ok, Some("uid-1")),
            cache.clone(),
            3,
        );

        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::Ok);
        let cached = cache.get("alice").await.unwrap();
        assert_eq!(cached.session_unique_id, "uid-1");
        assert_eq!(cached.max_expansion, 4);
    }

    #[tokio::test]
    async fn test_pending_game_patches_are_cached() {
        let cache = Arc::new(MemoryIdentityCache::new());
        let launcher = Launcher::new(
            FakeOauth::new(true, true),
            FakeRegistrar::new(LoginState::NeedsPatchGame, Some("uid-1")),
            cache.clone(),
            3,
        );

        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::NeedsPatchGame);
        assert_eq!(outcome.pending_patches.map(|p| p.len()), Some(1));
        assert_eq!(outcome.unique_id.as_deref(), Some("uid-1"));
        assert_eq!(cache.get("alice").await.unwrap().session_unique_id, "uid-1");
    }

    #[tokio::test]
    async fn test_boot_patch_outcome_is_not_cached() {
        let cache = Arc::new(MemoryIdentityCache::new());
        let launcher = Launcher::new(
            FakeOauth::new(true, true),
            FakeRegistrar::new(LoginState::NeedsPatchBoot, None),
            cache.clone(),
            3,
        );

        launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert!(!cache.has("alice").await);
    }

    #[tokio::test]
    async fn test_cache_write_failure_keeps_outcome() {
        let launcher = Launcher::new(
            FakeOauth::new(true, true),
            FakeRegistrar::new(LoginState::Ok, Some("uid-1")),
            Arc::new(ReadOnlyCache),
            3,
        );

        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::Ok);
        assert_eq!(outcome.unique_id.as_deref(), Some("uid-1"));
    }

    #[tokio::test]
    async fn test_boot_patch_outcome() {
        let launcher = Launcher::new(
            FakeOauth::new(true, true),
            FakeRegistrar::new(LoginState::NeedsPatchBoot, None),
            Arc::new(MemoryIdentityCache::new()),
            3,
        );

        let outcome = launcher
            .login(&request(true), &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(outcome.state, LoginState::NeedsPatchBoot);
        assert_eq!(outcome.unique_id, None);
        assert_eq!(outcome.pending_patches, None);
    }

    #[tokio::test]
    async fn test_cancellation_is_retryable() {
        let registrar = FakeRegistrar::new(LoginState::Ok, Some("uid"));
        let launcher = Launcher::new(
            Arc::new(HangingOauth),
            registrar.clone(),
            Arc::new(MemoryIdentityCache::new()),
            3,
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let result = launcher.login(&request(false), &cancel).await;

        match result {
            Err(e @ XlAuthError::Cancelled) => assert!(e.is_retryable()),
            other => panic!("expected Cancelled, got {:?}", other),
        }
        assert_eq!(registrar.calls.load(Ordering::SeqCst), 0);
    }
}
