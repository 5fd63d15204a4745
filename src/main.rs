use std::env;
use std::sync::Arc;

use anyhow::{Context, bail};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use zeroize::Zeroizing;

use xl_auth::{Credentials, FileIdentityCache, Launcher, LauncherConfig, LoginRequest, LoginState};
use xl_game::{LaunchOptions, LauncherSettings, SystemTicks, build_launch_plan};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,xl_auth=debug,xl_game=debug")),
        )
        .init();

    let settings_path = LauncherSettings::default_path()?;
    let settings = LauncherSettings::load(&settings_path)
        .await
        .with_context(|| format!("loading settings from {}", settings_path.display()))?;

    if settings.game_path.as_os_str().is_empty() {
        bail!("game_path is not set in {}", settings_path.display());
    }

    let user_name = env::var("XL_USER").context("XL_USER is not set")?;
    let password = Zeroizing::new(env::var("XL_PASSWORD").context("XL_PASSWORD is not set")?);
    let otp = env::var("XL_OTP").unwrap_or_default();

    let mut config = LauncherConfig::retail()?;
    config.client_language = settings.language;

    let cache = Arc::new(FileIdentityCache::open(FileIdentityCache::default_path()?).await);
    let launcher = Launcher::from_config(config, cache)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, cancelling login");
            on_interrupt.cancel();
        }
    });

    let request = LoginRequest {
        credentials: Credentials::new(user_name, password.as_str(), otp),
        is_steam_service_account: settings.steam_service_account,
        use_cache: settings.use_uid_cache,
        game_path: settings.game_path.clone(),
        force_base_version: settings.force_base_version,
    };

    let outcome = launcher.login(&request, &cancel).await?;
    info!("Login finished with state {:?}", outcome.state);

    match outcome.state {
        LoginState::Ok => {}
        LoginState::NeedsPatchGame => {
            for patch in outcome.pending_patches.iter().flatten() {
                println!("pending patch {} ({} bytes) {}", patch.version_id, patch.length, patch.url);
            }
            return Ok(());
        }
        LoginState::NeedsPatchBoot => {
            println!("The boot components are out of date and must be patched first");
            return Ok(());
        }
        LoginState::NoService => {
            println!("This account has no active subscription");
            return Ok(());
        }
        LoginState::NoTerms => {
            println!("The terms of service have not been accepted for this account");
            return Ok(());
        }
        state => bail!("unexpected login state {:?}", state),
    }

    let unique_id = outcome
        .unique_id
        .context("login succeeded without a unique id")?;

    let options = LaunchOptions {
        session_id: unique_id,
        region: outcome.oauth.region,
        expansion_level: outcome.oauth.max_expansion,
        is_steam_service_account: settings.steam_service_account,
        additional_arguments: settings.additional_arguments.clone(),
        language: settings.language,
        dx11: settings.dx11,
        encrypt_arguments: settings.encrypt_arguments,
    };

    let plan = build_launch_plan(&settings.game_path, &options, &SystemTicks).await?;

    println!("executable:  {}", plan.executable.display());
    println!("working dir: {}", plan.working_dir.display());
    for (key, value) in &plan.environment {
        println!("env:         {}={}", key, value);
    }
    println!("arguments:   {}", plan.arguments);

    Ok(())
}
