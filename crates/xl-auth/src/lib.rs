//! Login flow for the FINAL FANTASY XIV launcher
//!
//! This crate turns account credentials into a classified login outcome that
//! either allows the game to start or says why it cannot.
//!
//! # Login Flow
//!
//! 1. Consult the identity cache for a unique id issued within the last day
//! 2. OAuth login against the web login pages (stored token scrape, then POST)
//! 3. Check the account is playable and has accepted the terms
//! 4. Register the session with the game version service, which issues the
//!    unique id or reports pending boot or game patches
//! 5. Cache the unique id when registration succeeded
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use xl_auth::{Credentials, FileIdentityCache, Launcher, LauncherConfig, LoginRequest};
//!
//! # async fn example() -> xl_auth::Result<()> {
//! let cache = Arc::new(FileIdentityCache::open(FileIdentityCache::default_path()?).await);
//! let launcher = Launcher::from_config(LauncherConfig::retail()?, cache)?;
//!
//! let request = LoginRequest {
//!     credentials: Credentials::new("user", "password", ""),
//!     is_steam_service_account: false,
//!     use_cache: true,
//!     game_path: "C:/Games/FINAL FANTASY XIV - A Realm Reborn".into(),
//!     force_base_version: false,
//! };
//!
//! let outcome = launcher.login(&request, &CancellationToken::new()).await?;
//! println!("Login state: {:?}", outcome.state);
//! # Ok(())
//! # }
//! ```
//!
//! # Identity Cache
//!
//! [`IdentityCache`] has an in-memory implementation for tests and a JSON file
//! implementation, [`FileIdentityCache`], for use across launcher runs.

pub mod config;
pub mod errors;
pub mod file_store;
pub mod fingerprint;
pub mod frontier;
mod http;
pub mod launcher;
pub mod models;
pub mod oauth;
pub mod patch_list;
pub mod registrar;
pub mod store;

// Re-export main types
pub use config::{ClientPlatform, Endpoints, HttpTimeouts, LauncherConfig};
pub use errors::{Result, XlAuthError};
pub use file_store::FileIdentityCache;
pub use fingerprint::MachineFingerprint;
pub use frontier::FrontierClient;
pub use launcher::{Launcher, LoginRequest};
pub use models::{Identity, LoginOutcome, LoginState, OauthResult, Registration};
pub use oauth::{Credentials, OauthTransport, WebOauthClient};
pub use patch_list::PatchListEntry;
pub use registrar::{PatchServerClient, SessionRegistrar};
pub use store::{IdentityCache, MemoryIdentityCache};
