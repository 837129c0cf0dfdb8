// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! `portal-wallet` - command-line driver for the portal wallet client.
//!
//! The portal identity is taken from `PORTAL_TOKEN` / `PORTAL_USER_ID`.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use portal_wallet_client::auth::{
    AuthError, JwksCache, SessionState, SessionTokenManager, StaticPortalBridge,
};
use portal_wallet_client::client::{BackendClient, WalletPager};
use portal_wallet_client::config::{Config, LogFormat};
use portal_wallet_client::models::{PageDirection, QueryParams};
use portal_wallet_client::providers::PartnerClient;
use portal_wallet_client::signing::{CanonicalRequest, Nonce, RequestSigner};
use portal_wallet_client::storage::{FileTokenStore, StoragePaths};

#[derive(Parser)]
#[command(name = "portal-wallet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Exchange the portal token for a backend session
    Login,

    /// Restore the persisted session for the portal identity
    Restore,

    /// Refresh the access token of the persisted session
    Refresh,

    /// List wallets
    Wallets {
        /// Wallet type tab (omit for all)
        #[arg(long)]
        wallet_type: Option<String>,

        /// Cursor of the page after which to list
        #[arg(long, conflicts_with = "before")]
        after: Option<String>,

        /// Cursor of the page before which to list
        #[arg(long)]
        before: Option<String>,
    },

    /// Show (or create) the deposit address of a wallet token
    DepositAddress { wallet_id: String, token_id: String },

    /// Sign a partner API request and print the signature headers
    Sign {
        method: String,
        path: String,

        /// Query parameters as `key=value`, in order
        params: Vec<String>,

        /// JSON request body
        #[arg(long)]
        body: Option<String>,

        /// Fixed nonce (defaults to the current time in milliseconds)
        #[arg(long)]
        nonce: Option<String>,
    },

    /// Fetch an org access token from the partner API
    PartnerToken {
        /// Org id (defaults to the portal token's org)
        #[arg(long)]
        org_id: Option<String>,
    },

    /// Verify the portal token against the partner JWKS and show the user
    Whoami,
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn session_manager(config: &Config) -> Result<SessionTokenManager> {
    let bridge = StaticPortalBridge::new(config.portal_token.clone(), config.portal_user_id.clone());
    let store = FileTokenStore::new(&StoragePaths::new(&config.data_dir));
    let backend = BackendClient::new(&config.backend_base_url, config.http_timeout)?;
    Ok(SessionTokenManager::new(
        Arc::new(bridge),
        Arc::new(store),
        backend,
    ))
}

/// Log the error code and flag failures that need a fresh login.
fn auth_failure(err: AuthError) -> anyhow::Error {
    error!(code = err.error_code(), "{err}");
    if err.requires_login() {
        anyhow!("{err} (login required)")
    } else {
        err.into()
    }
}

/// Restore the session, logging in when nothing is persisted.
async fn ensure_session(manager: &SessionTokenManager) -> Result<()> {
    let state = manager.restore_session().await.map_err(auth_failure)?;
    if state == SessionState::LoggedOut {
        info!("no persisted session, logging in");
        manager.login().await.map_err(auth_failure)?;
    }
    Ok(())
}

fn parse_params(raw: &[String]) -> Result<QueryParams> {
    raw.iter()
        .map(|pair| {
            pair.split_once('=')
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .with_context(|| format!("expected key=value, got `{pair}`"))
        })
        .collect()
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    match cli.command {
        Commands::Login => {
            let manager = session_manager(&config)?;
            manager.login().await.map_err(auth_failure)?;
            if let Some(identity) = manager.identity() {
                println!("logged in as {} (org {})", identity.user_id, identity.org_id);
            }
        }
        Commands::Restore => {
            let manager = session_manager(&config)?;
            let state = manager.restore_session().await.map_err(auth_failure)?;
            println!("{state:?}");
        }
        Commands::Refresh => {
            let manager = session_manager(&config)?;
            let state = manager.restore_session().await.map_err(auth_failure)?;
            if state == SessionState::LoggedOut {
                bail!("no persisted session to refresh; run `login` first");
            }
            let refreshed = manager.refresh().await.map_err(auth_failure)?;
            println!("refreshed: {refreshed}");
        }
        Commands::Wallets {
            wallet_type,
            after,
            before,
        } => {
            let manager = session_manager(&config)?;
            ensure_session(&manager).await?;

            let cursor = after
                .map(|c| (c, PageDirection::After))
                .or_else(|| before.map(|c| (c, PageDirection::Before)));
            let pager = WalletPager::new(wallet_type);
            pager.load(&manager.api(), cursor).await?;
            print_json(&pager.current())?;
        }
        Commands::DepositAddress {
            wallet_id,
            token_id,
        } => {
            let manager = session_manager(&config)?;
            ensure_session(&manager).await?;
            let address = manager.api().deposit_address(&wallet_id, &token_id).await?;
            println!("{address}");
        }
        Commands::Sign {
            method,
            path,
            params,
            body,
            nonce,
        } => {
            let signer = RequestSigner::from_hex(config.require_app_secret()?)?;
            let nonce = nonce.map(Nonce::from).unwrap_or_else(Nonce::now);
            let mut request = CanonicalRequest::new(method.to_ascii_uppercase(), path, nonce)
                .params(parse_params(&params)?);
            if let Some(body) = body {
                let body: serde_json::Value =
                    serde_json::from_str(&body).context("--body must be valid JSON")?;
                request = request.json_body(&body)?;
            }

            print_json(&serde_json::json!({
                "canonical": request.canonical_string(),
                "digest": request.digest_hex(),
                "public_key": signer.public_key_hex(),
                "nonce": request.nonce().as_str(),
                "signature": signer.sign(&request),
            }))?;
        }
        Commands::PartnerToken { org_id } => {
            let partner = PartnerClient::from_config(&config)?;
            let org_id = match org_id {
                Some(org_id) => org_id,
                None => {
                    session_manager(&config)?
                        .resolve_identity()
                        .await
                        .map_err(auth_failure)?
                        .org_id
                }
            };
            print_json(&partner.access_token(&org_id).await?)?;
        }
        Commands::Whoami => {
            let token = config
                .portal_token
                .clone()
                .context("PORTAL_TOKEN is not set")?;
            let jwks = JwksCache::new(PartnerClient::from_config(&config)?);
            let user = jwks
                .verify_portal_token(&token, config.portal_user_id.clone())
                .await
                .map_err(auth_failure)?;
            print_json(&user)?;
        }
    }

    Ok(())
}
