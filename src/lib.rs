// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Portal Wallet Client - auth core of a portal-embedded custodial wallet
//! dashboard.
//!
//! The dashboard runs inside a host portal. This crate resolves the portal
//! identity, keeps the backend session token pair, dispatches calls to the
//! wallet backend REST API, and signs calls to the partner API.
//!
//! ## Modules
//!
//! - `auth` - Portal bridge, session token manager, portal JWT verification
//! - `client` - Wallet backend HTTP facade and endpoint wrappers
//! - `config` - Environment configuration
//! - `models` - Request/response shapes
//! - `providers` - Partner API client
//! - `signing` - Canonical request signer (Ed25519 over double SHA-256)
//! - `storage` - Persisted session tokens

pub mod auth;
pub mod client;
pub mod config;
pub mod models;
pub mod providers;
pub mod signing;
pub mod storage;
