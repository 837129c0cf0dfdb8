// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! External provider integrations.

pub mod partner;

pub use partner::{MfaMethod, PartnerAccessToken, PartnerClient, PartnerError};
