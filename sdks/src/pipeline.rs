// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

// Response Classification
//
// Decides what the client does with a response before anything else happens.
// Kept free of I/O so every rule can be checked against a plain status code.
//
//   2xx                                        -> Success
//   401 on login / register                    -> InvalidCredentials
//   400 on the renewal endpoint                -> TerminalSessionExpiry
//   401 elsewhere, not yet retried, not exempt -> TransientAuthExpiry
//   anything else                              -> PassThrough

use tollgate_core::AuthConfig;

use crate::request::ApiRequest;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Success,
    /// Recoverable by one renewal and one retry.
    TransientAuthExpiry,
    /// The renewal secret itself was rejected.
    TerminalSessionExpiry,
    /// The submitted login or registration secrets are wrong.
    InvalidCredentials,
    /// Hand the failure to the caller unchanged.
    PassThrough,
}

pub fn classify(request: &ApiRequest, status: u16, auth: &AuthConfig) -> Disposition {
    if (200..300).contains(&status) {
        return Disposition::Success;
    }

    let route = request.route();
    let is_refresh = same_route(route, &auth.refresh_path);
    let is_issuing = auth
        .credential_issuing_paths()
        .iter()
        .any(|path| same_route(route, path));

    match status {
        401 if is_issuing => Disposition::InvalidCredentials,
        400 if is_refresh => Disposition::TerminalSessionExpiry,
        401 if is_refresh || request.is_retry() || request.skips_auth_refresh() => {
            Disposition::PassThrough
        }
        401 => Disposition::TransientAuthExpiry,
        _ => Disposition::PassThrough,
    }
}

fn same_route(route: &str, configured: &str) -> bool {
    let configured = configured.split(['?', '#']).next().unwrap_or_default();
    let configured = if configured.len() > 1 {
        configured.trim_end_matches('/')
    } else {
        configured
    };
    route == configured
}
