// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod auth;
pub mod codec;
pub mod device;
pub mod kms;
pub mod scheduler;
pub mod sync;
pub mod zepp;

pub use auth::AuthService;
pub use kms::KmsService;
pub use scheduler::SyncScheduler;
pub use sync::{new_sync_locks, SyncLocks, SyncReport, SyncService};
pub use zepp::{BandQuery, ZeppApi, ZeppClient, ZeppSession};
