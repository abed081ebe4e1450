// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Services module - business logic layer.

pub mod chat;
pub mod google_fit;
pub mod identity;
pub mod ml;
pub mod mock_data;
pub mod pipeline;

pub use chat::ChatService;
pub use google_fit::{GoogleFitClient, GoogleFitService, TokenCache};
pub use identity::IdentityClient;
pub use ml::{GeneratedPlan, MlClient};
pub use mock_data::MockMetricsGenerator;
pub use pipeline::HealthPipeline;
