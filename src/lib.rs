pub mod clock;
pub mod config;
pub mod domain {
    pub mod experiment;
    pub mod pricing;
    pub mod promotion;
    pub mod seasonal;
    pub mod targeting;
}
pub mod errors;
pub mod experiments {
    pub mod assigner;
    pub mod registry;
    pub mod results;
    pub mod targeting;
}
pub mod http {
    pub mod error;
    pub mod handlers {
        pub mod experiments;
        pub mod ops;
        pub mod pricing;
        pub mod promotions;
        pub mod seasonal;
    }
    pub mod middleware {
        pub mod admin_auth;
    }
    pub mod router;
}
pub mod identity;
pub mod pricing {
    pub mod engine;
    pub mod rules;
}
pub mod promotions {
    pub mod discount;
    pub mod eligibility;
    pub mod registry;
}
pub mod seasonal {
    pub mod orchestrator;
}
pub mod service {
    pub mod scheduler;
}
pub mod store;

use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub experiments: experiments::registry::ExperimentRegistry,
    pub promotions: promotions::registry::PromotionRegistry,
    pub pricing: pricing::engine::PricingEngine,
    pub seasonal: seasonal::orchestrator::SeasonalOrchestrator,
    pub identity: Arc<dyn identity::IdentityPort>,
    pub store: Arc<dyn store::StorePort>,
    pub clock: Arc<dyn clock::Clock>,
}
