// Configuration (environment, timelines.yaml, CLI overrides)
pub mod config;

// Timeline copy phases and run reports
pub mod copier;

// Store abstraction: Redis client and in-memory backend
pub mod store;
