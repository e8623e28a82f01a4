/// Invite redemption.
pub mod acceptance_service;
/// Duel finalization and reward distribution.
pub mod completion_service;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Invite issuing.
pub mod invite_service;
/// Due-transition detection and the batch sweep.
pub mod lifecycle_monitor;
/// Scoring of actions reported by other features.
pub mod score_ledger;
/// Scoreboard and duel list read models.
pub mod scoreboard_service;
/// Storage connection supervisor toggling degraded mode.
pub mod storage_supervisor;
/// Background task running the periodic sweep.
pub mod sweeper;
