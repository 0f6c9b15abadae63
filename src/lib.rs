/// Basic application code
pub mod app;
/// REST clients for outside services
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Certificate archive dispatch task and scheduler
pub mod dispatch;
/// Domain objects
pub mod domain;
/// PDF certificate rendering
pub mod render;
/// Repositories
pub mod repo;
/// Application settings
pub mod settings;
/// On-disk certificate file layout
pub mod storage;
/// Application telemetry for tracing and logging
pub mod telemetry;
/// Background drive upload queue
pub mod upload;
/// Certificate verification lookup and chat bot
pub mod verify;
