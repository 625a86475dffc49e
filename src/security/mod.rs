//! The Security Policy: the Agent Loop's dispatch gate. Every tool call is
//! validated here, keyed on tool/command name, before the registry ever
//! sees it — never inside an individual tool.

pub mod policy;

pub use policy::{AuditEntry, AutonomyLevel, RiskLevel, SecurityPolicy, ValidationResult};
