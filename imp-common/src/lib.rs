//! # IMP Common Library
//!
//! Shared code for the Investor Match Portal crates including:
//! - Contact, match and introduction wire models
//! - Campaign stage enumeration and wire-format translation
//! - Configuration loading
//! - Quality-score heuristic for capability buckets
//! - Common error type

pub mod campaign;
pub mod config;
pub mod contact;
pub mod error;
pub mod introductions;
pub mod prompts;
pub mod quality;

pub use campaign::{ApiStage, CampaignStatus, MembershipMap, StageDistribution, StageOrder};
pub use contact::{Contact, ContactType};
pub use error::{Error, Result};
