//! imp-cm library - Campaign Manager
//!
//! Data layer behind the campaign contacts screen: typed REST clients, the
//! cursor pagination tracker, the per-view dataset reconciler, selection
//! bookkeeping and the bulk stage-mutation coordinator, tied together by
//! [`session::CampaignSession`].

pub mod api;
pub mod cache;
pub mod error;
pub mod filter;
pub mod membership;
pub mod mutation;
pub mod pagination;
pub mod reconcile;
pub mod selection;
pub mod session;
pub mod sources;

pub use error::{Error, Result};
pub use session::{CampaignSession, SessionOptions, ViewSnapshot};
pub use sources::Sources;
