// ABOUTME: Public library API for Granola note sync
// ABOUTME: Token lifecycle, Markdown converters, API client, and sync pipeline

pub mod api;
pub mod cli;
pub mod convert;
pub mod error;
pub mod model;
pub mod storage;
pub mod sync;
pub mod token;
pub mod util;

pub use error::{Error, Result};
pub use model::{Document, Node, SyncRecord, Utterance, UtteranceSource};
pub use token::{CredentialState, TokenManager, TokenState};
