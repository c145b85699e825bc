//! Core types and traits for fixline
//!
//! This crate provides the foundational types used across all other crates:
//! - Lead and classification types (categories, urgency, lifecycle)
//! - Business records and geography
//! - Match results
//! - Call types (context, session transcript, outcome)
//! - The `TextGenerator` trait every generative call goes through
//! - Shared error types

pub mod business;
pub mod call;
pub mod error;
pub mod lead;
pub mod matching;
pub mod traits;

pub use business::{Business, GeoPoint, PricingTier};
pub use call::{
    append_delta, render_transcript, CallContext, CallOutcome, CallType, InterestLevel,
    NextAction, OutcomeStatus, Speaker, Turn,
};
pub use error::{Error, Result};
pub use lead::{
    BudgetRange, ClassifiedLead, Lead, LeadStatus, Sentiment, ServiceCategory, Urgency,
};
pub use matching::Match;
pub use traits::{GenerateRequest, TextGenerator};
