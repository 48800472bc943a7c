//! Shared test utilities for mailharvest integration tests.
//!
//! This module provides:
//! - `FakeMailbox`, an in-memory `MailProvider` with call accounting
//! - Builders for messages and part trees

pub mod builders;
pub mod fake_mailbox;

pub use builders::*;
pub use fake_mailbox::FakeMailbox;
