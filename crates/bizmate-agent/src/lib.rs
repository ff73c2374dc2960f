// SPDX-FileCopyrightText: 2026 Bizmate Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation brain for Bizmate.
//!
//! [`orchestrator`] runs the bounded tool-calling loop against any
//! `ChatProvider`; [`tools`] holds the fixed tool registry and the executors
//! that map accounting failures into model-legible payloads;
//! [`confirmation`] gates side-effecting invoice creation behind an explicit
//! user confirmation.

pub mod confirmation;
pub mod orchestrator;
pub mod prompt;
pub mod tools;

pub use confirmation::{ConfirmationGate, InvoiceCreator};
pub use orchestrator::Orchestrator;
pub use tools::{tool_definitions, ToolSet, XeroToolSet};
