// Copyright 2025 the Trellis Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The persistence collaborator.
//!
//! ## Protocol
//!
//! Data-bound components never block. Each request hands the store a fresh
//! [`Ticket`]; the store answers later, from whatever event loop drives it, by
//! calling [`ComponentTree::resolve`](crate::ComponentTree::resolve) with that
//! ticket. A ticket resolves at most once, to a success or a failure.
//!
//! ## Superseded requests
//!
//! Each component remembers only its latest fetch. A reply to an older fetch
//! is dropped when it arrives, whatever the arrival order.

use serde_json::Value;
use trellis_class::Options;

use crate::types::{Model, Response, Ticket};

/// Backend the data-bound components fetch from and save to.
pub trait Store {
    /// Fetch one record of `resource` by id.
    fn fetch_model(&mut self, ticket: Ticket, resource: &str, id: &Value);

    /// Fetch the records of `resource` matching `query`.
    fn fetch_collection(&mut self, ticket: Ticket, resource: &str, query: &Options);

    /// Create or update `model` in `resource`.
    fn save_model(&mut self, ticket: Ticket, resource: &str, model: &Model);
}

/// A successful store reply.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    /// A single record, for fetches and saves.
    Model(Model),
    /// A record plus the store's response, for saves.
    Saved(Model, Response),
    /// A list of records, for collection fetches.
    Collection(Vec<Model>),
}

/// The outcome of one request.
pub type Outcome = Result<Reply, Response>;
