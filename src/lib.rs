//! # Autolot
//!
//! Autolot is the data layer of a vehicle marketplace that runs entirely in
//! process. It speaks the request/response contract of a hosted relational
//! backend (fluent filters, ordering, limits, single-row fetch, inserts,
//! updates, deletes and embedded foreign rows) while keeping every table in
//! memory. Callers cannot tell it from a network round-trip: every request
//! is a future, and every outcome comes back as a `{ data, error, count }`
//! envelope.
//!
//! ## What's inside
//!
//! ### Query emulation
//! [`Engine::from`] starts a [`QueryBuilder`]. Chained calls only record
//! intent; awaiting the builder resolves it exactly once against the
//! [`TableStore`]. The builder is moved into the future, so it cannot be
//! resolved twice.
//!
//! ```rust,ignore
//! let engine = Engine::new(Config::default());
//!
//! let resp = engine
//!     .from("cars")
//!     .select("*")
//!     .eq("status", "available")
//!     .or("title.ilike.%benz%,make.ilike.%benz%,model.ilike.%benz%")
//!     .order("price", true)
//!     .limit(10)
//!     .await;
//!
//! let cars: Vec<Car> = resp.decode_rows()?;
//! ```
//!
//! ### Embedded relations
//! `select("*, cars(*)")` on `orders`, `bookings` or `wishlist` follows the
//! `car_id` foreign key and inlines the vehicle under `cars`.
//!
//! ### Collaborators
//! - [`storage::BlobStore`] for listing photos and videos
//! - [`auth::AuthProvider`] for the signed-in session
//! - [`listings::ListingApi`], the flat listing service the admin UI can
//!   use instead of the query layer
//! - [`realtime`] channels that observe committed mutations
//!
//! ## Failure model
//! Resolution never panics or returns `Err` to the caller. Not-found reads,
//! updates and deletes are silent (`data: null`, `error: null`); everything
//! else that goes wrong is reported in `error`.

pub mod auth;
pub mod config;
pub mod error;
mod join;
pub mod listings;
pub mod predicate;
pub mod query;
pub mod realtime;
mod resolve;
pub mod response;
pub mod schema;
pub mod select;
pub mod storage;
pub mod store;

use std::sync::Arc;

pub use crate::config::Config;
pub use crate::error::{Error, ErrorInfo};
pub use crate::query::{Operation, QueryBuilder};
pub use crate::realtime::{ChangeEvent, ChangeKind, Channel, Subscription};
pub use crate::response::{Data, Response};
pub use crate::schema::{Booking, Car, Order, Profile, TableName, WishlistEntry};
pub use crate::store::{Row, Table, TableStore};

use crate::realtime::Realtime;

/// The Engine is the handle every request starts from. Cloning it shares
/// the same tables.
#[derive(Clone)]
pub struct Engine {
    inner: Arc<Autolot>,
}

pub struct Autolot {
    store: Arc<TableStore>,
    config: Config,
    realtime: Realtime,
}

impl Engine {
    /// Builds a fresh store, seeded with the marketplace fixtures when
    /// `config.seed` is set.
    pub fn new(config: Config) -> Self {
        let store = if config.seed {
            TableStore::seeded()
        } else {
            TableStore::new()
        };
        Self::with_store(Arc::new(store), config)
    }

    pub fn with_store(store: Arc<TableStore>, config: Config) -> Self {
        let realtime = Realtime::new(config.channel_capacity);
        Self {
            inner: Arc::new(Autolot {
                store,
                config,
                realtime,
            }),
        }
    }

    pub fn store(&self) -> &Arc<TableStore> {
        &self.inner.store
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    // ==================== Queries ====================

    /// Start a request against `table`.
    pub fn from(&self, table: &str) -> QueryBuilder<'_> {
        QueryBuilder::new(&self.inner, table)
    }

    // ==================== Realtime ====================

    pub fn channel(&self, name: &str) -> Channel<'_> {
        Channel::new(&self.inner.realtime, name)
    }

    pub fn remove_channel(&self, subscription: Subscription) {
        tracing::debug!(channel = subscription.name(), "realtime unsubscribe");
        drop(subscription);
    }

    // ==================== Lifecycle ====================

    /// Empties every table.
    pub fn reset(&self) -> Result<(), Error> {
        self.inner.store.clear()
    }
}
