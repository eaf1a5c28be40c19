//! Subscription registry for observer fan-out
//!
//! Every successful `set` is pushed to each connection that has issued
//! `subscribe`. The registry is an explicitly owned object handed to the
//! router, never process-wide state.
//!
//! # Architecture
//!
//! ```text
//!                     Arc<SubscriptionRegistry>
//!                   ┌───────────────────────────┐
//!                   │ subscribers: HashMap<id,  │
//!                   │   Subscriber {            │
//!                   │     writer: Arc<Mutex<W>> │
//!                   │   }                       │
//!                   │ >                         │
//!                   └─────────────┬─────────────┘
//!                                 │
//!         ┌───────────────────────┼───────────────────────┐
//!         │                       │                       │
//!         ▼                       ▼                       ▼
//!    [set session]           [observer]              [observer]
//!    router.handle_set()     write half              write half
//!         │                       ▲                       ▲
//!         └──► registry.broadcast()──► push() ────────────┘
//! ```
//!
//! A broadcast snapshots the membership under the lock, writes to all members
//! concurrently with the lock released, then re-acquires it to prune failures.
//! One slow observer therefore never holds up attach/detach or other pushes
//! beyond the configured push timeout.

pub mod entry;
pub mod store;

pub use entry::{SharedWriter, Subscriber};
pub use store::{BroadcastReport, SubscriptionRegistry};
