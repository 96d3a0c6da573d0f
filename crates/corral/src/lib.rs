//! # corral
//!
//! Generic asynchronous resource pool: rations access to a bounded
//! population of expensive, reusable resources (connections, sessions,
//! worker handles) among concurrent borrowers.
//!
//! A [`Pool`] is built around a [`Factory`] — the capability set that
//! creates, destroys, and optionally validates resources. Borrowers call
//! [`Pool::acquire`] and get back a [`Loan`] that dereferences to the
//! resource and returns it to the pool on drop. Demand beyond the idle set
//! triggers creations up to `max`; everything else waits in strict-priority,
//! FIFO-within-class order. A background sweep retires long-idle resources
//! without dipping below `min`, and shutdown is a two-phase protocol:
//! [`Pool::drain`] quiesces borrowers, then [`Pool::clear`] destroys what
//! is left.
//!
//! ```
//! use corral::{BoxError, Factory, Pool, PoolConfig};
//!
//! struct SessionFactory;
//!
//! impl Factory for SessionFactory {
//!     type Resource = String;
//!
//!     fn id(&self) -> &str {
//!         "session"
//!     }
//!
//!     async fn create(&self) -> Result<String, BoxError> {
//!         Ok("session-1".to_string())
//!     }
//!
//!     async fn destroy(&self, _session: String) -> Result<(), BoxError> {
//!         Ok(())
//!     }
//! }
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> corral::Result<()> {
//! let pool = Pool::new(
//!     SessionFactory,
//!     PoolConfig {
//!         max: 4,
//!         ..PoolConfig::default()
//!     },
//! )?;
//!
//! let session = pool.acquire().await?;
//! assert_eq!(&*session, "session-1");
//! drop(session); // back to the pool
//!
//! pool.drain().await;
//! pool.clear().await?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod events;
pub mod factory;
pub mod loan;
pub mod pool;

mod deferred;
mod evictor;
mod queue;
mod record;

pub use config::{PoolConfig, Strategy};
pub use error::{BoxError, Error, Result};
pub use events::{DestroyReason, PoolEvent};
pub use factory::Factory;
pub use loan::Loan;
pub use pool::{Pool, Stats, Status};
