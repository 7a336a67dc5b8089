pub use crate::allocation::AllocationStats;
pub use crate::allocation::GuestBuffer;
pub use crate::config::InvokeConfig;
pub use crate::invoke::invoke;
pub use crate::invoke::invoke_with_config;
pub use crate::module::GuestModule;
pub use crate::module::ModuleBuilder;
pub use crate::pool::PooledSession;
pub use crate::pool::SessionPool;
pub use crate::session::RuntimeSession;
pub use crate::timeout::invoke_with_deadline;
pub use crate::timeout::invoke_with_timeout;
pub use crate::timeout::TimedInvoke;
pub use guestcall_common::*;
