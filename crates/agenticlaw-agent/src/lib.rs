//! Agenticlaw Agent - the ReAct kernel: planner, evaluator, executor,
//! credit gate, and the durable session store they share.

pub mod context;
pub mod credit;
pub mod evaluator;
pub mod executor;
pub mod kernel;
pub mod planner;
pub mod session;

pub use context::ContextManager;
pub use credit::{CreditClient, CreditGate};
pub use evaluator::Evaluator;
pub use executor::Executor;
pub use kernel::{AgentKernel, ResumeInput};
pub use planner::Planner;
pub use session::{build_session_store, ExecutionState, MemoryStore, RedisStore, SessionStore};
