pub mod checkpoint;
pub mod error;
pub mod export;
pub mod net;
pub mod placement;
pub mod session;
pub mod summary;
pub mod supervisor;
pub mod trainer;

pub use checkpoint::Saver;
pub use error::{Result, WorkerErr};
pub use export::{Exporter, SavedModelBuilder, ServingModel};
pub use session::{LocalSession, RemoteSession, Session};
pub use summary::SummaryWriter;
pub use supervisor::{ManagedSession, Supervisor, SupervisorOpts};
pub use trainer::Trainer;
