mod done_queue;

pub use done_queue::{DoneSender, WorkerDoneQueue};
