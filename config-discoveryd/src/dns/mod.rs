pub mod hickory;
pub mod records;
pub mod resolver;

pub use hickory::HickoryResolver;
pub use records::{RData, ResourceRecord, Srv, Txt, UpdateMessage, UpdateOutcome};
pub use resolver::{ResolveError, Resolver};
