pub mod error;
pub mod header;
pub mod group;
pub mod tag;
pub mod stream;
pub mod patch;
pub mod snapshot;

pub use error::VmssError;
pub use header::ContainerHeader;
pub use group::GroupDescriptor;
pub use tag::{BlockInfo, TagHeader};
pub use stream::{TagPayload, TagRecord, TagStream};
pub use patch::{CpuFilter, NmiValue, PatchConfig, PatchReport};
pub use snapshot::Snapshot;
