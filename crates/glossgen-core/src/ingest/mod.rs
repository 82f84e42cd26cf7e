mod fetch;
mod legacy;
mod sdmx;

pub use fetch::{FetchConfig, Fetcher, SourceLocation};
pub use legacy::LegacyReader;
pub use sdmx::{SdmxReader, COMMON_NS, STRUCTURE_NS};
