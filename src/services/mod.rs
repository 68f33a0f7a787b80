//! External service integrations

pub mod enrichment;
pub mod jellyfin;
pub mod logging;
pub mod rate_limiter;
pub mod tmdb;

pub use enrichment::{DetailsProvider, EnrichedMovie, EnrichedSeries, NewsletterDigest, build_digest};
pub use jellyfin::{JellyfinClient, SystemInfo};
pub use logging::init_tracing;
pub use tmdb::{ItemDetails, MediaType, TmdbClient};
