//! Playlist sources: transport seams, fetching and parsing

pub mod fetcher;
pub mod m3u;
pub mod transport;

pub use fetcher::{FetchFailure, FetchedPlaylist, SourceFetcher};
pub use transport::{
    HttpTransport, PlaylistTransport, ProbeResponse, ProbeTransport, RequestOptions,
};
