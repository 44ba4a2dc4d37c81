pub mod crawler;
pub mod downloader;
pub mod link_log;
pub mod normalizer;
pub mod renderer;
pub mod splitter;
#[cfg(test)]
pub(crate) mod stub_server;
pub mod validator;

pub use crawler::Crawler;
pub use downloader::{Downloader, FetchedImage, HttpFetcher, ImageFetcher};
pub use link_log::LinkLogger;
pub use normalizer::{FilenameNormalizer, NormalizedName};
pub use renderer::{HttpRenderer, PageRenderer, RenderOutcome};
pub use splitter::DatasetSplitter;
pub use validator::FilenameValidator;
