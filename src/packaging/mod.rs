//! HLS packaging of a peer's published media
//!
//! A [`PackagingSession`] consumes one video and one audio producer over
//! plain RTP sink transports, runs one encoder per kind and publishes the
//! resulting playlists under the live directory.

pub mod config;
pub mod encoder;
pub mod paths;
pub mod playlist;
pub mod sdp;
pub mod session;
pub mod state;

pub use config::PackagingConfig;
pub use encoder::{ffmpeg_args, stop_encoder, EncoderJob, EncoderLauncher, EncoderProcess, FfmpegLauncher};
pub use paths::OutputPaths;
pub use playlist::render_master;
pub use sdp::SessionDescription;
pub use session::{PackagingContext, PackagingSession};
pub use state::PackagingState;
