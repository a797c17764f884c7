//! Master playlist

/// Advertised bandwidth of the single variant
const VARIANT_BANDWIDTH: u32 = 800_000;

/// Codecs of the encoder output (baseline H.264 + AAC-LC)
const VARIANT_CODECS: &str = "avc1.42e01e,mp4a.40.2";

/// Render the top-level playlist tying the per-kind playlists together
///
/// Audio is declared as an alternate rendition group referenced by the one
/// video variant.
pub fn render_master(video_playlist: &str, audio_playlist: &str) -> String {
    format!(
        "#EXTM3U\n\
         #EXT-X-VERSION:3\n\
         #EXT-X-MEDIA:TYPE=AUDIO,GROUP-ID=\"audio\",NAME=\"default\",DEFAULT=YES,AUTOSELECT=YES,URI=\"{audio}\"\n\
         #EXT-X-STREAM-INF:BANDWIDTH={bandwidth},CODECS=\"{codecs}\",AUDIO=\"audio\"\n\
         {video}\n",
        audio = audio_playlist,
        video = video_playlist,
        bandwidth = VARIANT_BANDWIDTH,
        codecs = VARIANT_CODECS,
    )
}
