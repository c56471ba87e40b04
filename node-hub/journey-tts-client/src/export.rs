//! Writing finished episode audio to disk.

use std::path::{Path, PathBuf};

use eyre::WrapErr;
use journey_cast::{parse_data_uri, write_audio_file, Episode};

/// Lowercase ASCII slug of a title, at most 60 characters
pub fn slugify(title: &str) -> String {
    let mut slug = String::new();
    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let mut slug: String = slug.trim_end_matches('-').chars().take(60).collect();
    while slug.ends_with('-') {
        slug.pop();
    }
    if slug.is_empty() {
        "episode".to_string()
    } else {
        slug
    }
}

/// `<index>-<slug>.mp3`, 1-based and zero-padded
pub fn episode_file_name(index: usize, title: &str) -> String {
    format!("{:02}-{}.mp3", index + 1, slugify(title))
}

/// Write the audio of every episode that carries a data URI.
/// Episodes without audio are skipped.
pub fn export_episode_audio(output_dir: &Path, episodes: &[Episode]) -> eyre::Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    for (index, episode) in episodes.iter().enumerate() {
        let Some(payload) = episode.audio_url.as_deref().and_then(parse_data_uri) else {
            tracing::debug!("No audio to export for \"{}\"", episode.title);
            continue;
        };

        let path = output_dir.join(episode_file_name(index, &episode.title));
        let size = write_audio_file(&path, payload)
            .wrap_err_with(|| format!("Failed to write {}", path.display()))?;
        tracing::info!("Exported \"{}\" to {} ({} bytes)", episode.title, path.display(), size);
        written.push(path);
    }

    Ok(written)
}
