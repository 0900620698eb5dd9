//! Tag writing for converted files
//!
//! Writes title, artist, album and cover art from the container's metadata
//! into the primary tag of the decoded audio file.

use std::io::Cursor;
use std::path::Path;

use lofty::{Accessor, Picture, PictureType, Probe, Tag, TagExt, TaggedFileExt};

use super::metadata::TrackMetadata;

/// Write track metadata to an audio file
///
/// Fields that are missing from `metadata` are left untouched. The cover is
/// only written when `include_cover` is set and image bytes are available.
pub fn write_track_tags(
    path: &Path,
    metadata: &TrackMetadata,
    include_cover: bool,
) -> Result<(), String> {
    // Read the file
    let mut tagged_file = Probe::open(path)
        .map_err(|e| format!("Failed to open file: {}", e))?
        .guess_file_type()
        .map_err(|e| format!("Failed to detect file type: {}", e))?
        .read()
        .map_err(|e| format!("Failed to read file: {}", e))?;

    // Get or create the primary tag
    let tag = match tagged_file.primary_tag_mut() {
        Some(tag) => tag,
        None => {
            let tag_type = tagged_file.primary_tag_type();
            tagged_file.insert_tag(Tag::new(tag_type));
            tagged_file
                .primary_tag_mut()
                .ok_or_else(|| "Failed to create tag".to_string())?
        }
    };

    if let Some(title) = &metadata.title {
        tag.set_title(title.clone());
    }
    if let Some(artist) = metadata.artist_display() {
        tag.set_artist(artist);
    }
    if let Some(album) = &metadata.album {
        tag.set_album(album.clone());
    }

    if include_cover {
        if let Some(cover) = &metadata.cover {
            let mut picture = Picture::from_reader(&mut Cursor::new(cover.as_slice()))
                .map_err(|e| format!("Failed to read cover image: {}", e))?;
            picture.set_pic_type(PictureType::CoverFront);
            tag.remove_picture_type(PictureType::CoverFront);
            tag.push_picture(picture);
        }
    }

    tag.save_to_path(path)
        .map_err(|e| format!("Failed to save file: {}", e))?;

    verify_saved_tag(path, metadata)?;
    log::debug!("Wrote tags to {}", path.display());
    Ok(())
}

/// Re-read the file and make sure a reader can actually see the new tag
///
/// A FLAC stream that ends its metadata at STREAMINFO gets the tag appended
/// after the last-block flag, where no reader looks.
fn verify_saved_tag(path: &Path, metadata: &TrackMetadata) -> Result<(), String> {
    let reread = Probe::open(path)
        .map_err(|e| format!("Failed to reopen file: {}", e))?
        .guess_file_type()
        .map_err(|e| format!("Failed to detect file type: {}", e))?
        .read()
        .map_err(|e| format!("Failed to read back tags: {}", e))?;

    let visible = reread.primary_tag().is_some_and(|tag| {
        metadata.title.is_none() || tag.title().as_deref() == metadata.title.as_deref()
    });
    if !visible {
        return Err("tag was saved but is not readable from the file".to_string());
    }
    Ok(())
}
