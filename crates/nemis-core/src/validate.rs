//! Upload validation shared by the profile-image endpoints.

use crate::{Error, Result};

/// Largest accepted profile image, in bytes.
pub const MAX_PROFILE_IMAGE_BYTES: usize = 5 * 1024 * 1024;

/// Accept an upload only if it declares an `image/*` content type and fits
/// within [`MAX_PROFILE_IMAGE_BYTES`]. Returns the file extension to store
/// the image under.
pub fn validate_profile_image(content_type: Option<&str>, size: usize) -> Result<&'static str> {
  let mime = content_type
    .map(|ct| ct.split(';').next().unwrap_or("").trim().to_ascii_lowercase())
    .unwrap_or_default();
  let Some(subtype) = mime.strip_prefix("image/") else {
    return Err(Error::validation("profile_image", "Only image files are allowed."));
  };
  if size == 0 {
    return Err(Error::validation("profile_image", "The submitted file is empty."));
  }
  if size > MAX_PROFILE_IMAGE_BYTES {
    return Err(Error::validation("profile_image", "Image file too large ( > 5MB )."));
  }
  Ok(match subtype {
    "png" => "png",
    "jpeg" | "jpg" => "jpg",
    "gif" => "gif",
    "webp" => "webp",
    _ => "img",
  })
}
