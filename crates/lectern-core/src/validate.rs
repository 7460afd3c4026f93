//! Field validation that the storage layer cannot express.

use url::Url;

use crate::{Error, Result};

/// Hosts a lesson video may be linked from.
pub const ALLOWED_VIDEO_HOSTS: &[&str] =
  &["www.youtube.com", "youtube.com", "youtu.be", "www.youtu.be"];

/// Accept an empty or absent link, or an absolute URL on a YouTube host.
pub fn video_link(link: Option<&str>) -> Result<()> {
  let Some(link) = link.map(str::trim).filter(|l| !l.is_empty()) else {
    return Ok(());
  };

  let host = Url::parse(link)
    .ok()
    .and_then(|url| url.host_str().map(str::to_ascii_lowercase));

  match host {
    Some(host) if ALLOWED_VIDEO_HOSTS.contains(&host.as_str()) => Ok(()),
    _ => Err(Error::InvalidRequest("only YouTube links are allowed".into())),
  }
}

/// An email address is the login name: it needs a local part and a domain
/// around a single `@`, and no whitespace.
pub fn email(address: &str) -> Result<()> {
  let valid = match address.split_once('@') {
    Some((local, domain)) => {
      !local.is_empty()
        && !domain.is_empty()
        && !domain.contains('@')
        && !address.chars().any(char::is_whitespace)
    }
    None => false,
  };
  if valid { Ok(()) } else { Err(Error::InvalidRequest("email is not valid".into())) }
}

pub fn username(name: &str) -> Result<()> {
  if name.trim().is_empty() {
    return Err(Error::InvalidRequest("username must not be empty".into()));
  }
  Ok(())
}
