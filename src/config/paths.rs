//! Canonical paths for sharkcast recordings.
//!
//! Single source of truth - import this instead of hardcoding paths.
//!
//! ## Layout
//!
//! | Path | Purpose |
//! |------|---------|
//! | `<audio_dir>/<output_id>.<ext>` | One recorded broadcast |
//! | `<audio_dir>/latest.<ext>` | Symlink to the most recent recording |
//! | `<audio_dir>/.sharkcast-<fin>.lock` | Held while a daemon drives that fin |

use std::path::{Path, PathBuf};

/// Expand a leading `~` and any `$VAR` / `${VAR}` references.
///
/// Unknown variables are left in place untouched.
pub fn expand_path(raw: &str) -> PathBuf {
    let expanded = expand_vars(raw);

    if expanded == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = expanded.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }

    PathBuf::from(expanded)
}

fn expand_vars(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, consumed) = if let Some(braced) = after.strip_prefix('{') {
            match braced.find('}') {
                Some(end) => (&braced[..end], end + 2),
                None => ("", 0),
            }
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], end)
        };

        match std::env::var(name) {
            Ok(value) if !name.is_empty() => out.push_str(&value),
            _ => out.push_str(&rest[pos..pos + 1 + consumed]),
        }
        rest = &after[consumed..];
    }

    out.push_str(rest);
    out
}

/// Path of the recording for one event
pub fn recording_path(audio_dir: &Path, output_id: &str, extension: &str) -> PathBuf {
    audio_dir.join(format!("{}.{}", output_id, extension))
}

/// Path of the `latest` symlink for a given encoder extension
pub fn latest_link(audio_dir: &Path, extension: &str) -> PathBuf {
    audio_dir.join(format!("latest.{}", extension))
}

/// Lock file guarding a fin against concurrent daemons
pub fn lock_path(audio_dir: &Path, fin_name: &str) -> PathBuf {
    audio_dir.join(format!(".sharkcast-{}.lock", fin_name))
}
