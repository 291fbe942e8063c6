use std::path::{Path, PathBuf};

pub(crate) const BASE_DIR_ENV: &str = "ENLIGHTEN_DIR";

/// Where user-level settings and the default style model live:
/// `$ENLIGHTEN_DIR` if set, `~/.enlighten` otherwise.
pub(crate) fn base_dir() -> Option<PathBuf> {
    if let Some(dir) = base_dir_override() {
        return Some(dir);
    }
    home_join(".enlighten")
}

pub(crate) fn default_model_path() -> PathBuf {
    base_dir()
        .map(|dir| dir.join("style-model.json"))
        .unwrap_or_else(|| PathBuf::from(".enlighten/style-model.json"))
}

/// Expands a leading `~` and drops empty values.
pub(crate) fn expand_path(value: &str) -> Option<PathBuf> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    Some(PathBuf::from(expand_tilde(trimmed)))
}

fn base_dir_override() -> Option<PathBuf> {
    std::env::var(BASE_DIR_ENV)
        .ok()
        .and_then(|value| expand_path(&value))
}

fn home_join(suffix: &str) -> Option<PathBuf> {
    std::env::var("HOME").ok().and_then(|home| {
        let home = home.trim();
        if home.is_empty() {
            None
        } else {
            Some(Path::new(home).join(suffix))
        }
    })
}

fn expand_tilde(value: &str) -> String {
    if value == "~" || value.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            let home = home.trim();
            if home.is_empty() {
                return value.to_string();
            }
            if value == "~" {
                return home.to_string();
            }
            return format!("{}{}", home, &value[1..]);
        }
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::with_temp_home;

    #[test]
    fn base_dir_defaults_to_home() {
        with_temp_home(|home| {
            assert_eq!(base_dir(), Some(home.join(".enlighten")));
            assert_eq!(default_model_path(), home.join(".enlighten/style-model.json"));
        });
    }

    #[test]
    fn tilde_expands_against_home() {
        with_temp_home(|home| {
            assert_eq!(expand_path("~/fonts"), Some(home.join("fonts")));
            assert_eq!(expand_path("  "), None);
            assert_eq!(expand_path("rel/dir"), Some(PathBuf::from("rel/dir")));
        });
    }
}
