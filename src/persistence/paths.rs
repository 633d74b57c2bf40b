use crate::persistence::error::{PersistenceError, PersistenceResult};
use std::path::{Path, PathBuf};

pub const BUCKETS: [&str; 6] = ["A-E", "F-J", "K-O", "P-T", "U-Z", "ZZZ"];

/// Record files are spread over directories by the first letter of the name.
pub fn bucket_for(name: &str) -> &'static str {
    match name.chars().next().map(|ch| ch.to_ascii_lowercase()) {
        Some('a'..='e') => BUCKETS[0],
        Some('f'..='j') => BUCKETS[1],
        Some('k'..='o') => BUCKETS[2],
        Some('p'..='t') => BUCKETS[3],
        Some('u'..='z') => BUCKETS[4],
        _ => BUCKETS[5],
    }
}

/// Names end up in file paths and in a whitespace-separated index. Only
/// ASCII is accepted so case-insensitive lookups match what gets stored.
pub fn validate_name(name: &str) -> PersistenceResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '_' || ch == '-' || ch == '\'');
    if valid {
        Ok(())
    } else {
        Err(PersistenceError::InvalidName {
            name: name.to_string(),
        })
    }
}

pub fn record_path(player_dir: &Path, name: &str, extension: &str) -> PersistenceResult<PathBuf> {
    validate_name(name)?;
    let lower = name.to_lowercase();
    Ok(player_dir
        .join(bucket_for(&lower))
        .join(format!("{lower}.{extension}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_map_to_letter_buckets() {
        assert_eq!(bucket_for("Arthas"), "A-E");
        assert_eq!(bucket_for("jaina"), "F-J");
        assert_eq!(bucket_for("Thrall"), "P-T");
        assert_eq!(bucket_for("zul"), "U-Z");
        assert_eq!(bucket_for("9lives"), "ZZZ");
        assert_eq!(bucket_for(""), "ZZZ");
    }

    #[test]
    fn record_path_is_lowercased() {
        let path = record_path(Path::new("plrfiles"), "Kael", "plr").expect("path");
        assert_eq!(path, Path::new("plrfiles").join("K-O").join("kael.plr"));
    }

    #[test]
    fn rejects_names_that_escape_the_directory() {
        for name in ["", "../etc", "a b", "x/y", "."] {
            assert!(record_path(Path::new("p"), name, "plr").is_err(), "{name:?}");
        }
    }

    #[test]
    fn names_are_ascii_only() {
        assert!(validate_name("O'Brien-2_x").is_ok());
        for name in ["Élan", "ÉLAN", "Ωmega", "名前"] {
            assert!(validate_name(name).is_err(), "{name:?}");
        }
    }
}
