use std::path::{Path, PathBuf};

pub const MESSAGES_FILE_NAME: &str = "messages.jsonl";
pub const CORRELATIONS_FILE_NAME: &str = "correlations.json";

#[must_use]
pub fn namespace_dir(data_dir: &Path, namespace: &str) -> PathBuf {
    data_dir.join(safe_component(namespace))
}

#[must_use]
pub fn messages_path(data_dir: &Path, namespace: &str) -> PathBuf {
    namespace_dir(data_dir, namespace).join(MESSAGES_FILE_NAME)
}

#[must_use]
pub fn correlations_path(data_dir: &Path, namespace: &str) -> PathBuf {
    namespace_dir(data_dir, namespace).join(CORRELATIONS_FILE_NAME)
}

fn safe_component(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
            _ => '_',
        })
        .collect();
    if cleaned.is_empty() || cleaned.chars().all(|c| c == '.') {
        return "_".to_string();
    }
    cleaned
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn namespace_is_sanitized() {
        let root = Path::new("/srv/data");
        assert_eq!(
            namespace_dir(root, "db_badslido"),
            PathBuf::from("/srv/data/db_badslido")
        );
        assert_eq!(namespace_dir(root, "../etc"), PathBuf::from("/srv/data/.._etc"));
        assert_eq!(namespace_dir(root, ".."), PathBuf::from("/srv/data/_"));
        assert_eq!(
            correlations_path(root, "ns"),
            PathBuf::from("/srv/data/ns/correlations.json")
        );
    }
}
