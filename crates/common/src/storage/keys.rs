//! Storage key layout for uploaded files

use super::StorageError;
use crate::catalog::fold_accents;
use chrono::{DateTime, Datelike, Utc};
use regex_lite::Regex;
use std::sync::OnceLock;

const ROOT: &str = "repositorio";
const NO_PROJECT: &str = "sem-projeto";
const NO_SUBPROJECT: &str = "sem-subprojeto";

fn non_alphanumeric() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[^a-z0-9]+").expect("static regex"))
}

/// Lower-case ASCII slug with runs of other characters collapsed to `-`
pub fn slugify(text: &str) -> String {
    let folded = fold_accents(text)
        .replace(['ç', 'Ç'], "c")
        .to_lowercase();
    non_alphanumeric()
        .replace_all(&folded, "-")
        .trim_matches('-')
        .to_string()
}

/// `repositorio/<project>/<subproject>/<MM>/<DD>/<filename>`
pub fn upload_key(
    project: &str,
    subproject: &str,
    filename: &str,
    now: DateTime<Utc>,
) -> Result<String, StorageError> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
        .ok_or_else(|| StorageError::InvalidKey(filename.to_string()))?;

    let project = non_empty_or(slugify(project), NO_PROJECT);
    let subproject = non_empty_or(slugify(subproject), NO_SUBPROJECT);

    Ok(format!(
        "{}/{}/{}/{:02}/{:02}/{}",
        ROOT,
        project,
        subproject,
        now.month(),
        now.day(),
        name
    ))
}

fn non_empty_or(slug: String, fallback: &str) -> String {
    if slug.is_empty() {
        fallback.to_string()
    } else {
        slug
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn june_12() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 12, 10, 0, 0).unwrap()
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Transição Energética"), "transicao-energetica");
        assert_eq!(slugify("  Sub 4.1 / Fase B "), "sub-4-1-fase-b");
        assert_eq!(slugify("***"), "");
    }

    #[test]
    fn test_upload_key_layout() {
        let key = upload_key("TCCE", "Subprojeto 4.1", "relatorio.pdf", june_12()).unwrap();
        assert_eq!(key, "repositorio/tcce/subprojeto-4-1/06/12/relatorio.pdf");
    }

    #[test]
    fn test_upload_key_fallbacks() {
        let key = upload_key("", "!!", "a.pdf", june_12()).unwrap();
        assert_eq!(key, "repositorio/sem-projeto/sem-subprojeto/06/12/a.pdf");
    }

    #[test]
    fn test_upload_key_strips_directories() {
        let key = upload_key("p", "s", "../../etc/passwd", june_12()).unwrap();
        assert!(key.ends_with("/06/12/passwd"));
        assert!(upload_key("p", "s", "dir/", june_12()).is_err());
        assert!(upload_key("p", "s", "  ", june_12()).is_err());
    }
}
