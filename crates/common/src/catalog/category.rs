//! Category label normalization
//!
//! Site menus link to the catalog with plural, accented labels
//! ("Livros", "Vídeos") while document types are stored singular and
//! sometimes without accents ("Livro", "Video").

use crate::db::models::search_key;

/// A normalized category label: the de-pluralized form and its
/// accent-folded form. A document type matches when its name contains
/// either one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryLabel {
    pub singular: String,
    pub folded: String,
}

impl CategoryLabel {
    /// Distinct lower-cased substrings to look for in document-type names
    pub fn needles(&self) -> Vec<String> {
        let singular = search_key(&self.singular);
        let folded = search_key(&self.folded);
        if singular == folded {
            vec![singular]
        } else {
            vec![singular, folded]
        }
    }
}

/// Normalize a category label.
///
/// Trims whitespace, strips one trailing plural `s`, and folds the accented
/// vowels used in Portuguese to ASCII. Returns `None` for blank labels.
pub fn normalize_category(label: &str) -> Option<CategoryLabel> {
    let trimmed = label.trim();
    if trimmed.is_empty() {
        return None;
    }

    let singular = strip_plural(trimmed).to_string();
    let folded = fold_accents(&singular);

    Some(CategoryLabel { singular, folded })
}

fn strip_plural(label: &str) -> &str {
    match label.strip_suffix(['s', 'S']) {
        Some(rest) if !rest.trim_end().is_empty() => rest,
        _ => label,
    }
}

/// Replace accented vowels with their unaccented equivalents.
pub fn fold_accents(text: &str) -> String {
    text.chars().map(fold_char).collect()
}

fn fold_char(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' => 'u',
        'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'A',
        'É' | 'È' | 'Ê' | 'Ë' => 'E',
        'Í' | 'Ì' | 'Î' | 'Ï' => 'I',
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'O',
        'Ú' | 'Ù' | 'Û' | 'Ü' => 'U',
        other => other,
    }
}
