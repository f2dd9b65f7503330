//! Pluralization against the provider's method surface.
//!
//! Predicate-based filtering fetches a collection of candidates instead of
//! a single element, which requires the plural form of the declared tag
//! method. Plural forms are never guessed from English rules alone; a form
//! only counts if the provider surface actually exposes it.

use crate::provider::Surface;
use crate::result::{PaginaError, PaginaResult};

/// Plural form of a tag method: `tag + "s"` if the surface exposes it,
/// else `tag + "es"`.
///
/// # Errors
///
/// Returns [`PaginaError::CannotPluralize`] when neither form exists.
/// Declarations only hit this lazily, the first time predicate filtering
/// needs the plural form for the tag.
pub fn pluralize(surface: &Surface, tag: &str) -> PaginaResult<String> {
    let with_s = format!("{tag}s");
    if surface.has_method(&with_s) {
        return Ok(with_s);
    }
    let with_es = format!("{tag}es");
    if surface.has_method(&with_es) {
        return Ok(with_es);
    }
    Err(PaginaError::CannotPluralize {
        tag: tag.to_string(),
    })
}

/// Whether a method name is itself already a plural form: it must end in
/// an "s"-like suffix and both it and its singularized form must be on
/// the surface. Used to avoid double-pluralizing declarations that name a
/// plural tag directly.
#[must_use]
pub fn is_plural(surface: &Surface, method: &str) -> bool {
    singular_of(surface, method).is_some()
}

/// Singular counterpart of a plural method name, when both forms exist on
/// the surface. Strips a trailing `"es"`, else a trailing `"s"`.
#[must_use]
pub fn singular_of(surface: &Surface, method: &str) -> Option<String> {
    let base = method
        .strip_suffix("es")
        .or_else(|| method.strip_suffix('s'))?;
    (surface.has_method(method) && surface.has_method(base)).then(|| base.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn surface() -> Surface {
        Surface::standard()
    }

    mod pluralize_tests {
        use super::*;

        #[test]
        fn test_pluralize_with_s() {
            assert_eq!(pluralize(&surface(), "div").unwrap(), "divs");
            assert_eq!(pluralize(&surface(), "text_field").unwrap(), "text_fields");
        }

        #[test]
        fn test_pluralize_with_es() {
            assert_eq!(pluralize(&surface(), "checkbox").unwrap(), "checkboxes");
        }

        #[test]
        fn test_pluralize_unknown_tag() {
            let err = pluralize(&surface(), "foo").unwrap_err();
            assert!(matches!(err, PaginaError::CannotPluralize { tag } if tag == "foo"));
        }
    }

    mod is_plural_tests {
        use super::*;

        #[test]
        fn test_plural_forms() {
            assert!(is_plural(&surface(), "divs"));
            assert!(is_plural(&surface(), "checkboxes"));
            assert!(is_plural(&surface(), "select_lists"));
        }

        #[test]
        fn test_singular_forms() {
            assert!(!is_plural(&surface(), "div"));
            assert!(!is_plural(&surface(), "checkbox"));
        }

        #[test]
        fn test_unknown_method() {
            assert!(!is_plural(&surface(), "foos"));
        }
    }

    mod singular_of_tests {
        use super::*;

        #[test]
        fn test_strips_s() {
            assert_eq!(singular_of(&surface(), "divs").as_deref(), Some("div"));
            assert_eq!(
                singular_of(&surface(), "textareas").as_deref(),
                Some("textarea")
            );
        }

        #[test]
        fn test_strips_es() {
            assert_eq!(
                singular_of(&surface(), "checkboxes").as_deref(),
                Some("checkbox")
            );
        }

        #[test]
        fn test_requires_both_forms_on_surface() {
            assert_eq!(singular_of(&surface(), "foos"), None);
            assert_eq!(singular_of(&surface(), "div"), None);
        }
    }
}
