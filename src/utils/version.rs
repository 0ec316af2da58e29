//! Version comparison utilities.

use semver::Version;
use std::cmp::Ordering;

/// Compare two version strings.
///
/// Semver versions compare by semver precedence; anything else compares
/// by its dotted numeric parts (`3.10` > `3.9`), falling back to string order
/// for non-numeric parts.
#[must_use]
pub fn compare_versions(a: &str, b: &str) -> Ordering {
    if let (Ok(ver_a), Ok(ver_b)) = (Version::parse(a), Version::parse(b)) {
        return ver_a.cmp(&ver_b);
    }
    compare_dotted(a, b)
}

fn compare_dotted(a: &str, b: &str) -> Ordering {
    let mut left = a.trim().split('.');
    let mut right = b.trim().split('.');
    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (Some(_), None) => return Ordering::Greater,
            (None, Some(_)) => return Ordering::Less,
            (Some(x), Some(y)) => {
                let ordering = match (x.parse::<u64>(), y.parse::<u64>()) {
                    (Ok(nx), Ok(ny)) => nx.cmp(&ny),
                    _ => x.cmp(y),
                };
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

/// The greatest version of `versions`, ignoring empty strings.
pub fn max_version<'a, I>(versions: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    versions
        .into_iter()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .max_by(|a, b| compare_versions(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compare_versions() {
        assert_eq!(compare_versions("1.0.0", "1.0.1"), Ordering::Less);
        assert_eq!(compare_versions("1.0.1", "1.0.0"), Ordering::Greater);
        assert_eq!(compare_versions("1.0.0", "1.0.0"), Ordering::Equal);
    }

    #[test]
    fn test_dotted_license_list_versions() {
        assert_eq!(compare_versions("3.10", "3.9"), Ordering::Greater);
        assert_eq!(compare_versions("3.21", "3.21"), Ordering::Equal);
        assert_eq!(compare_versions("3.2", "3.2.1"), Ordering::Less);
    }

    #[test]
    fn test_max_version() {
        assert_eq!(max_version(["3.9", "", "3.22", "3.10"]), Some("3.22"));
        assert_eq!(max_version(Vec::<&str>::new()), None);
    }
}
