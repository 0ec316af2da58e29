//! Field merge rules for augment mode.

use crate::config::MergeMode;
use crate::model::cyclonedx::OrganizationalEntity;
use crate::model::spdx::PackageVerificationCode;

/// Whether a value counts as empty for merging.
pub trait Emptiness {
    fn is_empty_value(&self) -> bool;
}

impl Emptiness for String {
    fn is_empty_value(&self) -> bool {
        self.trim().is_empty()
    }
}

impl Emptiness for bool {
    fn is_empty_value(&self) -> bool {
        false
    }
}

impl Emptiness for OrganizationalEntity {
    fn is_empty_value(&self) -> bool {
        self.name.is_empty_value() && self.url.is_empty() && self.contact.is_empty()
    }
}

impl Emptiness for PackageVerificationCode {
    fn is_empty_value(&self) -> bool {
        self.package_verification_code_value.is_empty_value()
    }
}

impl<T: Emptiness> Emptiness for Option<T> {
    fn is_empty_value(&self) -> bool {
        self.as_ref().map_or(true, Emptiness::is_empty_value)
    }
}

impl<T> Emptiness for Vec<T> {
    fn is_empty_value(&self) -> bool {
        self.is_empty()
    }
}

/// Merge one field of `source` into `target` under `mode`.
///
/// `if-missing-or-empty` writes only into an empty target; `overwrite`
/// replaces the target with any non-empty source. Lists are treated as a
/// single value. Returns whether the target changed.
pub fn merge_field<T>(target: &mut T, source: &T, mode: MergeMode) -> bool
where
    T: Emptiness + Clone + PartialEq,
{
    if source.is_empty_value() {
        return false;
    }
    let write = match mode {
        MergeMode::IfMissingOrEmpty => target.is_empty_value(),
        MergeMode::Overwrite => target != source,
    };
    if write {
        target.clone_from(source);
    }
    write
}

/// Like [`merge_field`] for SPDX values, where `NOASSERTION` counts as empty.
pub fn merge_spdx_field(target: &mut Option<String>, source: &Option<String>, mode: MergeMode) -> bool {
    let unset = |v: &Option<String>| crate::model::spdx::is_unset(v.as_deref());
    if unset(source) {
        return false;
    }
    let write = match mode {
        MergeMode::IfMissingOrEmpty => unset(target),
        MergeMode::Overwrite => target != source,
    };
    if write {
        target.clone_from(source);
    }
    write
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_if_missing_keeps_existing() {
        let mut target = Some("kept".to_string());
        assert!(!merge_field(&mut target, &Some("new".to_string()), MergeMode::IfMissingOrEmpty));
        assert_eq!(target.as_deref(), Some("kept"));

        let mut blank = Some("  ".to_string());
        assert!(merge_field(&mut blank, &Some("new".to_string()), MergeMode::IfMissingOrEmpty));
        assert_eq!(blank.as_deref(), Some("new"));
    }

    #[test]
    fn test_overwrite_ignores_empty_source() {
        let mut target = Some("old".to_string());
        assert!(!merge_field(&mut target, &None, MergeMode::Overwrite));
        assert!(merge_field(&mut target, &Some("new".to_string()), MergeMode::Overwrite));
        assert_eq!(target.as_deref(), Some("new"));
    }

    #[test]
    fn test_lists_copy_only_into_empty() {
        let mut target = vec![1];
        assert!(!merge_field(&mut target, &vec![2, 3], MergeMode::IfMissingOrEmpty));
        let mut empty: Vec<i32> = Vec::new();
        assert!(merge_field(&mut empty, &vec![2, 3], MergeMode::IfMissingOrEmpty));
        assert_eq!(empty, vec![2, 3]);
    }

    #[test]
    fn test_spdx_noassertion_is_empty() {
        let mut target = Some("NOASSERTION".to_string());
        assert!(merge_spdx_field(&mut target, &Some("MIT".to_string()), MergeMode::IfMissingOrEmpty));
        assert_eq!(target.as_deref(), Some("MIT"));
        assert!(!merge_spdx_field(&mut target, &Some("NOASSERTION".to_string()), MergeMode::Overwrite));
    }
}
