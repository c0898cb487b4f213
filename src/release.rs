//! Release identifier parsing and tag mapping.
//!
//! A release is named by its bare version string ("8.3.7") and maps to the
//! upstream tag by prefixing "php-". Pre-release suffixes on the patch
//! component ("0RC1", "1beta2") are tolerated: the leading digits sort, the
//! raw string disambiguates.

use crate::errors::InstallError;

/// A parsed release identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    raw: String,
    major: u32,
    minor: u32,
    patch: u32,
}

impl Release {
    /// Parse a version string of the form `major.minor.patch[suffix]`.
    pub fn parse(raw: &str) -> Result<Release, InstallError> {
        let mut parts = raw.splitn(3, '.');
        let major = parse_component(parts.next());
        let minor = parse_component(parts.next());
        let patch = parts.next().and_then(leading_digits);
        match (major, minor, patch) {
            (Some(major), Some(minor), Some(patch)) => Ok(Release {
                raw: raw.to_string(),
                major,
                minor,
                patch,
            }),
            _ => Err(InstallError::UnknownRelease {
                target: raw.to_string(),
            }),
        }
    }

    /// The version string as given.
    pub fn raw(&self) -> &str {
        &self.raw
    }

    pub fn major(&self) -> u32 {
        self.major
    }

    pub fn minor(&self) -> u32 {
        self.minor
    }

    pub fn patch(&self) -> u32 {
        self.patch
    }

    /// The upstream tag this release builds from.
    pub fn tag(&self) -> String {
        format!("php-{}", self.raw)
    }

    /// Check that this release exists in the known tag list.
    pub fn validate(&self, known: &[String]) -> Result<(), InstallError> {
        if known.iter().any(|k| k == &self.raw) {
            Ok(())
        } else {
            Err(InstallError::UnknownRelease {
                target: self.raw.clone(),
            })
        }
    }

    /// Sort key: numeric components first, raw string as tiebreaker.
    pub fn sort_key(&self) -> (u32, u32, u32, String) {
        (self.major, self.minor, self.patch, self.raw.clone())
    }
}

fn parse_component(part: Option<&str>) -> Option<u32> {
    part.and_then(|p| p.parse().ok())
}

fn leading_digits(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

/// Sort bare version strings in ascending release order. Strings that do
/// not parse sort first, lexicographically.
pub fn sort_versions(versions: &mut [String]) {
    versions.sort_by_key(|v| match Release::parse(v) {
        Ok(r) => (1, r.sort_key()),
        Err(_) => (0, (0, 0, 0, v.clone())),
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_version() {
        let r = Release::parse("8.3.7").unwrap();
        assert_eq!(r.major(), 8);
        assert_eq!(r.minor(), 3);
        assert_eq!(r.patch(), 7);
        assert_eq!(r.raw(), "8.3.7");
    }

    #[test]
    fn parses_pre_release_suffix() {
        let r = Release::parse("8.4.0RC1").unwrap();
        assert_eq!(r.patch(), 0);
        assert_eq!(r.raw(), "8.4.0RC1");
        assert_eq!(r.tag(), "php-8.4.0RC1");
    }

    #[test]
    fn rejects_garbage() {
        assert!(Release::parse("latest").is_err());
        assert!(Release::parse("8.3").is_err());
        assert!(Release::parse("").is_err());
    }

    #[test]
    fn tag_prefixes_php() {
        let r = Release::parse("7.4.33").unwrap();
        assert_eq!(r.tag(), "php-7.4.33");
    }

    #[test]
    fn validate_accepts_known_release() {
        let known = vec!["8.3.6".to_string(), "8.3.7".to_string()];
        let r = Release::parse("8.3.7").unwrap();
        assert!(r.validate(&known).is_ok());
    }

    #[test]
    fn validate_rejects_unknown_release() {
        let known = vec!["8.3.6".to_string()];
        let r = Release::parse("9.9.9").unwrap();
        let err = r.validate(&known).unwrap_err();
        assert!(err.is_validation());
        assert!(err.to_string().contains("9.9.9"));
    }

    #[test]
    fn sort_orders_numerically_not_lexically() {
        let mut versions = vec![
            "8.10.0".to_string(),
            "8.2.0".to_string(),
            "8.9.1".to_string(),
        ];
        sort_versions(&mut versions);
        assert_eq!(versions, vec!["8.2.0", "8.9.1", "8.10.0"]);
    }

    #[test]
    fn sort_puts_rc_before_final_of_same_patch() {
        let mut versions = vec!["8.4.0".to_string(), "8.4.0RC1".to_string()];
        sort_versions(&mut versions);
        // same numeric key, raw tiebreak: "8.4.0" < "8.4.0RC1"
        assert_eq!(versions, vec!["8.4.0", "8.4.0RC1"]);
    }
}
