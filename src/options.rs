//! Configure flag composition.
//!
//! Option sets are layered: baked-in defaults, then per-variant overrides,
//! then pinned prefix bindings that always serialize last so nothing can
//! shadow the install prefix. Tokens keep insertion order; removal and
//! replacement match on the flag name prefix, so `--with-openssl` matches
//! `--with-openssl=/usr` too.

/// A single configure flag, split at the first `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionToken {
    pub name: String,
    pub value: Option<String>,
}

impl OptionToken {
    /// Split a raw token into name and optional value at the first `=`.
    pub fn parse(raw: &str) -> OptionToken {
        match raw.split_once('=') {
            Some((name, value)) => OptionToken {
                name: name.to_string(),
                value: Some(value.to_string()),
            },
            None => OptionToken {
                name: raw.to_string(),
                value: None,
            },
        }
    }

    /// Render back to the `name[=value]` form passed to configure.
    pub fn render(&self) -> String {
        match &self.value {
            Some(value) => format!("{}={}", self.name, value),
            None => self.name.clone(),
        }
    }
}

/// An ordered set of configure flags plus pinned trailing bindings.
#[derive(Debug, Clone, Default)]
pub struct ConfigureOptionSet {
    tokens: Vec<OptionToken>,
    pinned: Vec<OptionToken>,
}

impl ConfigureOptionSet {
    pub fn new() -> ConfigureOptionSet {
        ConfigureOptionSet::default()
    }

    /// Append a flag if its name is not already present.
    pub fn add(&mut self, raw: &str) {
        let token = OptionToken::parse(raw);
        if !self.tokens.iter().any(|t| t.name == token.name) {
            self.tokens.push(token);
        }
    }

    /// Append a `name=value` flag, replacing any existing value for the name.
    pub fn add_value(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.tokens.iter_mut().find(|t| t.name == name) {
            existing.value = Some(value.to_string());
        } else {
            self.tokens.push(OptionToken {
                name: name.to_string(),
                value: Some(value.to_string()),
            });
        }
    }

    /// Remove every flag whose name starts with `prefix`.
    pub fn remove(&mut self, prefix: &str) {
        self.tokens.retain(|t| !t.name.starts_with(prefix));
    }

    /// Replace the first flag whose name starts with `prefix`, in place.
    ///
    /// Later matches are dropped. With no match the replacement appends,
    /// so replace degenerates to add on an empty set.
    pub fn replace(&mut self, prefix: &str, raw: &str) {
        let replacement = OptionToken::parse(raw);
        match self.tokens.iter().position(|t| t.name.starts_with(prefix)) {
            Some(first) => {
                self.tokens[first] = replacement;
                let mut index = 0;
                self.tokens.retain(|t| {
                    let keep = index == first || !t.name.starts_with(prefix);
                    index += 1;
                    keep
                });
            }
            None => self.tokens.push(replacement),
        }
    }

    /// Pin a binding that always serializes after the regular flags.
    pub fn pin(&mut self, name: &str, value: &str) {
        if let Some(existing) = self.pinned.iter_mut().find(|t| t.name == name) {
            existing.value = Some(value.to_string());
        } else {
            self.pinned.push(OptionToken {
                name: name.to_string(),
                value: Some(value.to_string()),
            });
        }
    }

    /// True when neither flags nor pins are set.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty() && self.pinned.is_empty()
    }

    /// Render the full argument list: insertion order, pins last.
    pub fn to_args(&self) -> Vec<String> {
        self.tokens
            .iter()
            .chain(self.pinned.iter())
            .map(OptionToken::render)
            .collect()
    }
}

/// Layer default flags, variant overrides, and the prefix bindings into
/// one option set.
pub fn compose(defaults: &[String], variant: &[String], prefix: &std::path::Path) -> ConfigureOptionSet {
    let mut set = ConfigureOptionSet::new();
    for raw in defaults {
        set.add(raw);
    }
    for raw in variant {
        let token = OptionToken::parse(raw);
        set.replace(&token.name, raw);
    }
    let prefix = prefix.display().to_string();
    set.pin("--with-config-file-path", &format!("{prefix}/etc"));
    set.pin("--with-config-file-scan-dir", &format!("{prefix}/etc/conf.d"));
    set.pin("--prefix", &prefix);
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn parse_splits_at_first_equals() {
        let t = OptionToken::parse("--with-config-file-path=/usr/local/etc");
        assert_eq!(t.name, "--with-config-file-path");
        assert_eq!(t.value.as_deref(), Some("/usr/local/etc"));

        let t = OptionToken::parse("CFLAGS=-O2 -g=x");
        assert_eq!(t.name, "CFLAGS");
        assert_eq!(t.value.as_deref(), Some("-O2 -g=x"));
    }

    #[test]
    fn parse_bare_flag_has_no_value() {
        let t = OptionToken::parse("--enable-mbstring");
        assert_eq!(t.name, "--enable-mbstring");
        assert_eq!(t.value, None);
    }

    #[test]
    fn add_preserves_insertion_order_and_dedupes() {
        let mut set = ConfigureOptionSet::new();
        set.add("--enable-mbstring");
        set.add("--with-zlib");
        set.add("--enable-mbstring");
        assert_eq!(set.to_args(), vec!["--enable-mbstring", "--with-zlib"]);
    }

    #[test]
    fn add_value_overwrites_existing_value_in_place() {
        let mut set = ConfigureOptionSet::new();
        set.add("--with-openssl=/usr");
        set.add("--with-zlib");
        set.add_value("--with-openssl", "/opt/ssl");
        assert_eq!(set.to_args(), vec!["--with-openssl=/opt/ssl", "--with-zlib"]);
    }

    #[test]
    fn remove_matches_name_regardless_of_value() {
        let mut set = ConfigureOptionSet::new();
        set.add("--with-openssl=/usr");
        set.add("--with-zlib");
        set.remove("--with-openssl");
        assert_eq!(set.to_args(), vec!["--with-zlib"]);
    }

    #[test]
    fn remove_drops_every_prefix_match() {
        let mut set = ConfigureOptionSet::new();
        set.add("--with-mysql=/usr");
        set.add("--with-zlib");
        set.add("--with-mysqli");
        set.remove("--with-mysql");
        assert_eq!(set.to_args(), vec!["--with-zlib"]);
    }

    #[test]
    fn replace_keeps_first_match_position() {
        let mut set = ConfigureOptionSet::new();
        set.add("--with-openssl=/usr");
        set.add("--with-zlib");
        set.add("--enable-soap");
        set.replace("--with-openssl", "--with-openssl=/opt/ssl");
        assert_eq!(
            set.to_args(),
            vec!["--with-openssl=/opt/ssl", "--with-zlib", "--enable-soap"]
        );
    }

    #[test]
    fn replace_drops_later_duplicates() {
        let mut set = ConfigureOptionSet::new();
        set.add("--with-mysql=/usr");
        set.add("--with-zlib");
        set.add("--with-mysqli");
        set.replace("--with-mysql", "--with-mysqlnd");
        assert_eq!(set.to_args(), vec!["--with-mysqlnd", "--with-zlib"]);
    }

    #[test]
    fn replace_without_match_appends() {
        let mut set = ConfigureOptionSet::new();
        set.add("--with-zlib");
        set.replace("--enable-pcntl", "--enable-pcntl");
        assert_eq!(set.to_args(), vec!["--with-zlib", "--enable-pcntl"]);
    }

    #[test]
    fn pins_serialize_last_in_pin_order() {
        let mut set = ConfigureOptionSet::new();
        set.add("--enable-mbstring");
        set.pin("--prefix", "/opt/php");
        set.add("--with-zlib");
        assert_eq!(
            set.to_args(),
            vec!["--enable-mbstring", "--with-zlib", "--prefix=/opt/php"]
        );
    }

    #[test]
    fn compose_layers_defaults_variant_and_prefix_pins() {
        let defaults = vec![
            "--enable-mbstring".to_string(),
            "--with-openssl=/usr".to_string(),
        ];
        let variant = vec!["--with-openssl=/opt/ssl".to_string(), "--enable-debug".to_string()];
        let set = compose(&defaults, &variant, Path::new("/opt/php/8.3.7"));
        assert_eq!(
            set.to_args(),
            vec![
                "--enable-mbstring",
                "--with-openssl=/opt/ssl",
                "--enable-debug",
                "--with-config-file-path=/opt/php/8.3.7/etc",
                "--with-config-file-scan-dir=/opt/php/8.3.7/etc/conf.d",
                "--prefix=/opt/php/8.3.7",
            ]
        );
    }

    #[test]
    fn empty_set_renders_no_args() {
        let set = ConfigureOptionSet::new();
        assert!(set.is_empty());
        assert!(set.to_args().is_empty());
    }
}
