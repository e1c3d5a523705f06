use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

/// Context for a template lookup.
///
/// `val_type` carries the subject value's type and `arg_type` the type of
/// the distinguishing predicate argument, enabling different templates for
/// e.g. `size?` on a string versus an array.
#[derive(Debug, Clone, Copy)]
pub struct LookupOptions<'a> {
    pub locale: &'a str,
    pub rule: Option<&'a str>,
    pub val_type: Option<&'static str>,
    pub arg_type: Option<&'static str>,
    pub negated: bool,
}

/// A message/locale backend mapping predicate identifiers to template
/// strings. Templates are assumed pre-loaded, pure, in-memory lookups.
pub trait MessageBackend: fmt::Debug + Send + Sync {
    /// Resolve a template for `predicate`, or `None` when no mapping exists.
    fn lookup(&self, predicate: &str, opts: &LookupOptions<'_>) -> Option<String>;

    /// Display name for a rule, used by full-message mode.
    fn rule_name(&self, rule: &str, locale: &str) -> Option<String>;
}

/// In-memory message backend with per-locale overrides.
///
/// Lookup precedence, most specific first: a rule override, then the
/// predicate specialised by value and argument type, then the bare
/// predicate. Negated lookups try only `not.`-prefixed keys; falling back
/// to the positive template would invert the meaning.
#[derive(Debug, Clone, Default)]
pub struct StaticMessages {
    templates: HashMap<(String, String), String>,
    rule_names: HashMap<(String, String), String>,
}

static DEFAULT: Lazy<Arc<StaticMessages>> = Lazy::new(|| Arc::new(StaticMessages::english()));

pub(crate) fn default_messages() -> Arc<StaticMessages> {
    Arc::clone(&DEFAULT)
}

impl StaticMessages {
    /// An empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard English template set for the built-in predicates.
    #[must_use]
    pub fn english() -> Self {
        let mut m = Self::new();
        for (key, template) in [
            ("key?", "is missing"),
            ("none?", "cannot be defined"),
            ("not.none?", "must be defined"),
            ("filled?", "must be filled"),
            ("empty?", "must be empty"),
            ("not.empty?", "cannot be empty"),
            ("str?", "must be a string"),
            ("int?", "must be an integer"),
            ("float?", "must be a float"),
            ("bool?", "must be boolean"),
            ("hash?", "must be a hash"),
            ("array?", "must be an array"),
            ("eql?", "must be equal to %{left}"),
            ("not.eql?", "must not be equal to %{left}"),
            ("gt?", "must be greater than %{num}"),
            ("gteq?", "must be greater than or equal to %{num}"),
            ("lt?", "must be less than %{num}"),
            ("lteq?", "must be less than or equal to %{num}"),
            ("size?", "size must be %{size}"),
            ("size?.arg.range", "size must be within %{size_left} - %{size_right}"),
            ("size?.value.string", "length must be %{size}"),
            (
                "size?.value.string.arg.range",
                "length must be within %{size_left} - %{size_right}",
            ),
            ("min_size?", "size cannot be less than %{num}"),
            ("max_size?", "size cannot be greater than %{num}"),
            ("included_in?", "must be one of: %{list}"),
            ("not.included_in?", "must not be one of: %{list}"),
            ("excluded_from?", "must not be one of: %{list}"),
            ("format?", "is in invalid format"),
            ("odd?", "must be odd"),
            ("even?", "must be even"),
        ] {
            m.add("en", key, template);
        }
        m
    }

    /// Register a template under a locale. Keys follow the
    /// `predicate[.value.<type>][.arg.<type>]` scheme, `not.`-prefixed for
    /// negated lookups, or `rules.<rule>` for rule overrides.
    pub fn add(&mut self, locale: &str, key: &str, template: &str) {
        self.templates
            .insert((locale.to_owned(), key.to_owned()), template.to_owned());
    }

    /// Register a display name for a rule, used by full-message mode.
    pub fn add_rule_name(&mut self, locale: &str, rule: &str, display: &str) {
        self.rule_names
            .insert((locale.to_owned(), rule.to_owned()), display.to_owned());
    }

    fn get(&self, locale: &str, key: &str) -> Option<&String> {
        self.templates.get(&(locale.to_owned(), key.to_owned()))
    }

    fn candidates(predicate: &str, opts: &LookupOptions<'_>) -> Vec<String> {
        let mut keys = Vec::new();
        if let Some(rule) = opts.rule {
            keys.push(format!("rules.{rule}"));
        }
        let base = if opts.negated {
            format!("not.{predicate}")
        } else {
            predicate.to_owned()
        };
        if let (Some(v), Some(a)) = (opts.val_type, opts.arg_type) {
            keys.push(format!("{base}.value.{v}.arg.{a}"));
        }
        if let Some(v) = opts.val_type {
            keys.push(format!("{base}.value.{v}"));
        }
        if let Some(a) = opts.arg_type {
            keys.push(format!("{base}.arg.{a}"));
        }
        keys.push(base);
        keys
    }
}

impl MessageBackend for StaticMessages {
    fn lookup(&self, predicate: &str, opts: &LookupOptions<'_>) -> Option<String> {
        let candidates = Self::candidates(predicate, opts);
        for key in &candidates {
            if let Some(t) = self.get(opts.locale, key) {
                return Some(t.clone());
            }
        }
        if opts.locale != "en" {
            for key in &candidates {
                if let Some(t) = self.get("en", key) {
                    return Some(t.clone());
                }
            }
        }
        None
    }

    fn rule_name(&self, rule: &str, locale: &str) -> Option<String> {
        self.rule_names
            .get(&(locale.to_owned(), rule.to_owned()))
            .or_else(|| self.rule_names.get(&("en".to_owned(), rule.to_owned())))
            .cloned()
    }
}
