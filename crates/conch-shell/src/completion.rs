//! Line completion.
//!
//! The completer reads the catalog and the command table through the
//! lifecycle facade and never mutates either. Candidates depend on where the
//! cursor sits:
//!
//! - first word: module names and aliases (loaded or not), root-module
//!   commands and shell built-ins
//! - second word after a module: that module's commands and command aliases,
//!   or its declared command hints if it is not loaded yet
//! - a word starting with `-`: flags of the resolved command, prefix only

use std::cell::RefCell;
use std::rc::Rc;

use conch_lifecycle::{ModuleLifecycle, PostLoadHook};
use conch_matcher::{FuzzyMatcher, MatchKind, MatcherOptions};
use conch_types::config::CompletionConfig;

use crate::tokenize::{PartialLine, partial_line};

/// A completion candidate with its metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub value: String,
    pub meta: String,
}

impl Candidate {
    fn new(value: &str, meta: impl Into<String>) -> Self {
        Self {
            value: value.to_string(),
            meta: meta.into(),
        }
    }
}

/// One ranked suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub value: String,
    /// Description shown next to the value; empty when descriptions are off.
    pub meta: String,
    pub score: u32,
    /// `None` for suggestions produced by plain listing.
    pub kind: Option<MatchKind>,
}

/// Suggestions for one cursor position.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Completion {
    /// Byte offset where the word being completed starts.
    pub start: usize,
    pub suggestions: Vec<Suggestion>,
}

/// Cached first-word candidates, shared with the loader's post-load hook.
#[derive(Clone, Default)]
pub struct CompletionCache(Rc<RefCell<Option<Rc<Vec<Candidate>>>>>);

impl CompletionCache {
    pub fn invalidate(&self) {
        self.0.borrow_mut().take();
    }

    pub fn is_warm(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// A post-load hook that drops the cache.
    pub fn invalidation_hook(&self) -> PostLoadHook {
        let cache = self.clone();
        Box::new(move |name, _| {
            log::debug!("Completion cache invalidated by load of '{name}'");
            cache.invalidate();
        })
    }

    fn get_or_fill(&self, fill: impl FnOnce() -> Vec<Candidate>) -> Rc<Vec<Candidate>> {
        if let Some(cached) = self.0.borrow().as_ref() {
            return Rc::clone(cached);
        }
        let fresh = Rc::new(fill());
        *self.0.borrow_mut() = Some(Rc::clone(&fresh));
        fresh
    }
}

/// Turns a partial line into ranked suggestions.
pub struct Completer {
    enabled: bool,
    show_descriptions: bool,
    matcher: FuzzyMatcher,
    flags: FuzzyMatcher,
    builtins: Vec<Candidate>,
    cache: CompletionCache,
}

impl Default for Completer {
    fn default() -> Self {
        Self::from_config(&CompletionConfig::default())
    }
}

impl Completer {
    pub fn from_config(config: &CompletionConfig) -> Self {
        let options = MatcherOptions {
            subsequence: config.fuzzy,
            edit_distance: config.fuzzy,
            max_edit_distance: config.max_edit_distance,
            edit_distance_candidate_limit: config.edit_distance_candidate_limit,
        };
        Self {
            enabled: config.enabled,
            show_descriptions: config.show_descriptions,
            matcher: FuzzyMatcher::new(options),
            flags: FuzzyMatcher::prefix_only(),
            builtins: Vec::new(),
            cache: CompletionCache::default(),
        }
    }

    /// Offer `name` as a first-word candidate.
    pub fn add_builtin(&mut self, name: &str, description: &str) {
        self.builtins.push(Candidate::new(name, description));
        self.cache.invalidate();
    }

    pub fn cache(&self) -> &CompletionCache {
        &self.cache
    }

    /// Suggestions for `line` with the cursor at byte offset `cursor`.
    pub fn complete(&self, lifecycle: &ModuleLifecycle, line: &str, cursor: usize) -> Completion {
        if !self.enabled {
            return Completion::default();
        }
        let mut cursor = cursor.min(line.len());
        while !line.is_char_boundary(cursor) {
            cursor -= 1;
        }
        let PartialLine {
            words,
            current,
            start,
        } = partial_line(&line[..cursor]);

        let suggestions = if current.starts_with('-') {
            self.complete_flag(lifecycle, &words, &current)
        } else {
            match words.as_slice() {
                [] => {
                    let pool = self.top_level_candidates(lifecycle);
                    self.rank(&self.matcher, &current, &pool)
                },
                [module] => self.complete_command(lifecycle, module, &current),
                _ => Vec::new(),
            }
        };
        Completion { start, suggestions }
    }

    /// Every first-word candidate, sorted. This is the explicit listing
    /// path for an empty line.
    pub fn top_level(&self, lifecycle: &ModuleLifecycle) -> Vec<Suggestion> {
        let pool = self.top_level_candidates(lifecycle);
        self.list(&pool)
    }

    fn complete_command(&self, lifecycle: &ModuleLifecycle, token: &str, current: &str) -> Vec<Suggestion> {
        let Some(module) = lifecycle.resolve_module_name(token) else {
            return Vec::new();
        };
        let pool = module_candidates(lifecycle, &module);
        if current.is_empty() {
            self.list(&pool)
        } else {
            self.rank(&self.matcher, current, &pool)
        }
    }

    fn complete_flag(&self, lifecycle: &ModuleLifecycle, words: &[String], current: &str) -> Vec<Suggestion> {
        let Some(hit) = lifecycle.resolve_tokens(words) else {
            return Vec::new();
        };
        let Some(entry) = lifecycle.table().entry(&hit.module, &hit.command) else {
            return Vec::new();
        };
        let pool: Vec<Candidate> = entry
            .params
            .iter()
            .flat_map(|p| {
                p.flags()
                    .into_iter()
                    .map(|flag| Candidate::new(&flag, p.description.clone()))
            })
            .collect();
        self.rank(&self.flags, current, &pool)
    }

    fn top_level_candidates(&self, lifecycle: &ModuleLifecycle) -> Rc<Vec<Candidate>> {
        self.cache.get_or_fill(|| {
            let catalog = lifecycle.catalog();
            let table = lifecycle.table();
            let root = lifecycle.root_module();
            let mut pool = self.builtins.clone();

            for descriptor in catalog.descriptors() {
                let state = if descriptor.is_loaded() { "" } else { " (not loaded)" };
                pool.push(Candidate::new(
                    descriptor.name(),
                    format!("{}{state}", descriptor.description()),
                ));
            }
            for (alias, canonical) in catalog.aliases() {
                pool.push(Candidate::new(alias, format!("alias for {canonical}")));
            }
            for entry in table.entries(root) {
                pool.push(Candidate::new(&entry.name, entry.description.clone()));
            }
            for (alias, command) in table.command_aliases(root) {
                pool.push(Candidate::new(alias, format!("alias for {command}")));
            }
            log::debug!("Completion cache filled with {} candidate(s)", pool.len());
            pool
        })
    }

    fn rank(&self, matcher: &FuzzyMatcher, query: &str, pool: &[Candidate]) -> Vec<Suggestion> {
        matcher
            .match_candidates(query, pool.iter().map(|c| c.value.as_str()))
            .into_iter()
            .map(|m| {
                let meta = pool
                    .iter()
                    .find(|c| c.value == m.candidate)
                    .map(|c| c.meta.as_str())
                    .unwrap_or_default();
                Suggestion {
                    meta: self.meta(meta),
                    value: m.candidate,
                    score: m.score,
                    kind: Some(m.kind),
                }
            })
            .collect()
    }

    fn list(&self, pool: &[Candidate]) -> Vec<Suggestion> {
        let mut out: Vec<Suggestion> = Vec::with_capacity(pool.len());
        for c in pool {
            if out.iter().any(|s| s.value == c.value) {
                continue;
            }
            out.push(Suggestion {
                value: c.value.clone(),
                meta: self.meta(&c.meta),
                score: 0,
                kind: None,
            });
        }
        out.sort_by(|a, b| a.value.cmp(&b.value));
        out
    }

    fn meta(&self, meta: &str) -> String {
        if self.show_descriptions {
            meta.to_string()
        } else {
            String::new()
        }
    }
}

/// Commands of `module`: live entries if loaded, otherwise its hints.
fn module_candidates(lifecycle: &ModuleLifecycle, module: &str) -> Vec<Candidate> {
    let table = lifecycle.table();
    if lifecycle.is_loaded(module) {
        let mut pool: Vec<Candidate> = table
            .entries(module)
            .into_iter()
            .map(|e| Candidate::new(&e.name, e.description.clone()))
            .collect();
        pool.extend(
            table
                .command_aliases(module)
                .into_iter()
                .map(|(alias, command)| Candidate::new(alias, format!("alias for {command}"))),
        );
        return pool;
    }
    lifecycle
        .catalog()
        .get(module)
        .map(|d| {
            d.command_hints()
                .iter()
                .map(|hint| Candidate::new(hint, "(module not loaded)"))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    fn started() -> (ModuleLifecycle, Completer) {
        let (mut lc, _) = testing::lifecycle();
        let completer = Completer::default();
        lc.on_loaded(completer.cache().invalidation_hook());
        lc.start();
        (lc, completer)
    }

    fn values(c: &Completion) -> Vec<&str> {
        c.suggestions.iter().map(|s| s.value.as_str()).collect()
    }

    #[test]
    fn first_word_offers_lazy_modules_and_aliases() {
        let (lc, completer) = started();
        let c = completer.complete(&lc, "d", 1);
        assert_eq!(values(&c), vec!["database", "db"]);
        assert_eq!(c.start, 0);
        assert!(c.suggestions[0].meta.contains("not loaded"));
        assert!(!lc.is_loaded("database"));
    }

    #[test]
    fn first_word_offers_root_commands() {
        let (lc, completer) = started();
        let c = completer.complete(&lc, "ec", 2);
        assert_eq!(values(&c), vec!["echo"]);
        assert_eq!(c.suggestions[0].kind, Some(MatchKind::ExactPrefix));
    }

    #[test]
    fn empty_line_yields_nothing_but_listing_path_lists_all() {
        let (lc, completer) = started();
        assert!(completer.complete(&lc, "", 0).suggestions.is_empty());
        let all: Vec<String> = completer.top_level(&lc).into_iter().map(|s| s.value).collect();
        for name in ["core", "database", "db", "echo", "exit", "quit", "ssh"] {
            assert!(all.contains(&name.to_string()), "missing {name}");
        }
    }

    #[test]
    fn unloaded_module_uses_command_hints() {
        let (lc, completer) = started();
        let c = completer.complete(&lc, "db q", 4);
        assert_eq!(values(&c), vec!["query"]);
        assert_eq!(c.start, 3);
        assert!(!lc.is_loaded("database"));
    }

    #[test]
    fn quoted_word_start_includes_the_quote() {
        let (lc, completer) = started();
        let c = completer.complete(&lc, "db 'q", 5);
        assert_eq!(values(&c), vec!["query"]);
        assert_eq!(c.start, 3);
    }

    #[test]
    fn empty_word_after_module_lists_commands() {
        let (mut lc, completer) = started();
        lc.ensure_loaded("database").unwrap();
        let c = completer.complete(&lc, "db ", 3);
        assert_eq!(values(&c), vec!["connect", "q", "query"]);
        assert!(c.suggestions.iter().all(|s| s.kind.is_none()));
    }

    #[test]
    fn fuzzy_command_match() {
        let (mut lc, completer) = started();
        lc.ensure_loaded("ssh").unwrap();
        let c = completer.complete(&lc, "ssh cnct", 8);
        assert_eq!(values(&c), vec!["connect"]);
        assert_eq!(c.suggestions[0].kind, Some(MatchKind::Subsequence));
    }

    #[test]
    fn flag_completion_is_prefix_only() {
        let (mut lc, completer) = started();
        lc.ensure_loaded("ssh").unwrap();
        let c = completer.complete(&lc, "ssh connect host --p", 20);
        assert_eq!(values(&c), vec!["--port"]);
        assert_eq!(c.suggestions[0].meta, "Remote port");
        assert!(completer.complete(&lc, "ssh connect --prot", 18).suggestions.is_empty());
        let short = completer.complete(&lc, "ssh connect -", 13);
        assert_eq!(values(&short), vec!["--port", "--user", "-p", "-u"]);
    }

    #[test]
    fn flags_of_unknown_command_are_empty() {
        let (lc, completer) = started();
        assert!(completer.complete(&lc, "ssh connect --p", 15).suggestions.is_empty());
    }

    #[test]
    fn cursor_in_the_middle_only_sees_prefix() {
        let (lc, completer) = started();
        let c = completer.complete(&lc, "ss connect", 2);
        assert_eq!(values(&c), vec!["ssh"]);
    }

    #[test]
    fn cursor_is_clamped_to_char_boundary() {
        let (lc, completer) = started();
        let line = "dé";
        let c = completer.complete(&lc, line, 2);
        assert_eq!(c.start, 0);
        let _ = completer.complete(&lc, line, 99);
    }

    #[test]
    fn load_invalidates_cache() {
        let (mut lc, completer) = started();
        completer.complete(&lc, "s", 1);
        assert!(completer.cache().is_warm());
        lc.ensure_loaded("ssh").unwrap();
        assert!(!completer.cache().is_warm());
        let c = completer.complete(&lc, "ssh", 3);
        assert!(!c.suggestions[0].meta.contains("not loaded"));
    }

    #[test]
    fn disabled_completer_is_silent() {
        let (lc, _) = started();
        let config = CompletionConfig {
            enabled: false,
            ..CompletionConfig::default()
        };
        let completer = Completer::from_config(&config);
        assert!(completer.complete(&lc, "ss", 2).suggestions.is_empty());
    }

    #[test]
    fn descriptions_can_be_hidden() {
        let (lc, _) = started();
        let config = CompletionConfig {
            show_descriptions: false,
            ..CompletionConfig::default()
        };
        let completer = Completer::from_config(&config);
        let c = completer.complete(&lc, "db", 2);
        assert!(c.suggestions.iter().all(|s| s.meta.is_empty()));
    }

    #[test]
    fn builtins_are_first_word_candidates() {
        let (lc, mut completer) = started();
        completer.add_builtin("modules", "List modules");
        assert_eq!(values(&completer.complete(&lc, "mod", 3)), vec!["modules"]);
    }
}
