// Regex gate: one pattern pre-filter that also exposes its capture groups
// to handler parameters.
//
// The filter runs the pattern over text extracted from the message chain
// and memoises an owned snapshot of the match in the context's scratch
// map, under a key unique to this gate. The resolvers added for the named
// capture groups (and the optional whole-match parameter) read that
// snapshot, so the pattern runs exactly once per dispatch even when a
// handler takes several captured parameters.

use std::collections::HashMap;
use std::sync::Arc;

use regex::Regex;

use crate::entities::MessageChain;
use crate::error::{Error, Result};
use crate::framework::context::{ContextView, MemoKey};
use crate::framework::handler::{ArgValue, Filter, Resolver};

#[derive(Clone, Copy, Debug)]
enum RegexOp {
    /// Match anchored at the start of the text
    Match,
    /// Match anywhere in the text
    Search,
    /// Match spanning the whole text
    Fullmatch,
}

/// An owned snapshot of one successful regex application.
#[derive(Debug, Clone)]
pub struct RegexMatch {
    text: String,
    start: usize,
    end: usize,
    groups: HashMap<String, Option<String>>,
}

impl RegexMatch {
    /// The text the pattern was applied to.
    pub fn text(&self) -> &str {
        &self.text
    }

    /// The matched substring.
    pub fn as_str(&self) -> &str {
        &self.text[self.start..self.end]
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    /// What the named group captured, if it participated in the match.
    pub fn group(&self, name: &str) -> Option<&str> {
        self.groups.get(name).and_then(|g| g.as_deref())
    }
}

type Extractor = Arc<dyn Fn(&MessageChain) -> String + Send + Sync>;

/// A compiled pattern plus the pieces it attaches to a handler: the filter
/// and the capture-group resolvers. Built by [`regex_match`],
/// [`regex_search`] or [`regex_fullmatch`].
#[derive(Clone)]
pub struct RegexGate {
    regex: Arc<Regex>,
    op: RegexOp,
    extractor: Extractor,
    key: MemoKey,
    match_param: Option<String>,
}

/// Gate that passes iff the pattern matches at the start of the text.
pub fn regex_match(pattern: &str) -> Result<RegexGate> {
    RegexGate::compile(pattern, RegexOp::Match)
}

/// Gate that passes iff the pattern matches anywhere in the text.
pub fn regex_search(pattern: &str) -> Result<RegexGate> {
    RegexGate::compile(pattern, RegexOp::Search)
}

/// Gate that passes iff the pattern matches the whole text.
pub fn regex_fullmatch(pattern: &str) -> Result<RegexGate> {
    RegexGate::compile(pattern, RegexOp::Fullmatch)
}

impl RegexGate {
    fn compile(pattern: &str, op: RegexOp) -> Result<Self> {
        let regex = Regex::new(pattern)
            .map_err(|e| Error::Contract(format!("invalid regex pattern: {e}")))?;
        Ok(Self {
            regex: Arc::new(regex),
            op,
            extractor: Arc::new(|chain: &MessageChain| chain.to_string()),
            key: MemoKey::unique(),
            match_param: None,
        })
    }

    /// Replaces the default text extraction (chain stringification).
    pub fn extractor<F>(mut self, extractor: F) -> Self
    where
        F: Fn(&MessageChain) -> String + Send + Sync + 'static,
    {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Also binds the whole [`RegexMatch`] to the named parameter.
    pub fn bind_match(mut self, name: impl Into<String>) -> Self {
        self.match_param = Some(name.into());
        self
    }

    fn apply(&self, text: &str) -> Option<RegexMatch> {
        let captures = self.regex.captures(text)?;
        let full = captures.get(0).expect("group 0 always participates");
        match self.op {
            RegexOp::Search => {}
            RegexOp::Match => {
                if full.start() != 0 {
                    return None;
                }
            }
            RegexOp::Fullmatch => {
                if full.start() != 0 || full.end() != text.len() {
                    return None;
                }
            }
        }
        let groups = self
            .regex
            .capture_names()
            .flatten()
            .map(|name| {
                let captured = captures.name(name).map(|m| m.as_str().to_string());
                (name.to_string(), captured)
            })
            .collect();
        Some(RegexMatch {
            text: text.to_string(),
            start: full.start(),
            end: full.end(),
            groups,
        })
    }

    /// Appends the gate's filter and resolvers to a handler under
    /// construction.
    pub(crate) fn attach<C>(
        self,
        filters: &mut Vec<Filter<C>>,
        resolvers: &mut Vec<(String, Resolver<C>)>,
    ) where
        C: ContextView + 'static,
    {
        let key = self.key;

        // The group name must be captured by value: the closure outlives
        // this loop.
        for name in self.regex.capture_names().flatten() {
            let name = name.to_string();
            let group = name.clone();
            let resolver: Resolver<C> = Arc::new(move |context: Arc<C>| {
                let out = memoised(&context, key).and_then(|m| {
                    m.group(&group).map(|s| Box::new(s.to_string()) as ArgValue).ok_or_else(
                        || {
                            Error::Resolve(format!(
                                "capture group '{group}' did not participate in the match"
                            ))
                        },
                    )
                });
                Box::pin(async move { out })
            });
            resolvers.push((name, resolver));
        }

        if let Some(name) = self.match_param.clone() {
            let resolver: Resolver<C> = Arc::new(move |context: Arc<C>| {
                let out =
                    memoised(&context, key).map(|m| Box::new(m.as_ref().clone()) as ArgValue);
                Box::pin(async move { out })
            });
            resolvers.push((name, resolver));
        }

        let gate = self;
        let filter: Filter<C> = Arc::new(move |context: Arc<C>| {
            let out = (|| {
                let chain = context.message_chain()?;
                let text = (gate.extractor)(&chain);
                match gate.apply(&text) {
                    Some(found) => {
                        context.scratch().insert(gate.key, found);
                        Ok(true)
                    }
                    None => Ok(false),
                }
            })();
            Box::pin(async move { out })
        });
        filters.push(filter);
    }
}

fn memoised<C: ContextView>(context: &Arc<C>, key: MemoKey) -> Result<Arc<RegexMatch>> {
    context
        .scratch()
        .get::<RegexMatch>(key)
        .ok_or_else(|| Error::Resolve("regex match was not memoised for this context".into()))
}
