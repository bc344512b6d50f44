//! Version layers and the chains they form.
//!
//! A [`VersionLayer`] is everything one bytecode version contributes: the text of its delta,
//! the version it extends, and the triggers it adds. A [`VersionChain`] holds the layers and
//! builds the grammar for any version by composing from the root down.
//!
//! Each layer parses its delta at most once and builds its grammar at most once. Both are
//! cached on the layer, so a chain can be shared between threads and asked for the same
//! version over and over.

use crate::engine::{parse_stream, ParseEngine};
use crate::errors::{GrammarError, ParseError, Result};
use crate::reader::{read_delta, Delta};
use crate::synth::{SynthesisSession, Synthesizer, Trigger};
use crate::{Grammar, Instruction, Symbol};
use log::debug;
use once_cell::sync::OnceCell;
use std::borrow::Cow;
use std::collections::HashMap;
use std::sync::Arc;

pub struct VersionLayer {
    version: String,
    parent: Option<String>,
    delta_text: Cow<'static, str>,
    triggers: Vec<Trigger>,
    start: Option<Symbol>,
    extra_vocabulary: Vec<String>,

    delta: OnceCell<Delta>,
    built: OnceCell<Arc<Grammar>>,
}

impl VersionLayer {
    /// A root layer. Use [`extends`](Self::extends) to give it a parent.
    pub fn new(version: &str, delta_text: impl Into<Cow<'static, str>>) -> Self {
        Self {
            version: version.to_string(),
            parent: None,
            delta_text: delta_text.into(),
            triggers: Vec::new(),
            start: None,
            extra_vocabulary: Vec::new(),
            delta: OnceCell::new(),
            built: OnceCell::new(),
        }
    }

    pub fn extends(mut self, parent: &str) -> Self {
        self.parent = Some(parent.to_string());
        self
    }

    pub fn with_triggers(mut self, triggers: Vec<Trigger>) -> Self {
        self.triggers = triggers;
        self
    }

    /// Sets the start symbol for this version and the versions built on it.
    pub fn with_start(mut self, start: &str) -> Self {
        self.start = Some(Symbol::new(start));
        self
    }

    /// Terminal names this version uses that are not real instruction kinds, such as the
    /// pseudo-instructions a disassembler inserts. They count as known vocabulary.
    pub fn with_extra_vocabulary(mut self, names: &[&str]) -> Self {
        self.extra_vocabulary = names.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn parent(&self) -> Option<&str> {
        self.parent.as_deref()
    }

    pub fn delta_text(&self) -> &str {
        &self.delta_text
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    pub fn extra_vocabulary(&self) -> &[String] {
        &self.extra_vocabulary
    }

    /// The parsed delta. Parsed on first use; a failed parse is not cached.
    pub fn delta(&self) -> Result<&Delta> {
        self.delta.get_or_try_init(|| {
            debug!("reading delta for version {}", self.version);
            read_delta(&self.delta_text)
        })
    }

    fn build(&self, base: Option<&Arc<Grammar>>) -> Result<Grammar> {
        let delta = self.delta()?;
        let grammar = match base {
            Some(base) => Grammar::compose_delta(base, self.version.as_str(), delta),
            None => Grammar::from_delta(self.version.as_str(), delta),
        };
        Ok(match &self.start {
            Some(start) => grammar.with_start(start.clone()),
            None => grammar,
        })
    }
}

#[derive(Default)]
pub struct VersionChain {
    layers: HashMap<String, VersionLayer>,
}

impl VersionChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a layer, replacing any earlier layer for the same version. Grammars already built
    /// by this chain are dropped, since a replaced layer changes its descendants too.
    pub fn register(&mut self, layer: VersionLayer) -> &mut Self {
        debug!(
            "registering version {} (extends {:?})",
            layer.version, layer.parent
        );
        for existing in self.layers.values_mut() {
            existing.built = OnceCell::new();
        }
        self.layers.insert(layer.version.clone(), layer);
        self
    }

    pub fn layer(&self, version: &str) -> Result<&VersionLayer> {
        self.layers
            .get(version)
            .ok_or_else(|| GrammarError::UnknownVersion(version.to_string()))
    }

    pub fn versions(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(|k| k.as_str())
    }

    /// The layers from the root down to `version`.
    pub fn lineage(&self, version: &str) -> Result<Vec<&VersionLayer>> {
        let mut lineage = Vec::new();
        let mut next = Some(version);
        while let Some(v) = next {
            let layer = self.layer(v)?;
            if lineage.iter().any(|l: &&VersionLayer| l.version == layer.version) {
                return Err(GrammarError::VersionCycle(layer.version.clone()));
            }
            lineage.push(layer);
            next = layer.parent.as_deref();
        }
        lineage.reverse();
        Ok(lineage)
    }

    /// The grammar for `version`: the union of the deltas from the root through `version`.
    pub fn grammar(&self, version: &str) -> Result<Arc<Grammar>> {
        let mut base: Option<Arc<Grammar>> = None;
        for layer in self.lineage(version)? {
            let built = layer
                .built
                .get_or_try_init(|| layer.build(base.as_ref()).map(Arc::new))?;
            base = Some(Arc::clone(built));
        }
        // lineage() is never empty when it succeeds
        base.ok_or_else(|| GrammarError::UnknownVersion(version.to_string()))
    }

    /// The triggers for `version`, its own ahead of its ancestors'.
    pub fn synthesizer(&self, version: &str) -> Result<Synthesizer> {
        let mut synthesizer = Synthesizer::default();
        for layer in self.lineage(version)? {
            synthesizer = Synthesizer::layered(&layer.triggers, &synthesizer);
        }
        Ok(synthesizer)
    }

    /// A fresh synthesis session over the grammar for `version`.
    pub fn session(&self, version: &str) -> Result<SynthesisSession> {
        Ok(SynthesisSession::new(
            self.grammar(version)?,
            self.synthesizer(version)?,
        ))
    }

    /// Extra vocabulary from `version` and all of its ancestors.
    pub fn extra_vocabulary(&self, version: &str) -> Result<Vec<&str>> {
        Ok(self
            .lineage(version)?
            .into_iter()
            .flat_map(|l| l.extra_vocabulary.iter().map(|s| s.as_str()))
            .collect())
    }

    /// Builds the grammar for `version`, synthesizes the rules `tokens` needs, and hands both
    /// to `engine`.
    pub fn parse<E: ParseEngine>(
        &self,
        version: &str,
        tokens: &[Instruction],
        engine: &E,
    ) -> core::result::Result<E::Tree, ParseError> {
        let grammar = self.grammar(version)?;
        let synthesizer = self.synthesizer(version)?;
        parse_stream(&grammar, &synthesizer, tokens, engine)
    }
}
