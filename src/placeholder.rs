//! Two-phase rendering of pages holding per-user links
//!
//! A `PageShell` mixes markup with `LazyLinkSet` holes. Turning it into a
//! `CachedPage` replaces each hole with a marker that depends only on the
//! action and its parameters, so the cached markup is the same for every
//! user. Holes are filled per account when the page is served.
use crate::{
    account::Account,
    error::Result,
    parameter::RouteParameters,
    service::ActionLinkService,
    utils::unique_css_identifier,
};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LazyLinkSet {
    pub action_id: String,
    pub link_style: Option<String>,
    pub parameters: RouteParameters,
}

impl LazyLinkSet {
    pub fn new(action_id: &str, parameters: RouteParameters) -> Self {
        Self {
            action_id: action_id.to_string(),
            link_style: None,
            parameters,
        }
    }

    pub fn with_link_style(mut self, link_style: &str) -> Self {
        self.link_style = Some(link_style.to_string());
        self
    }

    /// Comment marker standing in for the link set. Distinct link sets
    /// never share a marker.
    pub fn marker(&self) -> String {
        let id = unique_css_identifier(
            [
                "action-link-placeholder",
                self.action_id.as_str(),
                self.link_style.as_deref().unwrap_or_default(),
            ]
            .into_iter()
            .chain(self.parameters.values()),
        );
        format!("<!--{id}-->")
    }

    /// Markup of the link set as `account` sees it.
    pub fn render(&self, service: &ActionLinkService, account: &Account) -> Result<String> {
        let mut definition = service.load_definition(&self.action_id)?;
        if let Some(style) = &self.link_style {
            definition = definition.with_link_style(style);
        }
        Ok(service
            .build_from_route(&definition, account, &self.parameters)?
            .render())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Markup(String),
    Hole(LazyLinkSet),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageShell {
    segments: Vec<Segment>,
}

impl PageShell {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn markup(mut self, markup: &str) -> Self {
        self.segments.push(Segment::Markup(markup.to_string()));
        self
    }

    pub fn hole(mut self, links: LazyLinkSet) -> Self {
        self.segments.push(Segment::Hole(links));
        self
    }

    pub fn into_cached(self) -> CachedPage {
        let mut markup = String::new();
        let mut holes: Vec<LazyLinkSet> = Vec::new();
        for segment in self.segments {
            match segment {
                Segment::Markup(text) => markup.push_str(&text),
                Segment::Hole(links) => {
                    markup.push_str(&links.marker());
                    if !holes.contains(&links) {
                        holes.push(links);
                    }
                }
            }
        }
        CachedPage { markup, holes }
    }
}

/// User independent page markup with unresolved link holes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedPage {
    markup: String,
    holes: Vec<LazyLinkSet>,
}

impl CachedPage {
    pub fn markup(&self) -> &str {
        &self.markup
    }

    pub fn holes(&self) -> &[LazyLinkSet] {
        &self.holes
    }

    /// Fill every hole for `account`. A hole that cannot be built renders
    /// empty instead of failing the page.
    pub fn resolve(&self, service: &ActionLinkService, account: &Account) -> String {
        let mut out = self.markup.clone();
        for hole in &self.holes {
            let html = hole.render(service, account).unwrap_or_else(|err| {
                tracing::warn!(action = %hole.action_id, error = %err, "placeholder left empty");
                String::new()
            });
            out = out.replace(&hole.marker(), &html);
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct PageCache {
    pages: HashMap<String, CachedPage>,
}

impl PageCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&CachedPage> {
        self.pages.get(key)
    }

    pub fn get_or_insert_with(&mut self, key: &str, shell: impl FnOnce() -> PageShell) -> &CachedPage {
        self.pages
            .entry(key.to_string())
            .or_insert_with(|| shell().into_cached())
    }

    pub fn invalidate(&mut self, key: &str) -> bool {
        self.pages.remove(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}
