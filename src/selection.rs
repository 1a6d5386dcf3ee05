//! Taxon selection by regular expression.
//!
//! The pattern has to match at the start of a leaf name, so `Homo` selects
//! `Homo_sapiens` but not `Pan_Homo`. Use `.*Homo` for a search anywhere in
//! the name or `Homo$`-style anchors for exact matches.

use crate::error::Result;
use regex::Regex;
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct TaxonSelector {
    pattern: String,
    regex: Regex,
}

impl TaxonSelector {
    /// Compile `pattern`, anchored at the start of the name.
    ///
    /// # Errors
    /// `Error::Pattern` if the expression does not compile.
    pub fn new(pattern: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{pattern})"))?;
        Ok(TaxonSelector {
            pattern: pattern.to_string(),
            regex,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn matches(&self, name: &str) -> bool {
        self.regex.is_match(name)
    }

    /// The names in `leaves` selected by the pattern.
    ///
    /// ```
    /// use rust_python_subset_support::selection::TaxonSelector;
    ///
    /// let selector = TaxonSelector::new("Homo|Pan").unwrap();
    /// let leaves = ["Homo_sapiens", "Pan_troglodytes", "Gorilla_gorilla"];
    /// let selected = selector.select(leaves.iter().copied());
    /// assert_eq!(selected.len(), 2);
    /// ```
    pub fn select<'a>(&self, leaves: impl IntoIterator<Item = &'a str>) -> BTreeSet<String> {
        leaves
            .into_iter()
            .filter(|name| self.matches(name))
            .map(str::to_string)
            .collect()
    }
}
