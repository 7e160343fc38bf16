//! Ordering expressions for hooks within one category.
//!
//! An ordering expression is a comma-separated list of hook names with at
//! most one `*` wildcard, e.g. `"uid-unique, referential-integrity, *, audit"`.
//! Names before the wildcard run first, in the listed order; names after it
//! run last, in the listed order; every other hook runs in between, in the
//! order it was registered. Names are compared case-insensitively.
//!
//! Malformed expressions never fail. Problems are reported as
//! [`OrderDiagnostic`]s and the expression is applied on a best-effort basis.

use std::fmt;

/// Problems found while parsing an ordering expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrderDiagnostic {
    /// An element between two commas was empty.
    EmptyElement,
    /// More than one `*` was present; all but the first are ignored.
    MultipleWildcards,
    /// A name was listed more than once; only its first position counts.
    DuplicateName(String),
    /// No `*` was present; hooks not named in the expression run last.
    MissingWildcard,
}

impl fmt::Display for OrderDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyElement => write!(f, "the order contains an empty element"),
            Self::MultipleWildcards => write!(f, "the order contains more than one wildcard"),
            Self::DuplicateName(name) => write!(f, "'{name}' is listed more than once"),
            Self::MissingWildcard => write!(f, "the order does not contain a wildcard"),
        }
    }
}

/// Where a hook name falls in an ordering expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Named before the wildcard, at this rank.
    Initial(usize),
    /// Not named.
    Unordered,
    /// Named after the wildcard, at this rank.
    Final(usize),
}

/// A parsed ordering expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    initial: Vec<String>,
    wildcard: bool,
    final_names: Vec<String>,
}

/// Result of parsing an ordering expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedOrder {
    /// The effective ordering.
    pub spec: OrderSpec,
    /// Problems found in the expression.
    pub diagnostics: Vec<OrderDiagnostic>,
}

impl Default for OrderSpec {
    fn default() -> Self {
        Self::arrival()
    }
}

impl OrderSpec {
    /// Ordering that keeps hooks in registration order.
    pub fn arrival() -> Self {
        Self {
            initial: Vec::new(),
            wildcard: true,
            final_names: Vec::new(),
        }
    }

    /// Parses an ordering expression.
    pub fn parse(raw: &str) -> ParsedOrder {
        let raw = raw.trim();
        if raw.is_empty() || raw == "*" {
            return ParsedOrder {
                spec: Self::arrival(),
                diagnostics: Vec::new(),
            };
        }

        let mut spec = Self {
            initial: Vec::new(),
            wildcard: false,
            final_names: Vec::new(),
        };
        let mut diagnostics = Vec::new();

        for token in raw.split(',').map(str::trim) {
            if token.is_empty() {
                if !diagnostics.contains(&OrderDiagnostic::EmptyElement) {
                    diagnostics.push(OrderDiagnostic::EmptyElement);
                }
                continue;
            }

            if token == "*" {
                if spec.wildcard {
                    if !diagnostics.contains(&OrderDiagnostic::MultipleWildcards) {
                        diagnostics.push(OrderDiagnostic::MultipleWildcards);
                    }
                } else {
                    spec.wildcard = true;
                }
                continue;
            }

            let name = token.to_lowercase();
            if spec.classify(&name) != Placement::Unordered {
                diagnostics.push(OrderDiagnostic::DuplicateName(token.to_string()));
                continue;
            }

            if spec.wildcard {
                spec.final_names.push(name);
            } else {
                spec.initial.push(name);
            }
        }

        if !spec.wildcard {
            diagnostics.push(OrderDiagnostic::MissingWildcard);
        }

        ParsedOrder { spec, diagnostics }
    }

    /// Names that run first, lower-cased, in order.
    pub fn initial(&self) -> &[String] {
        &self.initial
    }

    /// Names that run last, lower-cased, in order.
    pub fn final_names(&self) -> &[String] {
        &self.final_names
    }

    /// Whether the expression contained a wildcard.
    pub fn has_wildcard(&self) -> bool {
        self.wildcard
    }

    /// Whether the expression imposes no ordering at all.
    pub fn is_arrival(&self) -> bool {
        self.initial.is_empty() && self.final_names.is_empty()
    }

    /// Classifies a lower-cased hook name.
    pub fn classify(&self, name: &str) -> Placement {
        if let Some(rank) = self.initial.iter().position(|n| n == name) {
            Placement::Initial(rank)
        } else if let Some(rank) = self.final_names.iter().position(|n| n == name) {
            Placement::Final(rank)
        } else {
            Placement::Unordered
        }
    }

    /// Arranges items by this ordering without mutating the input.
    ///
    /// `name_of` yields the lower-cased order name of an item. Initial items
    /// come first by rank, unordered items keep their relative input order,
    /// final items come last by rank. Items sharing a name keep their input
    /// order within their slot.
    pub fn arrange<T, F>(&self, items: &[T], name_of: F) -> Vec<T>
    where
        T: Clone,
        F: Fn(&T) -> &str,
    {
        if self.is_arrival() {
            return items.to_vec();
        }

        let mut initial: Vec<(usize, T)> = Vec::new();
        let mut unordered: Vec<T> = Vec::new();
        let mut last: Vec<(usize, T)> = Vec::new();

        for item in items {
            match self.classify(name_of(item)) {
                Placement::Initial(rank) => initial.push((rank, item.clone())),
                Placement::Unordered => unordered.push(item.clone()),
                Placement::Final(rank) => last.push((rank, item.clone())),
            }
        }

        // Stable sorts keep arrival order among equal ranks.
        initial.sort_by_key(|(rank, _)| *rank);
        last.sort_by_key(|(rank, _)| *rank);

        initial
            .into_iter()
            .map(|(_, item)| item)
            .chain(unordered)
            .chain(last.into_iter().map(|(_, item)| item))
            .collect()
    }
}
