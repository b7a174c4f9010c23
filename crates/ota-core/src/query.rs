//! Translate a [`SelectorSet`] into a typed record-store filter.
//!
//! The filter is a disjunction of conjunctive clauses. It is never rendered
//! into a query string here; store adapters receive the AST and bind every
//! value as a parameter.

use ota_schema::{CpuArch, PackageRecord, PayloadType, Selector, SelectorSet};

use crate::error::ResolveError;

/// Message returned when a full bundle is requested where responses are size-capped.
pub const FULL_PAYLOAD_UNAVAILABLE: &str = "'Full Payload' not available in this environment, please include the query param: payloadType=metadataOnly";

/// One AND-clause of a [`Filter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Clause {
    /// `app = <app> AND env = <env>`
    App {
        /// App id to match
        app: String,
        /// Ring to match
        env: String,
    },
    /// `deviceAttr.<name> = true AND env = <env>`
    Attr {
        /// Device attribute that must be true
        name: String,
        /// Ring to match
        env: String,
    },
}

impl Clause {
    /// Evaluate this clause against a record.
    pub fn matches(&self, record: &PackageRecord) -> bool {
        match self {
            Self::App { app, env } => record.app == *app && record.env == *env,
            Self::Attr { name, env } => record.has_attr(name) && record.env == *env,
        }
    }
}

/// OR of [`Clause`]s. Never empty: the OS image clause is always first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    clauses: Vec<Clause>,
}

impl Filter {
    /// Clauses in selector order.
    pub fn clauses(&self) -> &[Clause] {
        &self.clauses
    }

    /// Evaluate the filter in memory.
    pub fn matches(&self, record: &PackageRecord) -> bool {
        self.clauses.iter().any(|c| c.matches(record))
    }
}

/// A validated request: what to fetch and how to shape it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Record-store filter
    pub filter: Filter,
    /// Response shape
    pub payload_type: PayloadType,
}

/// Build the record-store query for `selectors`.
///
/// Checks run in a fixed order: the size policy first, so a full-payload
/// request in a size-constrained environment is always rejected with 405;
/// then `cpuArch` presence, `payloadType`, and finally attribute names.
///
/// Selector values are not restricted: they only ever travel as bound
/// parameters. Attribute names become part of a document path and must be
/// plain identifiers.
pub fn build_query(selectors: &SelectorSet, size_constrained: bool) -> Result<Query, ResolveError> {
    if size_constrained && selectors.wants_full_payload() {
        return Err(ResolveError::Unsupported(FULL_PAYLOAD_UNAVAILABLE.to_string()));
    }

    let Some(cpu_arch) = selectors.cpu_arch.as_deref() else {
        return Err(ResolveError::validation("Missing cpuArch query param"));
    };

    let payload_type: PayloadType = selectors
        .payload_type
        .parse()
        .map_err(|_| ResolveError::validation("Invalid payloadType param"))?;

    let cpu_arch: CpuArch = cpu_arch
        .parse()
        .map_err(|_| ResolveError::validation("Missing cpuArch query param"))?;
    let env = selectors.env.as_str();

    let mut clauses = Vec::with_capacity(selectors.extra.len() + 1);
    clauses.push(Clause::App {
        app: cpu_arch.os_app(),
        env: env.to_string(),
    });

    for selector in &selectors.extra {
        clauses.push(match selector {
            Selector::Attr { name, env } => {
                if !is_attr_name(name) {
                    return Err(ResolveError::validation(format!(
                        "Invalid device attribute selector: attr{name}"
                    )));
                }
                Clause::Attr {
                    name: name.clone(),
                    env: env.clone(),
                }
            }
            Selector::App { app, env } => Clause::App {
                app: app.clone(),
                env: env.clone(),
            },
        });
    }

    Ok(Query {
        filter: Filter { clauses },
        payload_type,
    })
}

/// Attribute names become part of a document path, so only `[a-z0-9_]` is allowed.
pub fn is_attr_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_')
}
