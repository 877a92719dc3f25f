//! Cell and hardware identity carried in a `measObjLdn` distinguished name.
//!
//! A DN looks like `ME-Id=DU-at2200-eab86b009f5d-1,Cell=1`: comma separated
//! `key=value` pairs with a `Cell=<id>` token and, on some exporters, a
//! hardware serial embedded as `-eab85c<hex>-`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

static CELL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Cell=([^,]+)").expect("cell token pattern is valid"));
static SERIAL_TOKEN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-eab85c[0-9a-fA-F]+-").expect("serial token pattern is valid"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentity {
    /// `Cell<N>`, or the raw DN when it carries no `Cell=` token.
    pub cell_id: String,
    pub serial: Option<String>,
}

/// `Cell=7` -> `Cell7`; a DN without the token is returned unmodified.
pub fn parse_cell_id(object_dn: &str) -> String {
    match CELL_TOKEN.captures(object_dn) {
        Some(caps) => format!("Cell{}", &caps[1]),
        None => object_dn.to_string(),
    }
}

/// The serial token including its delimiting dashes, as exported.
pub fn parse_serial(object_dn: &str) -> Option<String> {
    SERIAL_TOKEN
        .find(object_dn)
        .map(|m| m.as_str().to_string())
}

/// Resolves DNs to identities, optionally scoped to an allow-list of exact DNs.
#[derive(Debug, Clone, Default)]
pub struct IdentityResolver {
    allow_list: Option<HashSet<String>>,
}

impl IdentityResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty list means no restriction.
    pub fn with_allow_list<I, S>(dns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let allow_list: HashSet<String> = dns.into_iter().map(Into::into).collect();
        Self {
            allow_list: if allow_list.is_empty() { None } else { Some(allow_list) },
        }
    }

    pub fn permits(&self, object_dn: &str) -> bool {
        self.allow_list
            .as_ref()
            .map_or(true, |allowed| allowed.contains(object_dn))
    }

    pub fn resolve(&self, object_dn: &str) -> ObjectIdentity {
        ObjectIdentity {
            cell_id: parse_cell_id(object_dn),
            serial: parse_serial(object_dn),
        }
    }
}
