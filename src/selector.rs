// Copyright 2026 The Scheduler Cache Authors
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::collections::HashMap;

use crate::error::CacheError;

/// A single `key op values` match expression, the non-equality half of a
/// label selector (`key in (v1, v2)`, `key notin (v1, v2)`, `key`, `!key`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorOp {
    In(Vec<String>),
    NotIn(Vec<String>),
    Exists,
    DoesNotExist,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorRequirement {
    pub key: String,
    pub op: SelectorOp,
}

/// A label selector: an equality map plus a list of set-based requirements,
/// all ANDed together. Mirrors the shape of a Kubernetes-style label
/// selector without pulling in an external parser crate.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LabelSelector {
    pub match_labels: HashMap<String, String>,
    pub match_expressions: Vec<SelectorRequirement>,
}

impl LabelSelector {
    pub fn is_empty(&self) -> bool {
        self.match_labels.is_empty() && self.match_expressions.is_empty()
    }

    /// Parses a `key=value,key2 in (a,b),key3,!key4`-style selector string.
    /// Returns [`CacheError::SelectorInvalid`] on malformed input, the only
    /// place in the cache where a selector-parse failure is surfaced as an
    /// error rather than treated as "no match".
    pub fn parse(raw: &str) -> Result<Self, CacheError> {
        let mut sel = LabelSelector::default();
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(sel);
        }
        for term in raw.split(',') {
            let term = term.trim();
            if term.is_empty() {
                return Err(CacheError::SelectorInvalid(format!(
                    "empty term in selector {raw:?}"
                )));
            }
            if let Some(rest) = term.strip_prefix('!') {
                if rest.is_empty() {
                    return Err(CacheError::SelectorInvalid(format!(
                        "empty key after '!' in {term:?}"
                    )));
                }
                sel.match_expressions.push(SelectorRequirement {
                    key: rest.to_string(),
                    op: SelectorOp::DoesNotExist,
                });
            } else if let Some(idx) = term.find('=') {
                let (key, value) = term.split_at(idx);
                let value = &value[1..];
                if key.trim().is_empty() {
                    return Err(CacheError::SelectorInvalid(format!(
                        "empty key in {term:?}"
                    )));
                }
                sel.match_labels
                    .insert(key.trim().to_string(), value.trim().to_string());
            } else if let Some(idx) = term.find(" in (").or_else(|| term.find(" notin (")) {
                let negate = term[idx..].starts_with(" notin (");
                let key = term[..idx].trim();
                if key.is_empty() {
                    return Err(CacheError::SelectorInvalid(format!(
                        "empty key in {term:?}"
                    )));
                }
                let open = term.find('(').ok_or_else(|| {
                    CacheError::SelectorInvalid(format!("malformed set term {term:?}"))
                })?;
                let close = term.rfind(')').ok_or_else(|| {
                    CacheError::SelectorInvalid(format!("unterminated set term {term:?}"))
                })?;
                if close < open {
                    return Err(CacheError::SelectorInvalid(format!(
                        "malformed set term {term:?}"
                    )));
                }
                let values: Vec<String> = term[open + 1..close]
                    .split('|')
                    .map(|v| v.trim().to_string())
                    .filter(|v| !v.is_empty())
                    .collect();
                if values.is_empty() {
                    return Err(CacheError::SelectorInvalid(format!(
                        "empty value set in {term:?}"
                    )));
                }
                sel.match_expressions.push(SelectorRequirement {
                    key: key.to_string(),
                    op: if negate {
                        SelectorOp::NotIn(values)
                    } else {
                        SelectorOp::In(values)
                    },
                });
            } else {
                sel.match_expressions.push(SelectorRequirement {
                    key: term.to_string(),
                    op: SelectorOp::Exists,
                });
            }
        }
        Ok(sel)
    }

    /// Whether `labels` satisfies every equality and every requirement.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        for (k, v) in &self.match_labels {
            if labels.get(k) != Some(v) {
                return false;
            }
        }
        for req in &self.match_expressions {
            let present = labels.get(&req.key);
            let ok = match &req.op {
                SelectorOp::In(values) => present.map_or(false, |v| values.contains(v)),
                SelectorOp::NotIn(values) => present.map_or(true, |v| !values.contains(v)),
                SelectorOp::Exists => present.is_some(),
                SelectorOp::DoesNotExist => present.is_none(),
            };
            if !ok {
                return false;
            }
        }
        true
    }
}
