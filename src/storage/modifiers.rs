//! Projection, match filters and array modifiers applied by the in-memory store.

use std::collections::{BTreeMap, BTreeSet};
use crate::types::document::ID_FIELD;
use crate::types::{Document, FetchError, QueryModifiers, Value};

/// Parsed `select` string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Projection {
    /// Every field
    All,
    /// Only the listed fields
    Include {
        /// Kept field names
        fields: BTreeSet<String>,
        /// Whether `_id` survives in lean output
        keep_id: bool,
    },
    /// Every field except the listed ones
    Exclude {
        /// Dropped field names
        fields: BTreeSet<String>,
        /// Whether `_id` survives in lean output
        keep_id: bool,
    },
}

impl Projection {
    /// Parse a space or comma separated projection. Inclusion and exclusion
    /// cannot be mixed, except for `-_id` which is accepted in both.
    pub fn parse(select: Option<&str>, path: &str) -> Result<Self, FetchError> {
        let Some(select) = select else {
            return Ok(Projection::All);
        };

        let mut include = BTreeSet::new();
        let mut exclude = BTreeSet::new();
        let mut keep_id = true;
        for token in select.split(|c: char| c == ',' || c.is_whitespace()).filter(|t| !t.is_empty()) {
            match token.strip_prefix('-') {
                Some(ID_FIELD) => keep_id = false,
                Some(field) if !field.is_empty() => {
                    exclude.insert(field.to_string());
                }
                Some(_) => {
                    return Err(FetchError::InvalidOptions {
                        path: path.to_string(),
                        message: "empty exclusion in select".to_string(),
                    });
                }
                None if token == ID_FIELD => {}
                None => {
                    include.insert(token.trim_start_matches('+').to_string());
                }
            }
        }

        match (include.is_empty(), exclude.is_empty()) {
            (false, false) => Err(FetchError::InvalidOptions {
                path: path.to_string(),
                message: format!("cannot mix inclusion and exclusion in select `{}`", select),
            }),
            (false, true) => Ok(Projection::Include { fields: include, keep_id }),
            (true, _) if exclude.is_empty() && keep_id => Ok(Projection::All),
            (true, _) => Ok(Projection::Exclude { fields: exclude, keep_id }),
        }
    }

    /// Whether `_id` is kept in lean output
    pub fn keeps_id(&self) -> bool {
        match self {
            Projection::All => true,
            Projection::Include { keep_id, .. } | Projection::Exclude { keep_id, .. } => *keep_id,
        }
    }

    /// Drop the fields this projection hides
    pub fn apply(&self, mut document: Document) -> Document {
        match self {
            Projection::All => {}
            Projection::Include { fields, .. } => document.fields.retain(|name, _| fields.contains(name)),
            Projection::Exclude { fields, .. } => document.fields.retain(|name, _| !fields.contains(name)),
        }
        document
    }

    /// Project and flatten into the lean object form
    pub fn apply_lean(&self, document: Document) -> Value {
        let mut lean = self.apply(document).into_lean();
        if !self.keeps_id() {
            if let Value::Object(map) = &mut lean {
                map.remove(ID_FIELD);
            }
        }
        lean
    }
}

/// Field value used for filtering and sorting; `_id` resolves to the primary key.
fn field_of(document: &Document, field: &str) -> Option<Value> {
    if field == ID_FIELD {
        return Some(Value::String(document.id.to_string()));
    }
    document.lookup(field).cloned()
}

/// Value of `field` on a populated array item
fn item_field(item: &Value, field: &str) -> Value {
    match item {
        Value::Entity(document) => field_of(document, field).unwrap_or_default(),
        other => other.lookup(field).cloned().unwrap_or_default(),
    }
}

/// Equality against every condition. Ids compare by their string form.
pub fn matches(document: &Document, filter: Option<&BTreeMap<String, Value>>) -> bool {
    let Some(filter) = filter else {
        return true;
    };
    filter.iter().all(|(field, expected)| {
        let actual = field_of(document, field).unwrap_or_default();
        if field == ID_FIELD {
            return match expected {
                Value::Int(i) => actual == Value::String(i.to_string()),
                Value::Ref(id) => actual == Value::String(id.to_string()),
                other => &actual == other,
            };
        }
        &actual == expected
    })
}

/// Apply sort, then skip, then limit to a populated array.
pub fn apply_modifiers(items: &mut Vec<Value>, modifiers: &QueryModifiers) {
    if let Some(sort) = modifiers.sort.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        let (field, descending) = match sort.strip_prefix('-') {
            Some(field) => (field, true),
            None => (sort.trim_start_matches('+'), false),
        };
        items.sort_by(|a, b| {
            let ordering = item_field(a, field).sort_cmp(&item_field(b, field));
            if descending { ordering.reverse() } else { ordering }
        });
    }
    if let Some(skip) = modifiers.skip {
        items.drain(..skip.min(items.len()));
    }
    if let Some(limit) = modifiers.limit {
        items.truncate(limit);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: i64, rank: i64) -> Document {
        Document::new("User", id).with("rank", rank).with("name", format!("u{}", id)).with("manager", Value::reference(2))
    }

    #[test]
    fn test_projection_parsing() {
        assert_eq!(Projection::parse(None, "p").unwrap(), Projection::All);
        assert_eq!(Projection::parse(Some("  "), "p").unwrap(), Projection::All);

        let p = Projection::parse(Some("-manager -_id"), "p").unwrap();
        assert!(matches!(&p, Projection::Exclude { fields, keep_id: false } if fields.contains("manager")));

        let p = Projection::parse(Some("name,-_id"), "p").unwrap();
        assert!(matches!(&p, Projection::Include { keep_id: false, .. }));

        let p = Projection::parse(Some("-_id"), "p").unwrap();
        assert!(matches!(&p, Projection::Exclude { fields, keep_id: false } if fields.is_empty()));

        let err = Projection::parse(Some("name -manager"), "user").unwrap_err();
        assert!(matches!(err, FetchError::InvalidOptions { ref path, .. } if path == "user"));
    }

    #[test]
    fn test_projection_apply() {
        let p = Projection::parse(Some("-manager -_id"), "p").unwrap();
        let lean = p.apply_lean(user(1, 0));
        let map = lean.as_object().unwrap();
        assert!(!map.contains_key("manager"));
        assert!(!map.contains_key(ID_FIELD));
        assert!(map.contains_key("name"));

        let p = Projection::parse(Some("name"), "p").unwrap();
        let doc = p.apply(user(1, 0));
        assert_eq!(doc.fields.len(), 1);
        let lean = p.apply_lean(user(1, 0));
        assert!(lean.field(ID_FIELD).is_some());
    }

    #[test]
    fn test_match_filter() {
        let doc = user(3, 7);
        let mut filter = BTreeMap::new();
        filter.insert("rank".to_string(), Value::Int(7));
        assert!(matches(&doc, Some(&filter)));
        filter.insert(ID_FIELD.to_string(), Value::Int(3));
        assert!(matches(&doc, Some(&filter)));
        filter.insert("name".to_string(), Value::from("other"));
        assert!(!matches(&doc, Some(&filter)));
        assert!(matches(&doc, None));
    }

    #[test]
    fn test_sort_skip_limit() {
        let mut items: Vec<Value> = [(1, 5), (2, 9), (3, 1), (4, 7)]
            .into_iter()
            .map(|(id, rank)| Value::from(user(id, rank)))
            .collect();
        let modifiers = QueryModifiers { sort: Some("-rank".into()), skip: Some(1), limit: Some(2) };
        apply_modifiers(&mut items, &modifiers);
        let ids: Vec<String> = items.iter().map(|v| v.as_entity().unwrap().id.to_string()).collect();
        assert_eq!(ids, ["4", "1"]);

        let mut lean = vec![user(2, 0).into_lean(), user(1, 0).into_lean()];
        apply_modifiers(&mut lean, &QueryModifiers { sort: Some("_id".into()), ..Default::default() });
        assert_eq!(lean[0].field(ID_FIELD).and_then(Value::as_str), Some("1"));

        let mut short = vec![Value::Int(1)];
        apply_modifiers(&mut short, &QueryModifiers { skip: Some(5), ..Default::default() });
        assert!(short.is_empty());
    }
}
