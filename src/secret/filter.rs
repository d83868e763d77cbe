//! Typed search filter and its translation to SQL.

use std::collections::BTreeSet;

use rusqlite::types::Value;

use super::model::{normalize_tags, SecretType};

/// Optional predicates for `SecretStore::search`.  All present predicates
/// must match; an empty filter matches every secret the caller owns.
///
/// Blank strings and an empty tag set count as "not given".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecretFilter {
    pub vault_id: Option<String>,
    pub secret_type: Option<SecretType>,
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Case-insensitive substring of the domain.
    pub domain: Option<String>,
    /// Matches secrets carrying at least one of these tags.
    pub tags: BTreeSet<String>,
}

/// A SQL `WHERE` body and its positional parameters.
#[derive(Debug)]
pub(crate) struct Predicate {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Predicate {
    /// Append a clause bound to one new parameter.  `clause` receives the
    /// parameter's position.
    fn push(&mut self, value: Value, clause: impl FnOnce(usize) -> String) {
        self.params.push(value);
        let n = self.params.len();
        self.sql.push_str(" AND ");
        self.sql.push_str(&clause(n));
    }
}

impl SecretFilter {
    /// Build the predicate for `user_id`.
    ///
    /// The ownership clause always comes first and cannot be removed by
    /// any combination of filter fields.  The remaining clauses follow in
    /// a fixed order: vault, type, title, domain, tags.
    pub(crate) fn to_predicate(&self, user_id: &str) -> Predicate {
        let mut p = Predicate {
            sql: "v.user_id = ?1".to_string(),
            params: vec![Value::Text(user_id.to_string())],
        };

        if let Some(vault_id) = non_blank(&self.vault_id) {
            p.push(Value::Text(vault_id), |n| format!("s.vault_id = ?{n}"));
        }
        if let Some(secret_type) = self.secret_type {
            p.push(Value::Text(secret_type.as_str().to_string()), |n| {
                format!("s.type = ?{n}")
            });
        }
        if let Some(title) = non_blank(&self.title) {
            p.push(Value::Text(title), |n| {
                format!("instr(casefold(m.title), casefold(?{n})) > 0")
            });
        }
        if let Some(domain) = non_blank(&self.domain) {
            p.push(Value::Text(domain), |n| {
                format!("instr(casefold(coalesce(m.domain, '')), casefold(?{n})) > 0")
            });
        }

        let tags = normalize_tags(self.tags.iter());
        if !tags.is_empty() {
            let first = p.params.len() + 1;
            let placeholders: Vec<String> =
                (first..first + tags.len()).map(|n| format!("?{n}")).collect();
            p.params.extend(tags.into_iter().map(Value::Text));
            p.sql.push_str(&format!(
                " AND EXISTS (SELECT 1 FROM json_each(m.tags) AS t WHERE t.value IN ({}))",
                placeholders.join(", ")
            ));
        }

        p
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_only_scopes_by_owner() {
        let p = SecretFilter::default().to_predicate("u1");
        assert_eq!(p.sql, "v.user_id = ?1");
        assert_eq!(p.params, vec![Value::Text("u1".into())]);
    }

    #[test]
    fn blank_fields_are_ignored() {
        let filter = SecretFilter {
            vault_id: Some(String::new()),
            title: Some("   ".into()),
            tags: [String::new()].into_iter().collect(),
            ..SecretFilter::default()
        };
        assert_eq!(filter.to_predicate("u1").sql, "v.user_id = ?1");
    }

    #[test]
    fn clauses_follow_fixed_order_and_numbering() {
        let filter = SecretFilter {
            vault_id: Some("v1".into()),
            secret_type: Some(SecretType::Card),
            title: Some("ban".into()),
            domain: Some("example".into()),
            tags: ["a".to_string(), "b".to_string()].into_iter().collect(),
        };
        let p = filter.to_predicate("u1");

        assert_eq!(
            p.sql,
            "v.user_id = ?1 AND s.vault_id = ?2 AND s.type = ?3 \
             AND instr(casefold(m.title), casefold(?4)) > 0 \
             AND instr(casefold(coalesce(m.domain, '')), casefold(?5)) > 0 \
             AND EXISTS (SELECT 1 FROM json_each(m.tags) AS t WHERE t.value IN (?6, ?7))"
        );
        assert_eq!(p.params.len(), 7);
        assert_eq!(p.params[2], Value::Text("card".into()));
        assert_eq!(p.params[5], Value::Text("a".into()));
        assert_eq!(p.params[6], Value::Text("b".into()));
    }

    #[test]
    fn tag_values_are_trimmed_before_binding() {
        let filter = SecretFilter {
            tags: [" work".to_string(), "work ".to_string()].into_iter().collect(),
            ..SecretFilter::default()
        };
        let p = filter.to_predicate("u1");

        assert_eq!(p.params, vec![Value::Text("u1".into()), Value::Text("work".into())]);
        assert!(p.sql.ends_with("IN (?2))"));
    }

    #[test]
    fn owner_clause_survives_every_field() {
        let filter = SecretFilter {
            title: Some("x".into()),
            ..SecretFilter::default()
        };
        assert!(filter.to_predicate("u9").sql.starts_with("v.user_id = ?1 AND "));
    }
}
