//! Display aliases and paired bundles

use std::collections::HashMap;

use crate::config::PairConfig;
use crate::core::types::UserId;

#[derive(Debug, Clone, Default)]
pub struct Aliases {
    names: HashMap<UserId, String>,
    /// Symmetric: both directions are stored
    pairs: HashMap<UserId, UserId>,
}

impl Aliases {
    pub fn new(names: &HashMap<String, String>, pairs: &[PairConfig]) -> Self {
        let mut pair_map = HashMap::new();
        for pair in pairs {
            pair_map.insert(pair.a.clone(), pair.b.clone());
            pair_map.insert(pair.b.clone(), pair.a.clone());
        }
        Self {
            names: names.clone(),
            pairs: pair_map,
        }
    }

    pub fn alias(&self, user_id: &str) -> Option<&str> {
        self.names.get(user_id).map(String::as_str)
    }

    /// The id bought together with `user_id`, if configured
    pub fn pair_of(&self, user_id: &str) -> Option<&UserId> {
        self.pairs.get(user_id)
    }

    /// Alias, then username, then `[id]`
    pub fn display_name(&self, user_id: &str, username: &str) -> String {
        if let Some(alias) = self.alias(user_id) {
            return alias.to_string();
        }
        if !username.is_empty() {
            return username.to_string();
        }
        format!("[{}]", user_id)
    }

    /// `<@id>` with the alias appended when one exists
    pub fn mention(&self, user_id: &str) -> String {
        match self.alias(user_id) {
            Some(alias) => format!("<@{}> ({})", user_id, alias),
            None => format!("<@{}>", user_id),
        }
    }

    /// `A & B` for paired users; `pair_username` is `None` when the partner is unknown
    pub fn bundle_display(&self, user_id: &str, username: &str, pair_username: Option<&str>) -> String {
        let own = self.display_name(user_id, username);
        match self.pair_of(user_id) {
            None => own,
            Some(pair_id) => match pair_username {
                Some(name) => format!("{} & {}", own, self.display_name(pair_id, name)),
                None => format!("{} & [Unbekannt]", own),
            },
        }
    }
}
