//! Ownership Graph
//!
//! Owner -> owned adjacency derived from a guild snapshot. The relation
//! must stay a forest: one owner per user, no cycles, no self-ownership.
//! All traversals use an explicit stack so deep chains cannot exhaust the
//! call stack.

use std::collections::{HashMap, HashSet};

use crate::core::types::{GuildData, UserId};

#[derive(Debug, Clone, Default)]
pub struct OwnershipGraph {
    /// owner -> owned
    edges: HashMap<UserId, Vec<UserId>>,
}

impl OwnershipGraph {
    /// Build from the users' `owned` lists
    pub fn from_guild(guild: &GuildData) -> Self {
        let edges = guild
            .users
            .values()
            .filter(|u| !u.owned.is_empty())
            .map(|u| (u.id.clone(), u.owned.clone()))
            .collect();
        Self { edges }
    }

    /// Build from explicit `(owner, owned)` pairs
    pub fn from_edges<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (UserId, UserId)>,
    {
        let mut edges: HashMap<UserId, Vec<UserId>> = HashMap::new();
        for (owner, owned) in pairs {
            edges.entry(owner).or_default().push(owned);
        }
        Self { edges }
    }

    pub fn owned_by(&self, owner: &str) -> &[UserId] {
        self.edges.get(owner).map(Vec::as_slice).unwrap_or(&[])
    }

    /// True when making `owner` the owner of `target` would close a cycle.
    ///
    /// Walks everything `target` owns, directly or transitively. Nodes
    /// without an entry are leaves.
    pub fn would_create_cycle(&self, owner: &str, target: &str) -> bool {
        if owner == target {
            return true;
        }

        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: Vec<&str> = vec![target];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            for sub in self.owned_by(node) {
                if sub == owner {
                    return true;
                }
                if !visited.contains(sub.as_str()) {
                    stack.push(sub);
                }
            }
        }
        false
    }

    /// Render the trees below `roots` as ASCII, one root per block.
    ///
    /// Each node is printed once; a user reachable twice (corrupted data)
    /// is skipped the second time.
    pub fn render_forest<F>(&self, roots: &[UserId], label: F) -> String
    where
        F: Fn(&str) -> String,
    {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut out = String::new();

        for root in roots {
            if !visited.insert(root.as_str()) {
                continue;
            }
            out.push_str(&label(root));
            out.push('\n');

            // (node, prefix for its children)
            let mut stack: Vec<(&str, String)> = Vec::new();
            self.push_children(root, String::new(), &mut stack, &visited);

            while let Some((node, line_prefix)) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                out.push_str(&line_prefix);
                out.push_str(&label(node));
                out.push('\n');

                let child_prefix = line_prefix
                    .replace("├── ", "│   ")
                    .replace("└── ", "    ");
                self.push_children(node, child_prefix, &mut stack, &visited);
            }
        }

        out.trim_end().to_string()
    }

    fn push_children<'a>(
        &'a self,
        node: &str,
        prefix: String,
        stack: &mut Vec<(&'a str, String)>,
        visited: &HashSet<&str>,
    ) {
        let children: Vec<&'a str> = self
            .owned_by(node)
            .iter()
            .map(String::as_str)
            .filter(|c| !visited.contains(c))
            .collect();

        // reversed so the first child pops first
        for (i, child) in children.iter().enumerate().rev() {
            let branch = if i + 1 == children.len() { "└── " } else { "├── " };
            stack.push((*child, format!("{}{}", prefix, branch)));
        }
    }
}

/// Non-bot users nobody owns, sorted by id
pub fn roots(guild: &GuildData) -> Vec<UserId> {
    guild
        .users
        .values()
        .filter(|u| !u.bot && !guild.ownerships.contains_key(&u.id))
        .map(|u| u.id.clone())
        .collect()
}
