//! Recipient groups from configuration

use anyhow::{bail, Result};
use monitor_lib::GroupLookup;
use std::collections::HashMap;

/// Fixed group table parsed from `name=addr,addr;name=addr`
#[derive(Debug, Clone, Default)]
pub struct StaticGroups {
    groups: HashMap<String, Vec<String>>,
}

impl StaticGroups {
    pub fn parse(table: &str) -> Result<Self> {
        let mut groups = HashMap::new();

        for entry in table.split(';').map(str::trim).filter(|e| !e.is_empty()) {
            let Some((name, members)) = entry.split_once('=') else {
                bail!("group entry '{}' is missing '='", entry);
            };
            let name = name.trim();
            if name.is_empty() {
                bail!("group entry '{}' has an empty name", entry);
            }
            let members: Vec<String> = members
                .split(',')
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(String::from)
                .collect();
            groups.insert(name.to_string(), members);
        }

        Ok(Self { groups })
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl GroupLookup for StaticGroups {
    fn resolve(&self, group: &str) -> Option<Vec<String>> {
        self.groups.get(group).cloned()
    }
}
