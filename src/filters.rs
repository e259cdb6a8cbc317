// ABOUTME: Central filtering logic for selective export and import
// ABOUTME: Handles serializer name and table group include/exclude lists

use crate::serializers::{TableGroup, TableSerializer};
use anyhow::{bail, Result};

/// Which serializers take part in an export or import
///
/// Names match case-insensitively. Include and exclude lists of the same
/// kind are mutually exclusive; name and group lists combine (a table must
/// pass both).
#[derive(Debug, Clone, Default)]
pub struct TableFilter {
    include_tables: Option<Vec<String>>,
    exclude_tables: Option<Vec<String>>,
    include_groups: Option<Vec<TableGroup>>,
    exclude_groups: Option<Vec<TableGroup>>,
}

impl TableFilter {
    /// Creates a filter from CLI arguments
    pub fn new(
        include_tables: Option<Vec<String>>,
        exclude_tables: Option<Vec<String>>,
        include_groups: Option<Vec<String>>,
        exclude_groups: Option<Vec<String>>,
    ) -> Result<Self> {
        if include_tables.is_some() && exclude_tables.is_some() {
            bail!("Cannot use both --include-tables and --exclude-tables");
        }
        if include_groups.is_some() && exclude_groups.is_some() {
            bail!("Cannot use both --include-groups and --exclude-groups");
        }

        let parse_groups = |groups: Option<Vec<String>>| -> Result<Option<Vec<TableGroup>>> {
            match groups {
                Some(list) => Ok(Some(
                    list.iter()
                        .map(|g| g.parse::<TableGroup>())
                        .collect::<Result<Vec<_>>>()?,
                )),
                None => Ok(None),
            }
        };

        let normalize = |tables: Option<Vec<String>>| {
            tables.map(|list| {
                list.into_iter()
                    .map(|t| t.trim().to_lowercase())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
        };

        Ok(Self {
            include_tables: normalize(include_tables),
            exclude_tables: normalize(exclude_tables),
            include_groups: parse_groups(include_groups)?,
            exclude_groups: parse_groups(exclude_groups)?,
        })
    }

    /// Creates an empty filter (everything passes)
    pub fn empty() -> Self {
        Self::default()
    }

    /// A filter that passes exactly the given serializer names
    pub fn only(names: Vec<String>) -> Self {
        Self {
            include_tables: Some(names.into_iter().map(|n| n.to_lowercase()).collect()),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.include_tables.is_none()
            && self.exclude_tables.is_none()
            && self.include_groups.is_none()
            && self.exclude_groups.is_none()
    }

    /// Determines if a name passes the include/exclude table lists
    pub fn should_include_name(&self, name: &str) -> bool {
        let name = name.to_lowercase();

        if let Some(ref include) = self.include_tables {
            if !include.contains(&name) {
                return false;
            }
        }
        if let Some(ref exclude) = self.exclude_tables {
            if exclude.contains(&name) {
                return false;
            }
        }
        true
    }

    /// Determines if a table passes the name and group lists
    pub fn should_include(&self, name: &str, group: TableGroup) -> bool {
        if !self.should_include_name(name) {
            return false;
        }
        if let Some(ref include) = self.include_groups {
            if !include.contains(&group) {
                return false;
            }
        }
        if let Some(ref exclude) = self.exclude_groups {
            if exclude.contains(&group) {
                return false;
            }
        }

        true
    }

    /// Serializers that pass this filter, in their original order
    ///
    /// Names in an include list that match no serializer are an error, so a
    /// typo does not silently export nothing.
    pub fn apply(&self, serializers: &[TableSerializer]) -> Result<Vec<TableSerializer>> {
        if let Some(ref include) = self.include_tables {
            for wanted in include {
                if !serializers.iter().any(|s| s.name.to_lowercase() == *wanted) {
                    bail!("Unknown table '{}' in --include-tables", wanted);
                }
            }
        }

        let selected: Vec<TableSerializer> = serializers
            .iter()
            .filter(|s| self.should_include(&s.name, s.group))
            .cloned()
            .collect();

        if selected.is_empty() {
            bail!("No tables selected. Check your filters.");
        }

        Ok(selected)
    }
}
