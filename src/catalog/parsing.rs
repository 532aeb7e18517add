use crate::catalog::CatalogError;
use crate::matching::matches_prefix;

/// A named three-line orbital element record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrbitalRecord {
    pub name: String,
    pub line1: String,
    pub line2: String,
}

/// Records of a flat TLE catalog, in source order.
#[derive(Debug, Clone)]
pub struct Catalog {
    records: Vec<OrbitalRecord>,
}

impl Catalog {
    /// Parse repeating (name, line 1, line 2) blocks.
    ///
    /// A single trailing blank line is tolerated. Anything that leaves a short
    /// block at the end is rejected instead of being dropped.
    pub fn parse(raw: &str) -> Result<Self, CatalogError> {
        let mut lines: Vec<&str> = raw.split('\n').map(|l| l.trim_end_matches('\r')).collect();
        if lines.last().is_some_and(|l| l.trim().is_empty()) {
            lines.pop();
        }

        if lines.is_empty() {
            return Err(CatalogError::Format("catalog is empty".into()));
        }
        if lines.len() % 3 != 0 {
            return Err(CatalogError::Format(format!(
                "{} lines is not a whole number of 3-line records (last record is truncated)",
                lines.len()
            )));
        }

        let records = lines
            .chunks_exact(3)
            .map(|block| OrbitalRecord {
                name: block[0].to_string(),
                line1: block[1].to_string(),
                line2: block[2].to_string(),
            })
            .collect();

        Ok(Self { records })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[cfg(test)]
    pub fn records(&self) -> &[OrbitalRecord] {
        &self.records
    }

    /// Record names in source order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.iter().map(|r| r.name.as_str())
    }

    /// First record whose name equals `query` or shares a prefix with it.
    pub fn find_by_name(&self, query: &str) -> Result<&OrbitalRecord, CatalogError> {
        let mut matches = self
            .records
            .iter()
            .filter(|r| r.name == query || matches_prefix(query, &r.name));

        let first = matches
            .next()
            .ok_or_else(|| CatalogError::NotFound(query.to_string()))?;

        let others = matches.count();
        if others > 0 {
            log::warn!(
                "\"{}\" matches {} catalog entries, using \"{}\"",
                query,
                others + 1,
                first.name
            );
        }

        Ok(first)
    }

    /// First record whose name is exactly `name`.
    pub fn find_exact(&self, name: &str) -> Result<&OrbitalRecord, CatalogError> {
        self.records
            .iter()
            .find(|r| r.name == name)
            .ok_or_else(|| CatalogError::NotFound(name.to_string()))
    }
}
