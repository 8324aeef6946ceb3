use crate::settings::{ConfigError, Settings};

/// Store columns of the input tab: the operator's own store plus every
/// competitor, in source order.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreColumns {
    pub own: String,
    pub competitors: Vec<String>,
}

impl StoreColumns {
    /// Own store first, then competitors.
    pub fn all(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.own.as_str()).chain(self.competitors.iter().map(String::as_str))
    }

    pub fn len(&self) -> usize {
        1 + self.competitors.len()
    }
}

/// Every header that isn't metadata or status is a store. The own store is
/// matched by exact name; its absence is fatal. Store names must be unique
/// since each one keys a `{store}_price` output column.
pub fn classify(headers: &[String], settings: &Settings) -> Result<StoreColumns, ConfigError> {
    let candidates: Vec<String> = headers
        .iter()
        .filter(|h| !h.is_empty())
        .filter(|h| **h != settings.status_column && !settings.meta_columns.contains(h))
        .cloned()
        .collect();

    if let Some(dup) = candidates
        .iter()
        .enumerate()
        .find(|(i, c)| candidates[..*i].contains(*c))
        .map(|(_, c)| c.clone())
    {
        return Err(ConfigError::DuplicateColumn(dup));
    }

    if !candidates.contains(&settings.own_store) {
        return Err(ConfigError::MissingOwnStore {
            name: settings.own_store.clone(),
            candidates,
        });
    }

    let competitors = candidates
        .into_iter()
        .filter(|c| *c != settings.own_store)
        .collect();

    Ok(StoreColumns {
        own: settings.own_store.clone(),
        competitors,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn own_store_and_single_competitor() {
        let h = headers(&["category", "brand", "sku_code", "status", "Daily_Bike", "StoreX"]);
        let stores = classify(&h, &Settings::default()).unwrap();
        assert_eq!(stores.own, "Daily_Bike");
        assert_eq!(stores.competitors, ["StoreX"]);
    }

    #[test]
    fn competitors_keep_source_order() {
        let h = headers(&["StoreZ", "category", "Daily_Bike", "status", "StoreA", "brand", "StoreM"]);
        let stores = classify(&h, &Settings::default()).unwrap();
        assert_eq!(stores.competitors, ["StoreZ", "StoreA", "StoreM"]);
        let all: Vec<&str> = stores.all().collect();
        assert_eq!(all, ["Daily_Bike", "StoreZ", "StoreA", "StoreM"]);
        assert_eq!(stores.len(), 4);
    }

    #[test]
    fn missing_own_store_lists_candidates() {
        let h = headers(&["category", "brand", "sku_code", "status", "StoreX"]);
        let err = classify(&h, &Settings::default()).unwrap_err();
        match &err {
            ConfigError::MissingOwnStore { name, candidates } => {
                assert_eq!(name, "Daily_Bike");
                assert_eq!(candidates, &["StoreX"]);
            }
            other => panic!("unexpected error: {other:?}"),
        }
        let msg = err.to_string();
        assert!(msg.contains("Daily_Bike") && msg.contains("StoreX"));
    }

    #[test]
    fn own_store_match_is_exact() {
        let h = headers(&["status", "daily_bike", "StoreX"]);
        assert!(classify(&h, &Settings::default()).is_err());
    }

    #[test]
    fn no_competitors_is_allowed() {
        let h = headers(&["category", "status", "Daily_Bike", ""]);
        let stores = classify(&h, &Settings::default()).unwrap();
        assert!(stores.competitors.is_empty());
    }

    #[test]
    fn duplicate_store_header_is_rejected() {
        let h = headers(&["status", "Daily_Bike", "StoreX", "StoreY", "StoreX"]);
        let err = classify(&h, &Settings::default()).unwrap_err();
        assert!(matches!(&err, ConfigError::DuplicateColumn(c) if c == "StoreX"));
        assert!(err.to_string().contains("StoreX"));

        let h = headers(&["status", "Daily_Bike", "StoreX", "Daily_Bike"]);
        let err = classify(&h, &Settings::default()).unwrap_err();
        assert!(matches!(err, ConfigError::DuplicateColumn(c) if c == "Daily_Bike"));
    }

    #[test]
    fn repeated_metadata_headers_are_not_stores() {
        let h = headers(&["brand", "status", "Daily_Bike", "StoreX", "brand", ""]);
        let stores = classify(&h, &Settings::default()).unwrap();
        assert_eq!(stores.competitors, ["StoreX"]);
    }
}
