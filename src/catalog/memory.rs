/*!
An in-memory reference [Catalog], layering namespace/table lifecycle and the commit/retry loop
on top of the [Storage] trait. Grounded in `transaction/operation.rs`'s `test_append_files`,
which drove a table through `TableBuilder`/`Transaction::commit` against an
`object_store::memory::InMemory`; this implementation generalizes that versioned
`vN.metadata.json` + `version-hint.text` layout into the full catalog contract (§4.L) instead
of a single hardcoded table path.
*/
use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;
use uuid::Uuid;

use crate::catalog::namespace::Namespace;
use crate::catalog::table_identifier::TableIdentifier;
use crate::catalog::{
    apply_updates, backoff_delay, check_requirements, Catalog, CommitTable, CreateTableOptions,
    COMMIT_MAX_RETRIES,
};
use crate::error::{IcebergError, Result};
use crate::model::metadata::{MetadataLogEntry, RootMetadata};
use crate::model::partition::PartitionSpec;
use crate::model::schema::Schema;
use crate::model::sort::SortOrder;
use crate::model::types::SchemaStruct;
use crate::storage::Storage;

const NAMESPACE_MARKER: &str = ".namespace.json";
const VERSION_HINT: &str = "version-hint.text";

/// Namespace/table lifecycle and commit/retry loop over any [Storage] backend.
pub struct MemoryCatalog {
    storage: Arc<dyn Storage>,
}

impl MemoryCatalog {
    /// Builds a catalog rooted at `storage`.
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        MemoryCatalog { storage }
    }

    fn namespace_path(namespace: &Namespace) -> String {
        namespace.levels().join("/")
    }

    fn table_dir(identifier: &TableIdentifier) -> String {
        let ns_path = Self::namespace_path(identifier.namespace());
        if ns_path.is_empty() {
            format!("{}/metadata", identifier.name())
        } else {
            format!("{ns_path}/{}/metadata", identifier.name())
        }
    }

    fn namespace_marker_key(namespace: &Namespace) -> String {
        let path = Self::namespace_path(namespace);
        if path.is_empty() {
            NAMESPACE_MARKER.to_string()
        } else {
            format!("{path}/{NAMESPACE_MARKER}")
        }
    }

    /// Reads and parses `version-hint.text`, returning the table's current numeric version
    /// and the key of the metadata blob it points at. The hint may hold either a bare integer
    /// (`"3"`, the layout this catalog itself writes) or a full metadata path (the convention
    /// some external writers use); a path is validated against traversal and, since this
    /// catalog still needs a version number to compute the next commit, must end in the
    /// `vN.metadata.json` form this catalog also produces.
    async fn read_version_hint(&self, identifier: &TableIdentifier) -> Result<Option<(i64, String)>> {
        let key = format!("{}/{VERSION_HINT}", Self::table_dir(identifier));
        match self.storage.get(&key).await? {
            Some(bytes) => {
                let text = String::from_utf8_lossy(&bytes).trim().to_string();
                let dir = Self::table_dir(identifier);
                Ok(Some(parse_version_hint(&dir, &text)?))
            }
            None => Ok(None),
        }
    }

    async fn read_metadata_at_key(&self, identifier: &TableIdentifier, key: &str) -> Result<RootMetadata> {
        let bytes = self
            .storage
            .get(key)
            .await?
            .ok_or_else(|| IcebergError::TableNotFound(identifier.to_string()))?;
        RootMetadata::parse(&String::from_utf8_lossy(&bytes))
    }

    fn initial_metadata(options: &CreateTableOptions, location: String) -> RootMetadata {
        let schema = options.schema.clone().unwrap_or(Schema {
            schema_id: 0,
            identifier_field_ids: None,
            name_mapping: None,
            struct_fields: SchemaStruct { fields: vec![] },
        });
        let spec = options.partition_spec.clone().unwrap_or(PartitionSpec { spec_id: 0, fields: vec![] });
        let sort_order = options.sort_order.clone().unwrap_or(SortOrder { order_id: 0, fields: vec![] });
        let format_version = options.format_version.unwrap_or(2);
        RootMetadata {
            format_version,
            table_uuid: Uuid::new_v4(),
            location,
            last_sequence_number: 0,
            last_updated_ms: now_ms(),
            last_column_id: schema.struct_fields.fields.iter().map(|f| f.id).max().unwrap_or(0),
            current_schema_id: schema.schema_id,
            schemas: vec![schema],
            partition_specs: vec![spec.clone()],
            default_spec_id: spec.spec_id,
            last_partition_id: crate::model::metadata::INITIAL_LAST_PARTITION_ID,
            sort_orders: vec![sort_order.clone()],
            default_sort_order_id: sort_order.order_id as i64,
            properties: options.properties.clone(),
            current_snapshot_id: None,
            snapshots: vec![],
            snapshot_log: vec![],
            metadata_log: vec![],
            refs: HashMap::new(),
            next_row_id: if format_version == 3 { Some(0) } else { None },
            encryption_keys: None,
        }
    }
}

/// Resolves a `version-hint.text` body to `(version, metadata_key)`. A bare integer resolves
/// relative to `dir`; anything else is treated as a full metadata path, validated against
/// traversal, whose trailing `vN.metadata.json` segment supplies the version number.
fn parse_version_hint(dir: &str, text: &str) -> Result<(i64, String)> {
    if let Ok(version) = text.parse::<i64>() {
        return Ok((version, format!("{dir}/v{version}.metadata.json")));
    }
    crate::path::validate(text)?;
    let version = text
        .rsplit('/')
        .next()
        .and_then(|name| name.strip_prefix('v'))
        .and_then(|rest| rest.strip_suffix(".metadata.json"))
        .and_then(|digits| digits.parse::<i64>().ok())
        .ok_or_else(|| IcebergError::InvalidVersionHint(text.to_string()))?;
    Ok((version, text.to_string()))
}

fn now_ms() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[async_trait::async_trait]
impl Catalog for MemoryCatalog {
    async fn create_namespace(&self, namespace: &Namespace, properties: HashMap<String, String>) -> Result<()> {
        let key = Self::namespace_marker_key(namespace);
        let bytes = serde_json::to_vec(&properties)?;
        if !self.storage.put_if_absent(&key, bytes).await? {
            return Err(IcebergError::NamespaceAlreadyExists(namespace.to_string()));
        }
        Ok(())
    }

    async fn list_namespaces(&self, parent: Option<&Namespace>) -> Result<Vec<Namespace>> {
        let parent_path = parent.map(Self::namespace_path).unwrap_or_default();
        let prefix = if parent_path.is_empty() { String::new() } else { format!("{parent_path}/") };
        let keys = self.storage.list(&prefix).await?;
        let mut children: Vec<String> = Vec::new();
        for key in keys {
            let Some(rest) = key.strip_prefix(prefix.as_str()) else { continue };
            let Some(middle) = rest.strip_suffix(NAMESPACE_MARKER) else { continue };
            let middle = middle.strip_suffix('/').unwrap_or(middle);
            if middle.is_empty() || middle.contains('/') {
                continue;
            }
            if !children.contains(&middle.to_string()) {
                children.push(middle.to_string());
            }
        }
        children.sort();
        children
            .into_iter()
            .map(|level| {
                let mut levels = parent.map(|p| p.levels().to_vec()).unwrap_or_default();
                levels.push(level);
                Namespace::try_new(&levels)
            })
            .collect()
    }

    async fn drop_namespace(&self, namespace: &Namespace) -> Result<()> {
        if !self.list_namespaces(Some(namespace)).await?.is_empty() {
            return Err(IcebergError::NamespaceNotEmpty(namespace.to_string()));
        }
        if !self.list_tables(namespace).await?.is_empty() {
            return Err(IcebergError::NamespaceNotEmpty(namespace.to_string()));
        }
        self.storage.delete(&Self::namespace_marker_key(namespace)).await
    }

    async fn namespace_properties(&self, namespace: &Namespace) -> Result<HashMap<String, String>> {
        let key = Self::namespace_marker_key(namespace);
        let bytes = self
            .storage
            .get(&key)
            .await?
            .ok_or_else(|| IcebergError::Message(format!("namespace not found: {namespace}")))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn set_namespace_properties(&self, namespace: &Namespace, properties: HashMap<String, String>) -> Result<()> {
        let mut current = self.namespace_properties(namespace).await?;
        current.extend(properties);
        let key = Self::namespace_marker_key(namespace);
        self.storage.put(&key, serde_json::to_vec(&current)?).await
    }

    async fn create_table(&self, identifier: &TableIdentifier, options: CreateTableOptions) -> Result<RootMetadata> {
        if self.table_exists(identifier).await? {
            return Err(IcebergError::TableAlreadyExists(identifier.to_string()));
        }
        let dir = Self::table_dir(identifier);
        let location = dir.strip_suffix("/metadata").unwrap_or(&dir).to_string();
        let metadata = Self::initial_metadata(&options, location);
        metadata.validate()?;
        let blob_key = format!("{dir}/v1.metadata.json");
        self.storage.put(&blob_key, serde_json::to_vec(&metadata)?).await?;
        let hint_key = format!("{dir}/{VERSION_HINT}");
        self.storage.put(&hint_key, b"1".to_vec()).await?;
        Ok(metadata)
    }

    async fn load_table(&self, identifier: &TableIdentifier) -> Result<RootMetadata> {
        let (_, key) = self
            .read_version_hint(identifier)
            .await?
            .ok_or_else(|| IcebergError::TableNotFound(identifier.to_string()))?;
        self.read_metadata_at_key(identifier, &key).await
    }

    async fn list_tables(&self, namespace: &Namespace) -> Result<Vec<TableIdentifier>> {
        let ns_path = Self::namespace_path(namespace);
        let prefix = if ns_path.is_empty() { String::new() } else { format!("{ns_path}/") };
        let suffix = format!("/metadata/{VERSION_HINT}");
        let keys = self.storage.list(&prefix).await?;
        let mut names: Vec<String> = Vec::new();
        for key in keys {
            let Some(rest) = key.strip_prefix(prefix.as_str()) else { continue };
            let Some(table_name) = rest.strip_suffix(&suffix) else { continue };
            if table_name.is_empty() || table_name.contains('/') {
                continue;
            }
            if !names.contains(&table_name.to_string()) {
                names.push(table_name.to_string());
            }
        }
        names.sort();
        let mut levels = namespace.levels().to_vec();
        names
            .into_iter()
            .map(|name| {
                levels.push(name);
                let identifier = TableIdentifier::try_new(&levels);
                levels.pop();
                identifier
            })
            .collect()
    }

    async fn table_exists(&self, identifier: &TableIdentifier) -> Result<bool> {
        Ok(self.read_version_hint(identifier).await?.is_some())
    }

    async fn drop_table(&self, identifier: &TableIdentifier, purge: bool) -> Result<()> {
        if !self.table_exists(identifier).await? {
            return Err(IcebergError::TableNotFound(identifier.to_string()));
        }
        let dir = Self::table_dir(identifier);
        if purge {
            for key in self.storage.list(&dir).await? {
                self.storage.delete(&key).await?;
            }
        } else {
            self.storage.delete(&format!("{dir}/{VERSION_HINT}")).await?;
        }
        Ok(())
    }

    async fn rename_table(&self, from: &TableIdentifier, to: &TableIdentifier) -> Result<()> {
        let metadata = self.load_table(from).await?;
        if self.table_exists(to).await? {
            return Err(IcebergError::TableAlreadyExists(to.to_string()));
        }
        let dir = Self::table_dir(to);
        self.storage.put(&format!("{dir}/v1.metadata.json"), serde_json::to_vec(&metadata)?).await?;
        self.storage.put(&format!("{dir}/{VERSION_HINT}"), b"1".to_vec()).await?;
        self.drop_table(from, false).await
    }

    async fn commit_table(&self, commit: CommitTable) -> Result<RootMetadata> {
        let dir = Self::table_dir(&commit.identifier);
        for attempt in 0..COMMIT_MAX_RETRIES {
            let (version, metadata_key) = self
                .read_version_hint(&commit.identifier)
                .await?
                .ok_or_else(|| IcebergError::TableNotFound(commit.identifier.to_string()))?;
            let current = self.read_metadata_at_key(&commit.identifier, &metadata_key).await?;
            check_requirements(&current, &commit.requirements)?;

            let mut next = current.clone();
            apply_updates(&mut next, &commit.updates);
            next.metadata_log.push(MetadataLogEntry {
                metadata_file: metadata_key,
                timestamp_ms: current.last_updated_ms,
            });
            next.last_updated_ms = now_ms();

            let next_version = version + 1;
            let blob_key = format!("{dir}/v{next_version}.metadata.json");
            let written = self.storage.put_if_absent(&blob_key, serde_json::to_vec(&next)?).await?;
            if !written {
                warn!(attempt, table = %commit.identifier, "commit_table: version slot taken, retrying");
                tokio::time::sleep(backoff_delay(attempt)).await;
                continue;
            }
            self.storage.put(&format!("{dir}/{VERSION_HINT}"), next_version.to_string().into_bytes()).await?;
            return Ok(next);
        }
        Err(IcebergError::CommitConflict(format!(
            "exceeded {COMMIT_MAX_RETRIES} retries committing {}",
            commit.identifier
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::TableUpdate;
    use crate::model::snapshot::Snapshot;
    use crate::storage::ObjectStoreBackend;
    use object_store::memory::InMemory;

    fn catalog() -> MemoryCatalog {
        MemoryCatalog::new(Arc::new(ObjectStoreBackend::new(InMemory::new())))
    }

    fn snapshot(id: i64, sequence_number: i64) -> Snapshot {
        Snapshot {
            snapshot_id: id,
            parent_snapshot_id: None,
            sequence_number,
            timestamp_ms: 0,
            manifest_list: format!("s3://bucket/manifests/{id}.avro"),
            summary: crate::model::snapshot::Summary { operation: Some(crate::model::snapshot::Operation::Append), other: HashMap::new() },
            schema_id: None,
            first_row_id: None,
            added_rows: None,
            key_id: None,
        }
    }

    #[tokio::test]
    async fn create_and_load_table_round_trips() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("db.orders").unwrap();
        catalog.create_namespace(&Namespace::try_new(&["db".to_string()]).unwrap(), HashMap::new()).await.unwrap();
        let created = catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();
        let loaded = catalog.load_table(&identifier).await.unwrap();
        assert_eq!(loaded.table_uuid, created.table_uuid);
        assert!(catalog.table_exists(&identifier).await.unwrap());
    }

    #[tokio::test]
    async fn create_table_twice_fails() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("orders").unwrap();
        catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();
        assert!(catalog.create_table(&identifier, CreateTableOptions::default()).await.is_err());
    }

    #[tokio::test]
    async fn commit_table_advances_version_and_appends_snapshot() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("orders").unwrap();
        catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();

        let commit = CommitTable {
            identifier: identifier.clone(),
            requirements: vec![],
            updates: vec![TableUpdate::AddSnapshot(snapshot(1, 1))],
        };
        let committed = catalog.commit_table(commit).await.unwrap();
        assert_eq!(committed.current_snapshot_id, Some(1));
        let hint = catalog.read_version_hint(&identifier).await.unwrap();
        assert_eq!(hint.map(|(version, _)| version), Some(2));
    }

    #[tokio::test]
    async fn commit_table_rejects_failed_requirement() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("orders").unwrap();
        catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();

        let commit = CommitTable {
            identifier: identifier.clone(),
            requirements: vec![crate::catalog::TableRequirement::AssertCurrentSnapshotId(Some(99))],
            updates: vec![],
        };
        assert!(catalog.commit_table(commit).await.is_err());
    }

    #[tokio::test]
    async fn list_tables_and_namespaces_reflect_creates() {
        let catalog = catalog();
        let ns = Namespace::try_new(&["db".to_string()]).unwrap();
        catalog.create_namespace(&ns, HashMap::new()).await.unwrap();
        catalog.create_table(&TableIdentifier::parse("db.orders").unwrap(), CreateTableOptions::default()).await.unwrap();
        catalog.create_table(&TableIdentifier::parse("db.customers").unwrap(), CreateTableOptions::default()).await.unwrap();

        let namespaces = catalog.list_namespaces(None).await.unwrap();
        assert_eq!(namespaces, vec![ns.clone()]);

        let mut tables = catalog.list_tables(&ns).await.unwrap();
        tables.sort_by_key(|t| t.name().to_string());
        assert_eq!(tables[0].name(), "customers");
        assert_eq!(tables[1].name(), "orders");
    }

    #[tokio::test]
    async fn drop_table_removes_version_hint() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("orders").unwrap();
        catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();
        catalog.drop_table(&identifier, false).await.unwrap();
        assert!(!catalog.table_exists(&identifier).await.unwrap());
    }

    #[tokio::test]
    async fn load_table_accepts_path_style_version_hint() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("orders").unwrap();
        let created = catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();

        let dir = MemoryCatalog::table_dir(&identifier);
        let path_hint = format!("{dir}/v1.metadata.json");
        catalog.storage.put(&format!("{dir}/{VERSION_HINT}"), path_hint.into_bytes()).await.unwrap();

        let loaded = catalog.load_table(&identifier).await.unwrap();
        assert_eq!(loaded.table_uuid, created.table_uuid);
    }

    #[tokio::test]
    async fn load_table_rejects_path_style_hint_with_traversal() {
        let catalog = catalog();
        let identifier = TableIdentifier::parse("orders").unwrap();
        catalog.create_table(&identifier, CreateTableOptions::default()).await.unwrap();

        let dir = MemoryCatalog::table_dir(&identifier);
        catalog
            .storage
            .put(&format!("{dir}/{VERSION_HINT}"), b"../escaped/v1.metadata.json".to_vec())
            .await
            .unwrap();

        assert!(catalog.load_table(&identifier).await.is_err());
    }
}
