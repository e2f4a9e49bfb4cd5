#![deny(missing_docs)]
/*!
# tablefmt-meta

A metadata-tree library for an Apache-Iceberg-like open columnar table format: schema and
partition-spec evolution, the snapshot lifecycle, v2→v3 upgrade, variant shredding and
predicate pushdown, and a storage-backed catalog contract with atomic, retried commits.

The [model] module carries the data structures that serialize to and from the table format's
JSON/Avro metadata tree. The engine modules ([manifest], [snapshot_engine], [evolution],
[upgrade], [variant]) operate on those structures; [catalog] and [storage] provide the
transactional commit path over a pluggable backend.
*/
pub mod catalog;
pub mod error;
pub mod evolution;
pub mod manifest;
pub mod model;
pub mod path;
pub mod snapshot_engine;
pub mod storage;
pub mod upgrade;
pub mod value;
pub mod variant;

pub use object_store;
