//! Strata - a transactional page cache and pull-based query executor
//!
//! Tables are heap files: flat sequences of fixed-size pages holding
//! fixed-width tuples. All page access goes through a shared buffer pool
//! which enforces page-level strict two-phase locking and a NO-STEAL
//! policy. Committing a transaction flushes the pages it dirtied;
//! aborting discards them.
//!
//! # Architecture
//!
//! - **Common** (`common`): identifiers, configuration, and the error type
//! - **Tuples** (`tuple`): values, schemas, and fixed-width tuple encoding
//! - **Storage** (`storage`): the heap page format and the `PageStore` trait
//!   with its file-backed `HeapFile` implementation
//! - **Catalog** (`catalog`): table registry mapping IDs to stores and schemas
//! - **Concurrency** (`concurrency`): the page `LockManager` and `Transaction`
//! - **Buffer Pool** (`buffer`): bounded page cache, lock acquisition with
//!   timeout, commit and abort
//! - **Execution** (`execution`): the `Operator` trait and SeqScan, Filter,
//!   Join, Aggregate, Insert, Delete
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use strata::common::BufferPoolConfig;
//! use strata::concurrency::Transaction;
//! use strata::execution::{collect, SeqScan};
//! use strata::tuple::{DataType, Schema, Tuple, Value};
//! use strata::Database;
//!
//! let db = Arc::new(Database::new(BufferPoolConfig::new(64)));
//! let schema = Schema::builder()
//!     .column("id", DataType::Integer)
//!     .column("name", DataType::Text(32))
//!     .build_arc();
//! let table_id = db.create_table("users", "users.dat", schema.clone()).unwrap();
//!
//! let txn = Transaction::begin();
//! let mut row = Tuple::new(schema, vec![Value::Integer(1), Value::from("ada")]).unwrap();
//! db.buffer_pool().insert_tuple(txn.id(), table_id, &mut row).unwrap();
//!
//! let mut scan = SeqScan::new(db.clone(), txn.id(), table_id).unwrap();
//! assert_eq!(collect(&mut scan).unwrap().len(), 1);
//! txn.commit(db.buffer_pool()).unwrap();
//! ```

pub mod buffer;
pub mod catalog;
pub mod common;
pub mod concurrency;
pub mod database;
pub mod execution;
pub mod storage;
pub mod tuple;

// Re-export commonly used types at the crate root
pub use common::{PageId, RecordId, Result, SlotId, StrataError, TableId, TransactionId};
pub use database::Database;
