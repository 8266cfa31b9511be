use std::sync::Arc;

use strata::common::BufferPoolConfig;
use strata::concurrency::Transaction;
use strata::execution::{
    Aggregate, AggregateOp, Filter, Insert, Operator, Predicate, SeqScan, TupleIterator,
};
use strata::tuple::{CompareOp, DataType, Schema, Tuple, Value};
use strata::Database;

fn main() {
    simple_logger::init_with_level(log::Level::Info).expect("Failed to install logger");

    println!("Strata - transactional heap storage with a pull-based executor");
    println!("===============================================================\n");

    let path = std::env::temp_dir().join(format!("strata-demo-{}.dat", std::process::id()));
    let db = Arc::new(Database::new(BufferPoolConfig::new(16)));

    let schema = Schema::builder()
        .column("dept", DataType::Integer)
        .column("name", DataType::Text(16))
        .column("salary", DataType::Integer)
        .build_arc();
    let table_id = db
        .create_table("staff", &path, schema.clone())
        .expect("Failed to create table");
    println!("Created table 'staff' at {}", path.display());

    // Load a few rows in one transaction
    let rows = [
        (1, "ada", 120),
        (1, "brian", 95),
        (2, "carol", 150),
        (2, "dennis", 80),
        (3, "edsger", 110),
    ];
    let tuples = rows
        .iter()
        .map(|&(dept, name, salary)| {
            Tuple::new(
                schema.clone(),
                vec![Value::Integer(dept), Value::from(name), Value::Integer(salary)],
            )
            .expect("Row does not match schema")
        })
        .collect();

    let txn = Transaction::begin();
    let source = Box::new(TupleIterator::new(schema.clone(), tuples));
    let mut insert =
        Insert::new(db.clone(), txn.id(), source, table_id).expect("Failed to plan insert");
    insert.open().expect("Failed to open insert");
    let count = insert.next().expect("Insert failed");
    insert.close();
    txn.commit(db.buffer_pool()).expect("Commit failed");
    println!("Inserted {} rows and committed\n", count);

    // SELECT * FROM staff s WHERE s.salary > 100
    let txn = Transaction::begin();
    let scan = SeqScan::with_alias(db.clone(), txn.id(), table_id, "s").expect("Failed to plan scan");
    let mut filter = Filter::new(Predicate::new(2, CompareOp::GreaterThan, 100), Box::new(scan))
        .expect("Failed to plan filter");
    filter.open().expect("Failed to open filter");
    println!("Staff earning more than 100:");
    while filter.has_next().expect("Scan failed") {
        println!("  {}", filter.next().expect("Scan failed"));
    }
    filter.close();

    // SELECT dept, AVG(salary) FROM staff GROUP BY dept
    let scan = SeqScan::new(db.clone(), txn.id(), table_id).expect("Failed to plan scan");
    let mut aggregate = Aggregate::new(Box::new(scan), 2, Some(0), AggregateOp::Avg)
        .expect("Failed to plan aggregate");
    aggregate.open().expect("Failed to open aggregate");
    let columns: Vec<&str> = aggregate.schema().columns().map(|c| c.name()).collect();
    println!("\n{}:", columns.join(", "));
    while aggregate.has_next().expect("Aggregate failed") {
        println!("  {}", aggregate.next().expect("Aggregate failed"));
    }
    aggregate.close();
    txn.commit(db.buffer_pool()).expect("Commit failed");

    std::fs::remove_file(&path).ok();
    println!("\nDemo completed successfully!");
}
