use rocksdb::{DBWithThreadMode, MultiThreaded};
use std::path::Path;
use std::sync::Arc;

pub type DB = DBWithThreadMode<MultiThreaded>;

/// Opens (or creates) a rocksdb instance at the given directory
pub fn open_db(db_path: &Path, create_if_missing: bool, parallelism: usize) -> Arc<DB> {
    let mut opts = rocksdb::Options::default();
    if parallelism > 1 {
        opts.increase_parallelism(parallelism as i32);
    }
    opts.create_if_missing(create_if_missing);
    Arc::new(DB::open(&opts, db_path.to_str().unwrap()).unwrap())
}
