use clap::Args;
use std::path::PathBuf;

/// Name of the database file inside the data directory.
const DB_FILE_NAME: &str = "enrichment.db";

/// Storage flags.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StoreArgs {
    /// Directory holding the enrichment database.
    #[arg(long, global = true, default_value = "./data", env = "CHAINLENS_DATADIR")]
    pub datadir: PathBuf,
}

impl StoreArgs {
    /// Path of the database file.
    pub fn db_path(&self) -> PathBuf {
        self.datadir.join(DB_FILE_NAME)
    }
}
