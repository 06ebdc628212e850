// Library root: the pick tracker core (board model, mutation API, consensus
// aggregation, snapshot import/export and storage backends).

pub mod board;
pub mod consensus;
pub mod db;
pub mod snapshot;
