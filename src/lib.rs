pub mod api;
pub mod config;
pub mod error;
pub mod invoice;
pub mod ledger;
pub mod manager;
pub mod monitor;
pub mod pool;
pub mod rates;
pub mod report;
pub mod txlog;
