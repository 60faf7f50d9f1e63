pub mod checkpoint;
pub mod symbol_daily;
pub mod thread_stat;
