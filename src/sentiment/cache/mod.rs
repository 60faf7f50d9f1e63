pub mod chart_cache;
