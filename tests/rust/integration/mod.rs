//! Integration tests - filters compiled and executed against a real SQLite
//! database seeded with the demo data set.


mod adapter_scenario_tests;
mod concurrency_tests;
mod persistence_tests;
mod resolver_tests;
