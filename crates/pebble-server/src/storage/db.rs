//! SQLite database handle for the Pebble server.

pebble_core::define_database!(PebbleDatabase, "Pebble database migrations complete");
