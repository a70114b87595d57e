mod deletion_test;
mod full_index_test;
mod partial_index_test;
mod postgres_store_test;
mod store_failure_test;
