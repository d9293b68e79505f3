//! Test doubles shared by integration tests.

mod mock_data_source;

pub use mock_data_source::MockDataSource;
